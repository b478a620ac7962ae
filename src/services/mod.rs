//! Business logic services

pub mod assignments;
pub mod auth;
pub mod dashboard;
pub mod deletion_guard;
pub mod equipment;
pub mod incidents;
pub mod users;

use crate::{config::AuthConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub repository: Repository,
    pub auth: auth::AuthService,
    pub dashboard: dashboard::DashboardService,
    pub users: users::UsersService,
    pub equipment: equipment::EquipmentService,
    pub assignments: assignments::AssignmentsService,
    pub incidents: incidents::IncidentsService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, auth_config: AuthConfig) -> Self {
        Self {
            auth: auth::AuthService::new(repository.clone(), auth_config),
            dashboard: dashboard::DashboardService::new(repository.clone()),
            users: users::UsersService::new(repository.clone()),
            equipment: equipment::EquipmentService::new(repository.clone()),
            assignments: assignments::AssignmentsService::new(repository.clone()),
            incidents: incidents::IncidentsService::new(repository.clone()),
            repository,
        }
    }
}
