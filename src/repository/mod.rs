//! Repository layer for database operations

pub mod assignments;
pub mod equipment;
pub mod incidents;
pub mod users;

use sqlx::{Pool, Postgres};

use crate::models::role::Visibility;

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub users: users::UsersRepository,
    pub equipment: equipment::EquipmentRepository,
    pub assignments: assignments::AssignmentsRepository,
    pub incidents: incidents::IncidentsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            users: users::UsersRepository::new(pool.clone()),
            equipment: equipment::EquipmentRepository::new(pool.clone()),
            assignments: assignments::AssignmentsRepository::new(pool.clone()),
            incidents: incidents::IncidentsRepository::new(pool.clone()),
            pool,
        }
    }

    /// Check database connectivity
    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

/// SQL predicate restricting `column` to the caller's scope.
///
/// Returns the condition and the owner id to bind as `$idx`, if any.
pub(crate) fn scope_condition(visibility: Visibility, column: &str, idx: usize) -> (String, Option<i32>) {
    match visibility {
        Visibility::All => ("TRUE".to_string(), None),
        Visibility::Own(owner) => (format!("{} = ${}", column, idx), Some(owner)),
        Visibility::Nothing => ("FALSE".to_string(), None),
    }
}
