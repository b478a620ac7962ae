//! Incident lifecycle service

use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    models::{
        incident::{AssignIncident, CreateIncident, Incident, IncidentStats, UpdateIncident},
        role::{Caller, Visibility},
    },
    repository::Repository,
};

/// How many incidents the "recent" view returns
const RECENT_LIMIT: i64 = 10;

#[derive(Clone)]
pub struct IncidentsService {
    repository: Repository,
}

impl IncidentsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Report an incident. Reporter and initial status come from the server, never the payload.
    pub async fn create(&self, data: CreateIncident, caller: &Caller) -> AppResult<Incident> {
        let data = data.validate_required()?;

        // Existence only; the equipment does not need to be in the reporter's scope
        self.repository.equipment.get_by_id(data.equipment_id).await?;

        let incident = self.repository.incidents.create(&data, caller.id).await?;

        tracing::info!(
            incident_id = incident.id,
            equipment_id = incident.equipment_id,
            reported_by = caller.id,
            "Incident reported"
        );
        Ok(incident)
    }

    pub async fn list(&self, caller: &Caller) -> AppResult<Vec<Incident>> {
        self.repository
            .incidents
            .list(Visibility::for_caller(caller), None)
            .await
    }

    pub async fn recent(&self, caller: &Caller) -> AppResult<Vec<Incident>> {
        self.repository
            .incidents
            .list(Visibility::for_caller(caller), Some(RECENT_LIMIT))
            .await
    }

    /// Get one incident; out-of-scope incidents look exactly like missing ones
    pub async fn get(&self, id: i32, caller: &Caller) -> AppResult<Incident> {
        let incident = self.repository.incidents.get_by_id(id).await?;

        if !Visibility::for_caller(caller).permits(Some(incident.reported_by)) {
            return Err(AppError::NotFound(format!("Incident {} not found", id)));
        }
        Ok(incident)
    }

    pub async fn update(&self, id: i32, data: UpdateIncident, caller: &Caller) -> AppResult<Incident> {
        let data = data.checked()?;

        if data.assigned_to.is_some() {
            caller.require_staff()?;
        }
        if let Some(Some(assignee)) = data.assigned_to {
            self.repository.users.get_by_id(assignee).await?;
        }

        let visibility = Visibility::for_caller(caller);
        let caller_id = caller.id;
        let now = Utc::now();
        let mut previous = None;

        let incident = self
            .repository
            .incidents
            .update_locked(id, |incident| {
                if !visibility.permits(Some(incident.reported_by)) {
                    return Err(AppError::NotFound(format!("Incident {} not found", id)));
                }
                previous = Some(incident.status);
                data.apply_to(incident, caller_id, now);
                Ok(())
            })
            .await?;

        tracing::info!(
            incident_id = id,
            from = ?previous,
            to = ?incident.status,
            updated_by = caller_id,
            "Incident updated"
        );
        Ok(incident)
    }

    /// Hand the incident to a technician; status is left alone
    pub async fn assign(&self, id: i32, data: AssignIncident, caller: &Caller) -> AppResult<Incident> {
        caller.require_staff()?;

        let assignee = data
            .assigned_to
            .ok_or_else(|| AppError::Validation("Field assigned_to is required".to_string()))?;

        self.repository.users.get_by_id(assignee).await?;
        let incident = self.repository.incidents.set_assignee(id, Some(assignee)).await?;

        tracing::info!(incident_id = id, assigned_to = assignee, assigned_by = caller.id, "Incident assigned");
        Ok(incident)
    }

    pub async fn delete(&self, id: i32, caller: &Caller) -> AppResult<()> {
        caller.require_admin()?;
        self.repository.incidents.delete(id).await?;

        tracing::info!(incident_id = id, deleted_by = caller.id, "Incident deleted");
        Ok(())
    }

    pub async fn stats(&self, caller: &Caller) -> AppResult<IncidentStats> {
        self.repository
            .incidents
            .stats(Visibility::for_caller(caller))
            .await
    }
}
