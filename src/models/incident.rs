//! Incident model and status transitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::stats::StatEntry;
use crate::error::AppError;

/// Incident status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "incident_status", rename_all = "snake_case")]
pub enum IncidentStatus {
    New,
    InProgress,
    Resolved,
}

/// Incident priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "incident_priority", rename_all = "snake_case")]
pub enum IncidentPriority {
    Low,
    #[default]
    Medium,
    High,
}

/// Incident record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Incident {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub equipment_id: i32,
    pub status: IncidentStatus,
    pub priority: IncidentPriority,
    pub reported_by: i32,
    pub assigned_to: Option<i32>,
    /// Set only by the transition into Resolved
    pub resolved_by: Option<i32>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub notes: String,
    pub crea_date: DateTime<Utc>,
    pub modif_date: Option<DateTime<Utc>>,
}

impl Incident {
    /// Move to `status`, keeping resolver and resolution time in lockstep with Resolved.
    pub fn transition(&mut self, status: IncidentStatus, caller_id: i32, at: DateTime<Utc>) {
        let was_resolved = self.status == IncidentStatus::Resolved;
        let resolving = status == IncidentStatus::Resolved;

        if resolving && !was_resolved {
            self.resolved_by = Some(caller_id);
            self.resolved_at = Some(at);
        } else if !resolving {
            self.resolved_by = None;
            self.resolved_at = None;
        }
        self.status = status;
    }

    /// Whole hours between report and resolution
    pub fn resolution_hours(&self) -> Option<i64> {
        self.resolved_at
            .map(|resolved| (resolved - self.crea_date).num_minutes())
            .map(|minutes| (minutes as f64 / 60.0).round() as i64)
    }
}

/// Incident with derived fields for API responses
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IncidentDetails {
    #[serde(flatten)]
    pub incident: Incident,
    pub resolution_hours: Option<i64>,
}

impl From<Incident> for IncidentDetails {
    fn from(incident: Incident) -> Self {
        let resolution_hours = incident.resolution_hours();
        Self {
            incident,
            resolution_hours,
        }
    }
}

/// Create incident request.
///
/// There is no reporter or status field: both are forced server-side.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateIncident {
    #[validate(length(max = 200, message = "Title cannot exceed 200 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 2000, message = "Description cannot exceed 2000 characters"))]
    pub description: Option<String>,
    #[serde(alias = "equipment")]
    pub equipment_id: Option<i32>,
    pub priority: Option<IncidentPriority>,
    #[validate(length(max = 1000, message = "Notes cannot exceed 1000 characters"))]
    pub notes: Option<String>,
}

/// Validated create request
#[derive(Debug, Clone)]
pub struct NewIncident {
    pub title: String,
    pub description: String,
    pub equipment_id: i32,
    pub priority: IncidentPriority,
    pub notes: String,
}

impl CreateIncident {
    pub fn validate_required(self) -> Result<NewIncident, AppError> {
        self.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let required = |value: Option<String>| value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        match (required(self.title), required(self.description), self.equipment_id) {
            (Some(title), Some(description), Some(equipment_id)) => Ok(NewIncident {
                title,
                description,
                equipment_id,
                priority: self.priority.unwrap_or_default(),
                notes: self.notes.unwrap_or_default(),
            }),
            _ => Err(AppError::Validation(
                "Fields title, description and equipment_id are required".to_string(),
            )),
        }
    }
}

/// Update incident request. Resolver fields are deliberately absent.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateIncident {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 2000, message = "Description must be 1 to 2000 characters"))]
    pub description: Option<String>,
    pub status: Option<IncidentStatus>,
    pub priority: Option<IncidentPriority>,
    #[validate(length(max = 1000, message = "Notes cannot exceed 1000 characters"))]
    pub notes: Option<String>,
    /// Technicians and admins only
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<i32>)]
    pub assigned_to: Option<Option<i32>>,
}

impl UpdateIncident {
    /// Validate lengths, trim title and description, and refuse blank ones
    pub fn checked(mut self) -> Result<Self, AppError> {
        self.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        for (value, field) in [(&mut self.title, "title"), (&mut self.description, "description")] {
            if let Some(text) = value.as_mut() {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Err(AppError::Validation(format!("Field {} cannot be empty", field)));
                }
                *text = trimmed.to_string();
            }
        }
        Ok(self)
    }

    /// Apply a checked payload to a loaded incident
    pub fn apply_to(&self, incident: &mut Incident, caller_id: i32, at: DateTime<Utc>) {
        if let Some(ref title) = self.title {
            incident.title = title.clone();
        }
        if let Some(ref description) = self.description {
            incident.description = description.clone();
        }
        if let Some(priority) = self.priority {
            incident.priority = priority;
        }
        if let Some(ref notes) = self.notes {
            incident.notes = notes.clone();
        }
        if let Some(assigned_to) = self.assigned_to {
            incident.assigned_to = assigned_to;
        }
        if let Some(status) = self.status {
            incident.transition(status, caller_id, at);
        }
    }
}

/// Assign incident request
#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignIncident {
    #[serde(alias = "assignedTo")]
    pub assigned_to: Option<i32>,
}

/// Incident statistics
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IncidentStats {
    pub total: i64,
    pub by_status: Vec<StatEntry>,
    pub by_priority: Vec<StatEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn incident() -> Incident {
        Incident {
            id: 1,
            title: "Screen flickers".to_string(),
            description: "Since Monday".to_string(),
            equipment_id: 3,
            status: IncidentStatus::New,
            priority: IncidentPriority::Medium,
            reported_by: 10,
            assigned_to: None,
            resolved_by: None,
            resolved_at: None,
            notes: String::new(),
            crea_date: Utc::now() - Duration::hours(5),
            modif_date: None,
        }
    }

    #[test]
    fn test_resolve_sets_resolver() {
        let mut inc = incident();
        let now = Utc::now();
        inc.transition(IncidentStatus::Resolved, 20, now);

        assert_eq!(inc.status, IncidentStatus::Resolved);
        assert_eq!(inc.resolved_by, Some(20));
        assert_eq!(inc.resolved_at, Some(now));
        assert_eq!(inc.resolution_hours(), Some(5));
    }

    #[test]
    fn test_resolving_twice_keeps_first_resolver() {
        let mut inc = incident();
        let first = Utc::now();
        inc.transition(IncidentStatus::Resolved, 20, first);
        inc.transition(IncidentStatus::Resolved, 21, first + Duration::hours(1));

        assert_eq!(inc.resolved_by, Some(20));
        assert_eq!(inc.resolved_at, Some(first));
    }

    #[test]
    fn test_reopen_clears_resolver() {
        for reopened in [IncidentStatus::New, IncidentStatus::InProgress] {
            let mut inc = incident();
            inc.transition(IncidentStatus::Resolved, 20, Utc::now());
            inc.transition(reopened, 21, Utc::now());

            assert_eq!(inc.status, reopened);
            assert_eq!(inc.resolved_by, None);
            assert_eq!(inc.resolved_at, None);
            assert_eq!(inc.resolution_hours(), None);
        }
    }

    #[test]
    fn test_payload_cannot_carry_resolver() {
        let payload: UpdateIncident = serde_json::from_value(serde_json::json!({
            "status": "Resolved",
            "resolved_by": 999,
            "resolved_at": "2020-01-01T00:00:00Z"
        }))
        .unwrap();

        let mut inc = incident();
        payload.apply_to(&mut inc, 20, Utc::now());
        assert_eq!(inc.resolved_by, Some(20));
        assert!(inc.resolved_at.unwrap() > Utc::now() - Duration::minutes(1));
    }

    #[test]
    fn test_blank_update_fields_rejected() {
        for body in [
            serde_json::json!({ "title": "   " }),
            serde_json::json!({ "description": "\t\n" }),
        ] {
            let payload: UpdateIncident = serde_json::from_value(body).unwrap();
            assert!(matches!(payload.checked(), Err(AppError::Validation(_))));
        }

        let payload: UpdateIncident =
            serde_json::from_value(serde_json::json!({ "title": "  Screen dead  " })).unwrap();
        let payload = payload.checked().unwrap();

        let mut inc = incident();
        payload.apply_to(&mut inc, 20, Utc::now());
        assert_eq!(inc.title, "Screen dead");
        assert_eq!(inc.description, "Since Monday");
    }

    #[test]
    fn test_create_ignores_status_and_requires_fields() {
        let payload: CreateIncident = serde_json::from_value(serde_json::json!({
            "title": "No network",
            "description": "Cable unplugged?",
            "equipment": 3,
            "status": "Resolved",
            "reported_by": 1
        }))
        .unwrap();
        let new = payload.validate_required().unwrap();
        assert_eq!(new.equipment_id, 3);
        assert_eq!(new.priority, IncidentPriority::Medium);

        let missing: CreateIncident = serde_json::from_value(serde_json::json!({ "title": "t" })).unwrap();
        assert!(matches!(missing.validate_required(), Err(AppError::Validation(_))));

        let too_long: CreateIncident = serde_json::from_value(serde_json::json!({
            "title": "x".repeat(201),
            "description": "d",
            "equipment_id": 1
        }))
        .unwrap();
        assert!(matches!(too_long.validate_required(), Err(AppError::Validation(_))));
    }
}
