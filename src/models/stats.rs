//! Aggregated counts for statistics and the dashboard

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Debug;
use utoipa::ToSchema;

use super::incident::{IncidentPriority, IncidentStatus};

/// Count for one bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct StatEntry {
    pub label: String,
    pub count: i64,
}

impl StatEntry {
    /// Bucket labelled with the value's JSON name, so labels match what the API accepts
    pub fn new<T: Serialize + Debug>(value: &T, count: i64) -> Self {
        let label = match serde_json::to_value(value) {
            Ok(serde_json::Value::String(name)) => name,
            _ => format!("{:?}", value),
        };
        Self { label, count }
    }
}

/// Incident row as shown on the dashboard
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct IncidentSummary {
    pub id: i32,
    pub title: String,
    pub status: IncidentStatus,
    pub priority: IncidentPriority,
    pub assigned_to: Option<i32>,
    pub crea_date: DateTime<Utc>,
}

/// Inventory-wide overview
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Dashboard {
    pub total_equipment: i64,
    pub equipment_by_status: Vec<StatEntry>,
    pub total_users: i64,
    /// Canonical role names; stored spellings are merged
    pub users_by_role: Vec<StatEntry>,
    pub total_incidents: i64,
    pub incidents_by_status: Vec<StatEntry>,
    pub recent_incidents: Vec<IncidentSummary>,
}
