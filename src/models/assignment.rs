//! Assignment registry records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::equipment::ConditionState;

/// Standalone copy of an assignment period, queryable by employee
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AssignmentRecord {
    pub id: i32,
    pub employee_id: i32,
    /// May point to deleted equipment; history outlives the inventory row
    pub equipment_id: i32,
    /// Equipment name at assignment time
    pub equipment_name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub condition: ConditionState,
    pub created_by: Option<i32>,
    pub closed_by: Option<i32>,
}

/// Registry query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct AssignmentQuery {
    #[serde(alias = "equipementId")]
    pub equipment_id: Option<i32>,
    #[serde(alias = "employeId")]
    pub employee_id: Option<i32>,
    /// Only records without end date
    pub active_only: Option<bool>,
}
