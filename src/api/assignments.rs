//! Assignment registry endpoints

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::assignment::{AssignmentQuery, AssignmentRecord},
};

use super::{ApiResponse, AuthenticatedUser};

/// Query assignment records
#[utoipa::path(
    get,
    path = "/assignments",
    tag = "assignments",
    security(("bearer_auth" = [])),
    params(AssignmentQuery),
    responses(
        (status = 200, description = "Assignment records in scope", body = [AssignmentRecord]),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_assignments(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<AssignmentQuery>,
) -> AppResult<Json<ApiResponse<Vec<AssignmentRecord>>>> {
    let records = state.services.assignments.list(&query, &claims.caller()).await?;
    Ok(ApiResponse::ok(records))
}
