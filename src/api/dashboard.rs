//! Dashboard endpoint

use axum::{extract::State, Json};

use crate::{error::AppResult, models::stats::Dashboard};

use super::{ApiResponse, AuthenticatedUser};

/// Equipment, user and incident overview
#[utoipa::path(
    get,
    path = "/dashboard",
    tag = "dashboard",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Inventory overview", body = Dashboard),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Caller is not staff")
    )
)]
pub async fn get_dashboard(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<ApiResponse<Dashboard>>> {
    let dashboard = state.services.dashboard.get_dashboard(&claims.caller()).await?;
    Ok(ApiResponse::ok(dashboard))
}
