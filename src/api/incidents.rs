//! Incident endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::incident::{AssignIncident, CreateIncident, IncidentDetails, IncidentStats, UpdateIncident},
};

use super::{ApiResponse, AuthenticatedUser};

/// List incidents visible to the caller
#[utoipa::path(
    get,
    path = "/incidents",
    tag = "incidents",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Incidents in scope", body = [IncidentDetails]),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_incidents(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<ApiResponse<Vec<IncidentDetails>>>> {
    let incidents = state.services.incidents.list(&claims.caller()).await?;
    Ok(ApiResponse::ok(incidents.into_iter().map(IncidentDetails::from).collect()))
}

/// Ten most recent incidents in scope
#[utoipa::path(
    get,
    path = "/incidents/recent",
    tag = "incidents",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Recent incidents", body = [IncidentDetails])
    )
)]
pub async fn recent_incidents(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<ApiResponse<Vec<IncidentDetails>>>> {
    let incidents = state.services.incidents.recent(&claims.caller()).await?;
    Ok(ApiResponse::ok(incidents.into_iter().map(IncidentDetails::from).collect()))
}

/// Incident counts by status and priority
#[utoipa::path(
    get,
    path = "/incidents/stats",
    tag = "incidents",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Incident statistics", body = IncidentStats)
    )
)]
pub async fn incident_stats(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<ApiResponse<IncidentStats>>> {
    let stats = state.services.incidents.stats(&claims.caller()).await?;
    Ok(ApiResponse::ok(stats))
}

/// Get incident by ID
#[utoipa::path(
    get,
    path = "/incidents/{id}",
    tag = "incidents",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Incident ID")
    ),
    responses(
        (status = 200, description = "Incident details", body = IncidentDetails),
        (status = 404, description = "Incident not found")
    )
)]
pub async fn get_incident(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<IncidentDetails>>> {
    let incident = state.services.incidents.get(id, &claims.caller()).await?;
    Ok(ApiResponse::ok(incident.into()))
}

/// Report an incident
#[utoipa::path(
    post,
    path = "/incidents",
    tag = "incidents",
    security(("bearer_auth" = [])),
    request_body = CreateIncident,
    responses(
        (status = 201, description = "Incident reported", body = IncidentDetails),
        (status = 400, description = "Missing required field"),
        (status = 404, description = "Equipment not found")
    )
)]
pub async fn create_incident(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(incident): Json<CreateIncident>,
) -> AppResult<(StatusCode, Json<ApiResponse<IncidentDetails>>)> {
    let created = state.services.incidents.create(incident, &claims.caller()).await?;
    Ok((StatusCode::CREATED, ApiResponse::with_message(created.into(), "Incident reported")))
}

/// Update an incident
#[utoipa::path(
    put,
    path = "/incidents/{id}",
    tag = "incidents",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Incident ID")
    ),
    request_body = UpdateIncident,
    responses(
        (status = 200, description = "Incident updated", body = IncidentDetails),
        (status = 403, description = "Only staff may change the assignee"),
        (status = 404, description = "Incident not found")
    )
)]
pub async fn update_incident(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(incident): Json<UpdateIncident>,
) -> AppResult<Json<ApiResponse<IncidentDetails>>> {
    let updated = state.services.incidents.update(id, incident, &claims.caller()).await?;
    Ok(ApiResponse::with_message(updated.into(), "Incident updated"))
}

/// Assign an incident to a technician
#[utoipa::path(
    put,
    path = "/incidents/{id}/assign",
    tag = "incidents",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Incident ID")
    ),
    request_body = AssignIncident,
    responses(
        (status = 200, description = "Incident assigned", body = IncidentDetails),
        (status = 400, description = "Missing assignee"),
        (status = 403, description = "Caller is not staff"),
        (status = 404, description = "Incident or assignee not found")
    )
)]
pub async fn assign_incident(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<AssignIncident>,
) -> AppResult<Json<ApiResponse<IncidentDetails>>> {
    let incident = state.services.incidents.assign(id, request, &claims.caller()).await?;
    Ok(ApiResponse::with_message(incident.into(), "Incident assigned"))
}

/// Delete an incident
#[utoipa::path(
    delete,
    path = "/incidents/{id}",
    tag = "incidents",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Incident ID")
    ),
    responses(
        (status = 200, description = "Incident deleted"),
        (status = 403, description = "Not an administrator"),
        (status = 404, description = "Incident not found")
    )
)]
pub async fn delete_incident(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.services.incidents.delete(id, &claims.caller()).await?;
    Ok(ApiResponse::with_message((), "Incident deleted"))
}
