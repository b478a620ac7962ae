//! Equipment endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::equipment::{CreateEquipment, Equipment, EquipmentCreated, EquipmentQuery, UpdateEquipment},
};

use super::{ApiResponse, AuthenticatedUser};

/// List equipment visible to the caller
#[utoipa::path(
    get,
    path = "/equipment",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(EquipmentQuery),
    responses(
        (status = 200, description = "Equipment in scope", body = [Equipment]),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<EquipmentQuery>,
) -> AppResult<Json<ApiResponse<Vec<Equipment>>>> {
    let equipment = state.services.equipment.list(&query, &claims.caller()).await?;
    Ok(ApiResponse::ok(equipment))
}

/// Get equipment by ID
#[utoipa::path(
    get,
    path = "/equipment/{id}",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Equipment ID")
    ),
    responses(
        (status = 200, description = "Equipment details", body = Equipment),
        (status = 404, description = "Equipment not found or not assigned to caller")
    )
)]
pub async fn get_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Equipment>>> {
    let equipment = state.services.equipment.get(id, &claims.caller()).await?;
    Ok(ApiResponse::ok(equipment))
}

/// Register new equipment, optionally handing it to an employee
#[utoipa::path(
    post,
    path = "/equipment",
    tag = "equipment",
    security(("bearer_auth" = [])),
    request_body = CreateEquipment,
    responses(
        (status = 201, description = "Equipment created", body = EquipmentCreated),
        (status = 400, description = "Missing required field"),
        (status = 403, description = "Caller is not staff, or assignee is not an employee"),
        (status = 404, description = "Assignee not found"),
        (status = 409, description = "Serial number already exists")
    )
)]
pub async fn create_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(equipment): Json<CreateEquipment>,
) -> AppResult<(StatusCode, Json<ApiResponse<EquipmentCreated>>)> {
    let created = state.services.equipment.create(equipment, &claims.caller()).await?;
    Ok((StatusCode::CREATED, ApiResponse::with_message(created, "Equipment created")))
}

/// Update equipment, including reassignment or unassignment
#[utoipa::path(
    put,
    path = "/equipment/{id}",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Equipment ID")
    ),
    request_body = UpdateEquipment,
    responses(
        (status = 200, description = "Equipment updated", body = Equipment),
        (status = 400, description = "Invalid field or status"),
        (status = 403, description = "Caller is not staff, or assignee is not an employee"),
        (status = 404, description = "Equipment or assignee not found"),
        (status = 409, description = "Serial number already exists")
    )
)]
pub async fn update_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(equipment): Json<UpdateEquipment>,
) -> AppResult<Json<ApiResponse<Equipment>>> {
    let updated = state.services.equipment.update(id, equipment, &claims.caller()).await?;
    Ok(ApiResponse::with_message(updated, "Equipment updated"))
}

/// Delete equipment
#[utoipa::path(
    delete,
    path = "/equipment/{id}",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Equipment ID")
    ),
    responses(
        (status = 200, description = "Equipment deleted"),
        (status = 403, description = "Not an administrator"),
        (status = 404, description = "Equipment not found")
    )
)]
pub async fn delete_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.services.equipment.delete(id, &claims.caller()).await?;
    Ok(ApiResponse::with_message((), "Equipment deleted"))
}
