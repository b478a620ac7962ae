//! User management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::user::{CreateUser, DeletionCheck, UpdateUser, User, UserQuery, UserShort},
};

use super::{ApiResponse, AuthenticatedUser};

/// List users
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    params(UserQuery),
    responses(
        (status = 200, description = "List of users", body = [UserShort]),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an administrator")
    )
)]
pub async fn list_users(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<UserQuery>,
) -> AppResult<Json<ApiResponse<Vec<UserShort>>>> {
    let users = state.services.users.list(&query, &claims.caller()).await?;
    Ok(ApiResponse::ok(users))
}

/// Get user details by ID
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User details", body = User),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<User>>> {
    let user = state.services.users.get_by_id(id, &claims.caller()).await?;
    Ok(ApiResponse::ok(user))
}

/// Create a new user
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid input or unknown role"),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn create_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(user): Json<CreateUser>,
) -> AppResult<(StatusCode, Json<ApiResponse<User>>)> {
    let created = state.services.users.create(user, &claims.caller()).await?;
    Ok((StatusCode::CREATED, ApiResponse::with_message(created, "User created")))
}

/// Update an existing user
#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 404, description = "User not found"),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn update_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(user): Json<UpdateUser>,
) -> AppResult<Json<ApiResponse<User>>> {
    let updated = state.services.users.update(id, user, &claims.caller()).await?;
    Ok(ApiResponse::with_message(updated, "User updated"))
}

/// Check whether a user can be deleted
#[utoipa::path(
    get,
    path = "/users/{id}/can-delete",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Deletion check", body = DeletionCheck),
        (status = 404, description = "User not found")
    )
)]
pub async fn can_delete_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<DeletionCheck>>> {
    let check = state.services.users.can_delete(id, &claims.caller()).await?;
    Ok(ApiResponse::ok(check))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User deleted"),
        (status = 400, description = "User still referenced by incidents or equipment"),
        (status = 403, description = "Administrators cannot be deleted"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.services.users.delete(id, &claims.caller()).await?;
    Ok(ApiResponse::with_message((), "User deleted"))
}
