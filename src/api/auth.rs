//! Authentication endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::user::{RegisterUser, User},
};

use super::{ApiResponse, AuthenticatedUser};

/// Login request
#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token and profile returned by login and registration
#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    /// JWT access token
    pub token: String,
    pub token_type: String,
    /// Token lifetime in seconds
    pub expires_in: u64,
    pub user: UserInfo,
}

/// Public view of the logged-in user
#[derive(Serialize, ToSchema)]
pub struct UserInfo {
    pub id: i32,
    pub name: String,
    pub email: String,
    /// Canonical role when recognized, raw value otherwise
    pub role: Option<String>,
    pub department: Option<String>,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        let role = crate::models::role::normalize_role(user.role.as_deref()).map(|r| r.as_str().to_string());
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role,
            department: user.department,
        }
    }
}

fn login_response(state: &crate::AppState, token: String, user: User) -> LoginResponse {
    LoginResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in: state.config.auth.jwt_expiration_hours * 3600,
        user: user.into(),
    }
}

/// Authenticate with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials or deactivated account")
    )
)]
pub async fn login(
    State(state): State<crate::AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    let (token, user) = state
        .services
        .auth
        .authenticate(&request.email, &request.password)
        .await?;

    Ok(ApiResponse::with_message(
        login_response(&state, token, user),
        "Login successful",
    ))
}

/// Create an account
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterUser,
    responses(
        (status = 201, description = "Account created", body = LoginResponse),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Admin role requested"),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn register(
    State(state): State<crate::AppState>,
    Json(request): Json<RegisterUser>,
) -> AppResult<(StatusCode, Json<ApiResponse<LoginResponse>>)> {
    let (token, user) = state.services.auth.register(request).await?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message(login_response(&state, token, user), "Account created"),
    ))
}

/// Get current user profile
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = UserInfo),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<ApiResponse<UserInfo>>> {
    let user = state.services.auth.me(claims.user_id).await?;
    Ok(ApiResponse::ok(user.into()))
}
