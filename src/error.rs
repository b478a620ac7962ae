//! Error types for AssetDesk server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Stable error codes returned to API clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthenticated = 2,
    NotAuthorized = 3,
    DbFailure = 4,
    NotFound = 5,
    Duplicate = 6,
    BadValue = 7,
    SecurityPolicy = 8,
    HasDependencies = 9,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Security policy violation: {0}")]
    SecurityPolicy(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Business rule violation: {0}")]
    BusinessRule(String),
}

/// Postgres unique_violation
const UNIQUE_VIOLATION: &str = "23505";
/// Postgres foreign_key_violation
const FOREIGN_KEY_VIOLATION: &str = "23503";

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db) = e {
            if db.code().as_deref() == Some(UNIQUE_VIOLATION) {
                let message = match db.constraint() {
                    Some("equipment_serial_number_key") => "Serial number already exists",
                    Some("users_email_key") => "Email already in use",
                    Some("assignments_one_open_per_equipment") => {
                        "Equipment was reassigned concurrently, retry the request"
                    }
                    _ => "Duplicate value",
                };
                return AppError::Conflict(message.to_string());
            }
            // A reference appeared between the deletion checks and the delete itself
            if db.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) {
                return AppError::BusinessRule("Record is still referenced by other data".to_string());
            }
        }
        AppError::Database(e)
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthenticated, msg.clone())
            }
            AppError::Authorization(msg) => {
                (StatusCode::FORBIDDEN, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::SecurityPolicy(msg) => {
                (StatusCode::FORBIDDEN, ErrorCode::SecurityPolicy, msg.clone())
            }
            AppError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, ErrorCode::NotFound, msg.clone())
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::Conflict(msg) => {
                (StatusCode::CONFLICT, ErrorCode::Duplicate, msg.clone())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
            AppError::BusinessRule(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::HasDependencies, msg.clone())
            }
        };

        let body = Json(ErrorResponse {
            success: false,
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Authentication("x".into()), StatusCode::UNAUTHORIZED),
            (AppError::Authorization("x".into()), StatusCode::FORBIDDEN),
            (AppError::SecurityPolicy("x".into()), StatusCode::FORBIDDEN),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT),
            (AppError::BusinessRule("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[derive(Debug)]
    struct PgFailure {
        code: &'static str,
        constraint: Option<&'static str>,
    }

    impl std::fmt::Display for PgFailure {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "postgres error {}", self.code)
        }
    }

    impl std::error::Error for PgFailure {}

    impl sqlx::error::DatabaseError for PgFailure {
        fn message(&self) -> &str {
            "postgres error"
        }

        fn code(&self) -> Option<std::borrow::Cow<'_, str>> {
            Some(self.code.into())
        }

        fn constraint(&self) -> Option<&str> {
            self.constraint
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            match self.code {
                UNIQUE_VIOLATION => sqlx::error::ErrorKind::UniqueViolation,
                FOREIGN_KEY_VIOLATION => sqlx::error::ErrorKind::ForeignKeyViolation,
                _ => sqlx::error::ErrorKind::Other,
            }
        }
    }

    fn pg(code: &'static str, constraint: Option<&'static str>) -> AppError {
        sqlx::Error::Database(Box::new(PgFailure { code, constraint })).into()
    }

    #[test]
    fn test_constraint_violations_are_mapped() {
        match pg(UNIQUE_VIOLATION, Some("equipment_serial_number_key")) {
            AppError::Conflict(msg) => assert_eq!(msg, "Serial number already exists"),
            other => panic!("unexpected error: {:?}", other),
        }

        let referenced = pg(FOREIGN_KEY_VIOLATION, Some("equipment_assigned_to_fkey"));
        assert!(matches!(referenced, AppError::BusinessRule(_)));
        assert_eq!(referenced.into_response().status(), StatusCode::BAD_REQUEST);

        assert!(matches!(pg("40001", None), AppError::Database(_)));
    }

    #[test]
    fn test_row_not_found_is_database_error() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::Database(_)));
    }
}
