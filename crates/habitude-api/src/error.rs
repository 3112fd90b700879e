use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use habitude_core::Violation;
use habitude_db::DbError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Request-level failure, mapped onto an HTTP status plus a JSON body.
/// Validation failures carry every violated rule so one submission can
/// report all of its problems at once.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(Vec<Violation>),
    #[error("{0}")]
    BadRequest(&'static str),
    #[error("authentication required")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("not found")]
    NotFound,
    #[error("{0}")]
    Conflict(&'static str),
    #[error("internal error")]
    Internal,
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Invalid(violations) => ApiError::Validation(violations),
            DbError::LinkedHabitNotFound => ApiError::BadRequest("linked habit not found"),
            DbError::NotFound => ApiError::NotFound,
            DbError::DuplicateEmail => ApiError::Conflict("email already registered"),
            other => {
                error!("Database error: {}", other);
                ApiError::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Validation(violations) => {
                let details: Vec<_> = violations
                    .iter()
                    .map(|v| json!({ "field": v.field(), "message": v.to_string() }))
                    .collect();
                (
                    StatusCode::BAD_REQUEST,
                    json!({ "error": self.to_string(), "violations": details }),
                )
            }
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, json!({ "error": self.to_string() })),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, json!({ "error": self.to_string() })),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, json!({ "error": self.to_string() })),
            ApiError::NotFound => (StatusCode::NOT_FOUND, json!({ "error": self.to_string() })),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, json!({ "error": self.to_string() })),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": self.to_string() }),
            ),
        };

        (status, Json(body)).into_response()
    }
}
