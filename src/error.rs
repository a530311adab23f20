use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tokio_postgres::error::SqlState;

use crate::scoring::ScoringError;
use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match self {
            ApiError::Database(ref err) => {
                if err.contains("timeout") {
                    tracing::warn!("PostgreSQL operation timeout: {}", err);
                } else {
                    tracing::error!("PostgreSQL database error: {}", err);
                }

                // Driver details stay in the log
                if err.contains("timeout") {
                    "Database operation timed out, please try again".to_string()
                } else if err.contains("unavailable") || err.contains("connection") {
                    "Database service is temporarily unavailable".to_string()
                } else {
                    "A database error occurred".to_string()
                }
            }
            ApiError::Upstream(ref message) => {
                tracing::error!("Upstream service failure: {}", message);
                message.clone()
            }
            ApiError::Internal(ref err) => {
                tracing::error!("Internal server error: {:#}", err);
                "Internal Server Error".to_string()
            }
            ApiError::Validation(message)
            | ApiError::Unauthorized(message)
            | ApiError::Forbidden(message)
            | ApiError::NotFound(message)
            | ApiError::Conflict(message)
            | ApiError::PayloadTooLarge(message) => {
                tracing::debug!(status = status.as_u16(), "Request rejected: {}", message);
                message
            }
        };

        let body = Json(json!({
            "status": "Error",
            "msg": message
        }));

        (status, body).into_response()
    }
}

// PostgreSQL error mapping
impl From<tokio_postgres::Error> for ApiError {
    fn from(err: tokio_postgres::Error) -> Self {
        match err.code() {
            Some(&SqlState::UNIQUE_VIOLATION) => {
                let constraint = err.as_db_error().and_then(|db| db.constraint());
                ApiError::Conflict(unique_violation_message(constraint).to_string())
            }
            Some(&SqlState::FOREIGN_KEY_VIOLATION) => {
                ApiError::Validation("Referenced resource does not exist".to_string())
            }
            Some(&SqlState::NOT_NULL_VIOLATION) => {
                ApiError::Validation("Required field is missing".to_string())
            }
            Some(&SqlState::STRING_DATA_RIGHT_TRUNCATION) => {
                ApiError::Validation("Text data exceeds maximum length".to_string())
            }
            Some(&SqlState::CONNECTION_EXCEPTION) |
            Some(&SqlState::CONNECTION_DOES_NOT_EXIST) |
            Some(&SqlState::CONNECTION_FAILURE) => {
                tracing::error!("PostgreSQL connection error: {}", err);
                ApiError::Database("Database connection unavailable".to_string())
            }
            _ => {
                tracing::error!("Unhandled PostgreSQL error: {} (code: {:?})", err, err.code());
                ApiError::Database("Database operation failed".to_string())
            }
        }
    }
}

/// Message for a unique violation, picked by the constraint Postgres names.
/// The migrations rely on the default `<table>_<column>_key` names.
fn unique_violation_message(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some(name) if name.ends_with("_email_key") => "Email already exists",
        Some(name) if name.ends_with("_text_key") => "Quiz text already exists",
        _ => "Resource already exists",
    }
}

// Connection pool error mapping
impl From<deadpool_postgres::PoolError> for ApiError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        match err {
            deadpool_postgres::PoolError::Timeout(_) => {
                tracing::warn!("Database connection pool timeout: {}", err);
                ApiError::Database("Database connection timeout".to_string())
            }
            deadpool_postgres::PoolError::Closed => {
                tracing::error!("Database connection pool is closed: {}", err);
                ApiError::Database("Database service unavailable".to_string())
            }
            _ => {
                tracing::error!("Database connection pool error: {}", err);
                ApiError::Database("Database connection unavailable".to_string())
            }
        }
    }
}

// Extractor rejections, so malformed input gets the same envelope as everything else
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::PayloadTooLarge("Request body is too large".to_string());
        }
        ApiError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(format!("Invalid path parameter: {}", rejection.body_text()))
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::Validation(format!("Expected a multipart form: {}", rejection.body_text()))
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        tracing::error!("Object storage error: {}", err);
        ApiError::Upstream("Error upload file to storage".to_string())
    }
}

impl From<ScoringError> for ApiError {
    fn from(err: ScoringError) -> Self {
        tracing::error!("Scoring service error: {}", err);
        ApiError::Upstream("Scoring service unavailable".to_string())
    }
}

// Result type alias for convenience
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn render(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_error_envelope() {
        let (status, body) = render(ApiError::not_found("Quiz not found")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "Error");
        assert_eq!(body["msg"], "Quiz not found");
    }

    #[tokio::test]
    async fn test_status_codes() {
        assert_eq!(render(ApiError::validation("x")).await.0, StatusCode::BAD_REQUEST);
        assert_eq!(render(ApiError::unauthorized("x")).await.0, StatusCode::UNAUTHORIZED);
        assert_eq!(render(ApiError::Forbidden("x".into())).await.0, StatusCode::FORBIDDEN);
        assert_eq!(render(ApiError::conflict("x")).await.0, StatusCode::CONFLICT);
        assert_eq!(render(ApiError::PayloadTooLarge("x".into())).await.0, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(render(ApiError::Upstream("x".into())).await.0, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_database_details_are_hidden() {
        let (status, body) = render(ApiError::Database("relation \"users\" does not exist".into())).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["msg"], "A database error occurred");
    }

    #[test]
    fn test_unique_violation_message_by_constraint() {
        assert_eq!(unique_violation_message(Some("users_email_key")), "Email already exists");
        assert_eq!(unique_violation_message(Some("admins_email_key")), "Email already exists");
        assert_eq!(unique_violation_message(Some("spelling_quizzes_text_key")), "Quiz text already exists");
        assert_eq!(unique_violation_message(Some("pronunciation_quizzes_text_key")), "Quiz text already exists");
        assert_eq!(unique_violation_message(Some("users_pkey")), "Resource already exists");
        assert_eq!(unique_violation_message(None), "Resource already exists");
    }

    #[tokio::test]
    async fn test_internal_error_message() {
        let (status, body) = render(ApiError::from(anyhow::anyhow!("bcrypt exploded"))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["msg"], "Internal Server Error");
    }
}
