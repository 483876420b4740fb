//! Error taxonomy and HTTP mapping.
//!
//! Every failure a request can surface is a [`ServiceError`]; the axum
//! layer renders it as a structured JSON [`ErrorResponse`]. Nothing here is
//! fatal to the process — failures are scoped to the request that caused
//! them.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// JSON body returned for every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status category, e.g. "Not Found".
    pub error: String,
    /// Human-readable description.
    pub message: String,
    /// Field-level details for validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
    /// ISO 8601 timestamp of the failure.
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Case-insensitive collision on a customer name. Kept separate from
    /// `ValidationError` so callers can distinguish "fix your input" from
    /// "that customer already exists", but both map to 422.
    #[error("Duplicate customer name: {0}")]
    DuplicateName(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    /// PDF rendering or message dispatch failed. Entry and balance changes
    /// already committed stay committed.
    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(errors.to_string())
    }
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::ValidationError(_) | ServiceError::DuplicateName(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ServiceError::AuthError(_) => StatusCode::UNAUTHORIZED,
            ServiceError::ExternalServiceError(_) => StatusCode::BAD_GATEWAY,
            ServiceError::DatabaseError(_)
            | ServiceError::ConfigError(_)
            | ServiceError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the caller. Database and internal errors keep
    /// their detail in the logs only.
    pub fn response_message(&self) -> String {
        match self {
            ServiceError::DatabaseError(err) => {
                tracing::error!(error = %err, "database error");
                "A storage error occurred".to_string()
            }
            ServiceError::InternalError(err) => {
                tracing::error!(error = %err, "internal error");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            details: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        (status, Json(body)).into_response()
    }
}
