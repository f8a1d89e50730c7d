//! Error types for the Battle Top API
//!
//! Every handler returns `Result<_, ApiError>`. The variant decides the HTTP
//! status; server-side failures are logged in full and answered with a
//! generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use battle_core::{CoreError, Feature};
use tracing::error;

use crate::response::Envelope;

/// Main error type for API operations
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Feature is disabled: {0}")]
    FeatureDisabled(Feature),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),
}

impl ApiError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::FeatureDisabled(_) => StatusCode::FORBIDDEN,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to clients
    pub fn public_message(&self) -> String {
        if self.status_code().is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{} not found", what))
    }

    pub fn unauthenticated() -> Self {
        Self::Unauthorized("Not logged in".into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        let body = Envelope::<()>::failure(self.public_message());
        (status, axum::Json(body)).into_response()
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<jsonwebtoken::errors::Error> for ApiError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Unauthorized(format!("JWT error: {}", err))
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

/// Result type alias for API operations
pub type Result<T> = std::result::Result<T, ApiError>;
