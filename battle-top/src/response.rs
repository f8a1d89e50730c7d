//! JSON response envelope
//!
//! Every endpoint answers `{success, data?, error?, message?}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// 200 with data
pub fn ok<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(Envelope::success(data))).into_response()
}

/// 201 with data
pub fn created<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(Envelope::success(data))).into_response()
}

/// 200 with data and a human readable message
pub fn ok_with_message<T: Serialize>(data: T, message: impl Into<String>) -> Response {
    (StatusCode::OK, Json(Envelope::success(data).with_message(message))).into_response()
}

/// 200 with only a message
pub fn message(message: impl Into<String>) -> Response {
    let body = Envelope::<()> {
        success: true,
        data: None,
        error: None,
        message: Some(message.into()),
    };
    (StatusCode::OK, Json(body)).into_response()
}
