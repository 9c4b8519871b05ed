use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("driver is claimed by an active ride")]
    DriverBusy,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("no driver available")]
    NoDriverAvailable,

    #[error("otp mismatch")]
    OtpMismatch,

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("quote expired, request a fresh quote")]
    StaleQuote,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            DispatchError::InvalidCoordinate(msg) => {
                (StatusCode::BAD_REQUEST, format!("invalid coordinate: {msg}"))
            }
            DispatchError::DriverBusy => (
                StatusCode::CONFLICT,
                "driver is claimed by an active ride".to_string(),
            ),
            DispatchError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            DispatchError::NoDriverAvailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "no driver available".to_string(),
            ),
            DispatchError::OtpMismatch => (StatusCode::BAD_REQUEST, "otp mismatch".to_string()),
            DispatchError::InvalidTransition(msg) => {
                // Wrong-order-of-operations calls are client bugs, worth a log line.
                tracing::warn!(error = %msg, "invalid ride transition requested");
                (StatusCode::CONFLICT, format!("invalid transition: {msg}"))
            }
            DispatchError::StaleQuote => (
                StatusCode::CONFLICT,
                "quote expired, request a fresh quote".to_string(),
            ),
            DispatchError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            DispatchError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
