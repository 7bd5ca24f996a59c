//! HTTP error mapping.
//!
//! Converts core errors and handler-local conditions into responses with
//! the service's JSON error page shape: `{"error": "<code> <reason>"}`.
//! Error detail goes to the logs, never onto the wire.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::Error;

/// Errors surfaced by the HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The `key` query parameter was not supplied.
    #[error("missing required query parameter: key")]
    MissingKey,

    /// The request body exceeded the size cap.
    #[error("request body exceeds {0} bytes")]
    BodyTooLarge(usize),

    /// The core rejected the operation.
    #[error(transparent)]
    Core(#[from] Error),
}

impl ApiError {
    /// Maps the error taxonomy onto HTTP status codes.
    const fn status(&self) -> StatusCode {
        match self {
            Self::MissingKey | Self::Core(Error::InvalidPayload(_)) => StatusCode::BAD_REQUEST,
            Self::BodyTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Core(Error::NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Core(Error::KeyConflict { .. }) => StatusCode::CONFLICT,
            Self::Core(Error::StorageUnavailable { .. } | Error::Config(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }

        let reason = status.canonical_reason().unwrap_or("Unknown");
        let body = Json(serde_json::json!({
            "error": format!("{} {}", status.as_u16(), reason),
        }));
        (status, body).into_response()
    }
}
