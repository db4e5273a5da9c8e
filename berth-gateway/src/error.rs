//! Error types for the gateway crate.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use berth_core::CoreError;
use berth_engine::EngineError;
use serde_json::json;

/// Errors that can occur during gateway request handling.
///
/// `Display` is the bare message; it is what callers see under `error`.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GatewayError {
    /// A required field is missing or a field value is not allowed.
    #[error("{0}")]
    Validation(String),

    /// The referenced container does not exist in the engine.
    #[error("{0}")]
    NotFound(String),

    /// Any other failure from the engine or its client.
    #[error("{0}")]
    Engine(String),
}

impl GatewayError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<EngineError> for GatewayError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NotFound(msg) => GatewayError::NotFound(msg),
            other => GatewayError::Engine(other.to_string()),
        }
    }
}

impl From<CoreError> for GatewayError {
    fn from(err: CoreError) -> Self {
        GatewayError::Validation(err.to_string())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(%status, error = %self, "request failed");
        } else {
            tracing::warn!(%status, error = %self, "request rejected");
        }
        (status, Json(json!({"error": self.to_string()}))).into_response()
    }
}
