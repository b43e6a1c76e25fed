//! Error responses of the HTTP surface.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use r402x::registry::RegistryError;

/// Errors returned by request handlers before a stream starts.
///
/// Once a progress stream is open, failures travel inside it as terminal
/// error events instead.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The service registry could not be read.
    #[error("{0}")]
    Registry(#[from] RegistryError),

    /// No facilitator is configured.
    #[error("facilitator payments are not enabled on this server")]
    FacilitatorDisabled,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Registry(_) => StatusCode::BAD_GATEWAY,
            Self::FacilitatorDisabled => StatusCode::NOT_FOUND,
        };
        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
