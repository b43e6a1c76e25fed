//! HTTP client error types.

use http::StatusCode;
use r402x::error::ExecutionError;
use r402x::registry::RegistryError;

/// Errors that can occur while talking to a registry or facilitator.
#[derive(Debug, thiserror::Error)]
pub enum HttpClientError {
    /// URL parse error.
    #[error("URL parse error: {context}: {source}")]
    UrlParse {
        /// Human-readable context.
        context: &'static str,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },
    /// HTTP transport error.
    #[error("HTTP error: {context}: {source}")]
    Http {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// JSON deserialization error.
    #[error("Failed to deserialize JSON: {context}: {source}")]
    JsonDeserialization {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// Unexpected HTTP status code.
    #[error("Unexpected HTTP status {status}: {context}: {body}")]
    HttpStatus {
        /// Human-readable context.
        context: &'static str,
        /// The HTTP status code.
        status: StatusCode,
        /// The response body.
        body: String,
    },
    /// Failed to read response body.
    #[error("Failed to read response body as text: {context}: {source}")]
    ResponseBodyRead {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
}

impl From<HttpClientError> for RegistryError {
    fn from(err: HttpClientError) -> Self {
        match err {
            HttpClientError::JsonDeserialization { .. } => Self::Malformed(err.to_string()),
            _ => Self::Transport(err.to_string()),
        }
    }
}

impl From<HttpClientError> for ExecutionError {
    fn from(err: HttpClientError) -> Self {
        Self::Network(err.to_string())
    }
}

/// Errors decoding an `X-PAYMENT` header value.
#[derive(Debug, thiserror::Error)]
pub enum HeaderError {
    /// The value is not valid base64.
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    /// The decoded bytes are not the expected JSON document.
    #[error("invalid header JSON: {0}")]
    Json(#[from] serde_json::Error),
}
