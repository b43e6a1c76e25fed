#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! HTTP collaborators and progress transports for x402 pay-and-execute flows.
//!
//! # Modules
//!
//! - [`registry`] - Cached HTTP service registry (feature: `client`)
//! - [`facilitator`] - Remote facilitator client and the facilitator payment
//!   pipeline (feature: `client`)
//! - [`proto`] - Facilitator wire types (feature: `client`)
//! - [`headers`] - Base64 encoding of the `X-PAYMENT` header (feature: `client`)
//! - [`error`] - HTTP client error types (feature: `client`)
//! - [`stream`] - SSE and NDJSON progress transports (feature: `server`)
//!
//! # Feature Flags
//!
//! - `client` - HTTP registry and facilitator clients
//! - `server` - axum response bodies for progress streams
//! - `telemetry` - Tracing spans on every outbound request

pub mod constants;

#[cfg(feature = "client")]
mod client;
#[cfg(feature = "client")]
pub mod error;
#[cfg(feature = "client")]
pub mod facilitator;
#[cfg(feature = "client")]
pub mod headers;
#[cfg(feature = "client")]
pub mod proto;
#[cfg(feature = "client")]
pub mod registry;

#[cfg(feature = "server")]
pub mod stream;

#[cfg(feature = "client")]
pub use error::HttpClientError;
#[cfg(feature = "client")]
pub use facilitator::{FacilitatorClient, FacilitatorPayment, FacilitatorSettings, PaymentOrder};
#[cfg(feature = "client")]
pub use registry::HttpServiceRegistry;
