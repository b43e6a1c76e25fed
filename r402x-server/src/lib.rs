//! HTTP server for x402 pay-and-execute settlements.
//!
//! # Modules
//!
//! - [`handlers`] - Axum route handlers and router builder
//! - [`error`] - Handler error responses
//! - [`config`] - Server configuration with environment variable expansion

pub mod config;
pub mod error;
pub mod handlers;

pub use handlers::{AppState, app_router};
