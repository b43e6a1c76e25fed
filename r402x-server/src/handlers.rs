//! Axum route handlers.
//!
//! `POST /execute` and `POST /facilitator/pay` answer with a progress stream
//! (SSE by default, NDJSON with `?format=ndjson`). Each request runs its own
//! session on a background task; the stream ends after the terminal event.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use r402x::descriptor::ServiceDescriptor;
use r402x_evm::{ExecutionRequest, Executor, SigningStrategy};
use r402x_http::facilitator::{FacilitatorPayment, PaymentOrder};
use r402x_http::stream::{self, FormatQuery};
use serde_json::{Value, json};

use crate::error::ServerError;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Settlement pipeline.
    pub executor: Arc<Executor>,
    /// Held-key signer paying for server-driven executions.
    pub signer: Arc<dyn SigningStrategy>,
    /// Hook-less payment pipeline, when configured.
    pub facilitator: Option<Arc<FacilitatorPayment>>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("executor", &self.executor)
            .field("signer", &self.signer.address())
            .field("facilitator", &self.facilitator.is_some())
            .finish()
    }
}

/// Builds the application router.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/services", get(list_services))
        .route("/execute", post(execute))
        .route("/facilitator/pay", post(facilitator_pay))
        .with_state(state)
}

/// `GET /health` - Liveness plus the paying address.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "payer": state.signer.address(),
        "facilitator": state.facilitator.is_some(),
    }))
}

/// `GET /services` - The registry's service list.
///
/// # Errors
///
/// Returns 502 if the registry cannot be read.
pub async fn list_services(
    State(state): State<AppState>,
) -> Result<Json<Vec<ServiceDescriptor>>, ServerError> {
    Ok(Json(state.executor.registry().services().await?))
}

/// `POST /execute` - Runs a settlement and streams its progress.
pub async fn execute(
    State(state): State<AppState>,
    Query(query): Query<FormatQuery>,
    Json(request): Json<ExecutionRequest>,
) -> Response {
    tracing::info!(service_id = %request.service_id, format = ?query.format, "execution requested");
    let events = state.executor.spawn(request, Arc::clone(&state.signer));
    stream::respond(query.format, events)
}

/// `POST /facilitator/pay` - Pays through the remote facilitator and streams
/// its progress.
///
/// # Errors
///
/// Returns 404 if no facilitator is configured.
pub async fn facilitator_pay(
    State(state): State<AppState>,
    Query(query): Query<FormatQuery>,
    Json(order): Json<PaymentOrder>,
) -> Result<Response, ServerError> {
    let facilitator = state
        .facilitator
        .as_ref()
        .ok_or(ServerError::FacilitatorDisabled)?;
    tracing::info!(pay_to = %order.pay_to, amount = %order.amount, "facilitator payment requested");
    let events = facilitator.spawn(order, Arc::clone(&state.signer));
    Ok(stream::respond(query.format, events))
}
