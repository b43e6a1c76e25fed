#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! EVM settlement-router client for x402 pay-and-execute payments.
//!
//! A settlement moves a stablecoin payment under an ERC-3009
//! `transferWithAuthorization` and invokes a hook contract in the same
//! transaction. The router commitment over all settlement parameters doubles
//! as the authorization nonce, so one signature authorizes exactly one
//! payment-plus-side-effect and can never be replayed.
//!
//! # Architecture
//!
//! - [`hook`] - Hook data codec keyed by hook type
//! - [`params`] - Settlement parameters, salts and validity windows
//! - [`commitment`] - Commitment derivation through the router
//! - [`signer`] - Held-key and delegated-wallet authorization signing
//! - [`submit`] - Settlement submission and receipt parsing
//! - [`orchestrator`] - The end-to-end settlement pipeline
//! - [`chain`] - Chain access trait and alloy-backed client
//! - [`contract`] - Solidity bindings
//!
//! # Feature Flags
//!
//! - `telemetry` - Tracing spans and events on every suspension point

pub mod chain;
pub mod commitment;
pub mod contract;
pub mod hook;
pub mod orchestrator;
pub mod params;
pub mod signer;
pub mod submit;

mod networks;
pub use networks::*;

#[cfg(test)]
mod testing;

pub use chain::{ChainError, EvmChainClient, SettlementChain};
pub use commitment::CommittedSettlement;
pub use hook::HookData;
pub use orchestrator::{ExecutionOutcome, ExecutionRequest, Executor, ExecutorConfig};
pub use params::SettlementParameters;
pub use signer::{DelegatedSigner, HeldKeySigner, SigningMode, SigningStrategy};
