#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for x402 settlement-router payments.
//!
//! A settlement router moves a stablecoin payment under a single-use
//! EIP-3009 authorization and, in the same transaction, invokes a *hook*
//! contract that performs a side effect (mint an NFT, credit reward points,
//! split the payment). This crate holds the chain-agnostic half of that
//! flow; chain bindings live in `r402x-evm`.
//!
//! # Modules
//!
//! - [`amount`] - Decimal amount parsing and display formatting
//! - [`descriptor`] - Service descriptors and split recipients
//! - [`error`] - Execution error taxonomy
//! - [`event`] - Progress events and event sinks
//! - [`registry`] - Service registry abstraction
//! - [`session`] - Per-execution progress session
//! - [`timestamp`] - Unix timestamps for authorization windows
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation

pub mod amount;
pub mod descriptor;
pub mod error;
pub mod event;
pub mod registry;
pub mod session;
pub mod timestamp;

pub use descriptor::{HookType, ServiceDefaults, ServiceDescriptor, SplitRecipient};
pub use error::{ErrorCategory, ExecutionError, ValidationError};
pub use event::{EventKind, EventSink, ProgressEvent, Step};
pub use registry::ServiceRegistry;
pub use session::ExecutionSession;
pub use timestamp::UnixTimestamp;
