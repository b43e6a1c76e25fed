//! Error taxonomy for settlement executions.
//!
//! Every failure terminates the current session with a single error event.
//! [`ErrorCategory`] is the machine-readable half of that event, letting a UI
//! tell "you rejected the signature" apart from "the network is down" or
//! "this payment was already settled" without parsing messages.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::descriptor::HookType;

/// Configuration or input errors, raised before any network interaction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A required address is unset (zero).
    #[error("{0} is not configured")]
    ZeroAddress(&'static str),
    /// A hook's supporting contract is missing from the service descriptor.
    #[error("hook {hook} requires supporting contract `{key}`")]
    MissingSupportingContract {
        /// Hook that needs the contract.
        hook: HookType,
        /// Descriptor key that was looked up.
        key: &'static str,
    },
    /// Split recipients were supplied for a hook that does not split payments.
    #[error("hook {0} does not accept split recipients")]
    UnexpectedSplits(HookType),
    /// A split share is outside `(0, 10000]`.
    #[error("split #{index} has an invalid share of {bips} bips")]
    InvalidSplitBips {
        /// Position of the offending split.
        index: usize,
        /// The offending share.
        bips: u16,
    },
    /// Split shares do not add up to 10000 bips.
    #[error("split shares sum to {total} bips, expected 10000")]
    SplitSumMismatch {
        /// Actual sum of all shares.
        total: u32,
    },
    /// A decimal amount could not be converted to token units.
    #[error("invalid amount {amount:?}: {reason}")]
    InvalidAmount {
        /// The rejected input.
        amount: String,
        /// Why it was rejected.
        reason: &'static str,
    },
    /// The signing identity differs from the payer in the settlement parameters.
    #[error("signer {signer} does not match payer {payer}")]
    SignerMismatch {
        /// Address of the signing capability.
        signer: Address,
        /// Payer recorded in the parameters.
        payer: Address,
    },
}

/// Machine-readable failure category carried by terminal error events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Missing configuration or malformed input.
    Validation,
    /// Service registry unreachable or service unknown.
    Discovery,
    /// Connected chain differs from the service's chain.
    ChainMismatch,
    /// The wallet holder declined to sign.
    UserRejected,
    /// Signing failed for a reason other than rejection.
    Signing,
    /// Payer balance cannot cover the payment.
    InsufficientFunds,
    /// The chain rejected the settlement.
    OnchainRevert,
    /// A remote facilitator declined to verify or settle the payment.
    FacilitatorRejected,
    /// RPC or HTTP transport failure.
    Network,
}

/// Terminal failure of an execution session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionError {
    /// Invalid configuration or input.
    #[error("Invalid configuration: {0}")]
    Validation(#[from] ValidationError),
    /// The service registry could not be read.
    #[error("Service registry unavailable: {0}")]
    Discovery(String),
    /// No service with the requested id exists.
    #[error("Service '{0}' not found")]
    ServiceNotFound(String),
    /// The signer is connected to a different chain than the service requires.
    #[error("Connected to chain {actual}, but the service requires chain {expected}")]
    ChainMismatch {
        /// Chain id declared by the service descriptor.
        expected: u64,
        /// Chain id reported by the connected node or wallet.
        actual: u64,
    },
    /// The external wallet declined the signature request.
    #[error("Signature request rejected: {0}")]
    UserRejected(String),
    /// Signing failed without an explicit rejection.
    #[error("Signing failed: {0}")]
    Signing(String),
    /// Payer balance is below the payment amount.
    #[error("Insufficient funds: balance {available} is below the required {required}")]
    InsufficientFunds {
        /// Required amount, formatted for display.
        required: String,
        /// Available balance, formatted for display.
        available: String,
    },
    /// The router or token contract rejected the transaction.
    #[error("Transaction reverted: {0}")]
    Reverted(String),
    /// A remote facilitator declined the payment.
    #[error("Facilitator rejected payment: {0}")]
    FacilitatorRejected(String),
    /// RPC or HTTP transport failure.
    #[error("Network error: {0}")]
    Network(String),
}

impl ExecutionError {
    /// Returns the machine-readable category of this error.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::Validation,
            Self::Discovery(_) | Self::ServiceNotFound(_) => ErrorCategory::Discovery,
            Self::ChainMismatch { .. } => ErrorCategory::ChainMismatch,
            Self::UserRejected(_) => ErrorCategory::UserRejected,
            Self::Signing(_) => ErrorCategory::Signing,
            Self::InsufficientFunds { .. } => ErrorCategory::InsufficientFunds,
            Self::Reverted(_) => ErrorCategory::OnchainRevert,
            Self::FacilitatorRejected(_) => ErrorCategory::FacilitatorRejected,
            Self::Network(_) => ErrorCategory::Network,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_distinguishes_rejection_from_signing_failure() {
        let rejected = ExecutionError::UserRejected("user denied".into());
        let failed = ExecutionError::Signing("device locked".into());
        assert_eq!(rejected.category(), ErrorCategory::UserRejected);
        assert_eq!(failed.category(), ErrorCategory::Signing);
    }

    #[test]
    fn test_category_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorCategory::OnchainRevert).unwrap();
        assert_eq!(json, "\"onchain_revert\"");
    }

    #[test]
    fn test_validation_error_converts() {
        let err: ExecutionError = ValidationError::SplitSumMismatch { total: 9999 }.into();
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert_eq!(
            err.to_string(),
            "Invalid configuration: split shares sum to 9999 bips, expected 10000"
        );
    }
}
