//! Commitment derivation.
//!
//! The commitment is whatever the router's `calculateCommitment` view
//! returns for the settlement parameters. It is never recomputed locally: the
//! router is the single source of truth for the hash layout, so a contract
//! upgrade cannot silently desynchronize client and chain.

use alloy_primitives::{Address, B256};
use serde::Serialize;
#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::chain::{ChainError, SettlementChain};
use crate::params::SettlementParameters;

/// Settlement parameters sealed together with their router commitment.
///
/// The parameters cannot be changed once sealed, so the commitment, the
/// signed nonce and the submitted parameters always agree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommittedSettlement {
    router: Address,
    params: SettlementParameters,
    commitment: B256,
}

impl CommittedSettlement {
    /// Router the commitment was obtained from.
    #[must_use]
    pub const fn router(&self) -> Address {
        self.router
    }

    /// Sealed settlement parameters.
    #[must_use]
    pub const fn params(&self) -> &SettlementParameters {
        &self.params
    }

    /// Router commitment, used as the authorization nonce.
    #[must_use]
    pub const fn commitment(&self) -> B256 {
        self.commitment
    }
}

/// Asks `router` for the commitment of `params` and seals them together.
///
/// # Errors
///
/// Returns [`ChainError`] when the router call fails.
#[cfg_attr(feature = "telemetry", instrument(name = "commitment.calculate", skip_all, err, fields(router = %router)))]
pub async fn calculate(
    chain: &dyn SettlementChain,
    router: Address,
    params: SettlementParameters,
) -> Result<CommittedSettlement, ChainError> {
    let commitment = chain.calculate_commitment(router, &params).await?;
    #[cfg(feature = "telemetry")]
    tracing::debug!(%router, %commitment, salt = %params.salt(), "commitment calculated");
    Ok(CommittedSettlement {
        router,
        params,
        commitment,
    })
}
