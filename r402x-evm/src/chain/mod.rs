//! Chain access for settlement clients.
//!
//! [`SettlementChain`] is the seam between the settlement pipeline and an EVM
//! node. The pipeline only ever needs a handful of calls: the connected chain
//! id, the token's EIP-712 domain, a balance, the router's commitment, and
//! sending plus confirming `settleAndExecute`. Keeping the trait this narrow
//! lets the pipeline run against [`EvmChainClient`] in production and against
//! an in-memory chain in tests.

mod client;

pub use client::EvmChainClient;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use alloy_primitives::{Address, B256, Bytes, Log, TxHash, U256};
use alloy_transport::TransportError;
use r402x::error::ExecutionError;
use serde::{Deserialize, Serialize};

use crate::params::SettlementParameters;

/// Boxed future returned by [`SettlementChain`] methods.
pub type ChainFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ChainError>> + Send + 'a>>;

/// Errors raised by chain access.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    /// The node executed the call and it reverted.
    #[error("{0}")]
    Revert(String),
    /// The node could not be reached or answered with a transport-level error.
    #[error("RPC transport error: {0}")]
    Transport(String),
    /// The transaction was not confirmed in time.
    #[error("timed out waiting for transaction {0}")]
    Timeout(TxHash),
    /// The contract is missing or returned data that does not match its ABI.
    #[error("contract call failed: {0}")]
    Contract(String),
}

impl From<ChainError> for ExecutionError {
    fn from(e: ChainError) -> Self {
        match e {
            ChainError::Revert(reason) => Self::Reverted(reason),
            ChainError::Transport(_) | ChainError::Timeout(_) | ChainError::Contract(_) => {
                Self::Network(e.to_string())
            }
        }
    }
}

impl From<TransportError> for ChainError {
    fn from(e: TransportError) -> Self {
        match e.as_error_resp() {
            Some(payload) => Self::Revert(client::describe_revert(payload)),
            None => Self::Transport(e.to_string()),
        }
    }
}

impl From<alloy_contract::Error> for ChainError {
    fn from(e: alloy_contract::Error) -> Self {
        match e {
            alloy_contract::Error::TransportError(e) => e.into(),
            alloy_contract::Error::PendingTransactionError(e) => Self::Transport(e.to_string()),
            other => Self::Contract(other.to_string()),
        }
    }
}

/// EIP-712 domain fields published by an EIP-3009 token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDomain {
    /// Token `name()`.
    pub name: String,
    /// Token `version()`.
    pub version: String,
}

/// Mined settlement transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementReceipt {
    /// Transaction hash.
    pub tx_hash: TxHash,
    /// Block the transaction was included in.
    pub block_number: u64,
    /// `true` when the transaction did not revert.
    pub success: bool,
    /// Logs emitted by the transaction, in order.
    pub logs: Vec<Log>,
}

/// Minimal chain surface used by the settlement pipeline.
///
/// Dyn-compatible so that executors can hold `Arc<dyn SettlementChain>`.
pub trait SettlementChain: Send + Sync {
    /// Returns the chain id of the connected node.
    fn chain_id(&self) -> ChainFuture<'_, u64>;

    /// Reads the EIP-712 domain name and version of `token`.
    fn token_domain(&self, token: Address) -> ChainFuture<'_, TokenDomain>;

    /// Reads the `token` balance of `owner`.
    fn balance_of(&self, token: Address, owner: Address) -> ChainFuture<'_, U256>;

    /// Calls the router's `calculateCommitment` view with `params`.
    fn calculate_commitment<'a>(
        &'a self,
        router: Address,
        params: &'a SettlementParameters,
    ) -> ChainFuture<'a, B256>;

    /// Sends `settleAndExecute` with `params` and the transfer authorization
    /// signature, returning the transaction hash once accepted by the node.
    fn send_settlement<'a>(
        &'a self,
        router: Address,
        params: &'a SettlementParameters,
        nonce: B256,
        signature: &'a Bytes,
    ) -> ChainFuture<'a, TxHash>;

    /// Waits for `tx_hash` to be mined.
    fn wait_for_receipt(&self, tx_hash: TxHash) -> ChainFuture<'_, SettlementReceipt>;
}

impl<T: SettlementChain + ?Sized> SettlementChain for Arc<T> {
    fn chain_id(&self) -> ChainFuture<'_, u64> {
        (**self).chain_id()
    }

    fn token_domain(&self, token: Address) -> ChainFuture<'_, TokenDomain> {
        (**self).token_domain(token)
    }

    fn balance_of(&self, token: Address, owner: Address) -> ChainFuture<'_, U256> {
        (**self).balance_of(token, owner)
    }

    fn calculate_commitment<'a>(
        &'a self,
        router: Address,
        params: &'a SettlementParameters,
    ) -> ChainFuture<'a, B256> {
        (**self).calculate_commitment(router, params)
    }

    fn send_settlement<'a>(
        &'a self,
        router: Address,
        params: &'a SettlementParameters,
        nonce: B256,
        signature: &'a Bytes,
    ) -> ChainFuture<'a, TxHash> {
        (**self).send_settlement(router, params, nonce, signature)
    }

    fn wait_for_receipt(&self, tx_hash: TxHash) -> ChainFuture<'_, SettlementReceipt> {
        (**self).wait_for_receipt(tx_hash)
    }
}
