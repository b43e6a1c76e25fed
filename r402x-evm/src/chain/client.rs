//! Alloy-backed [`SettlementChain`] implementation.

use std::time::Duration;

use alloy_json_rpc::ErrorPayload;
use alloy_primitives::{Address, B256, Bytes, TxHash, U256};
use alloy_provider::{PendingTransactionBuilder, PendingTransactionError, Provider, WatchTxError};
use alloy_sol_types::SolInterface;

use super::{ChainError, ChainFuture, SettlementChain, SettlementReceipt, TokenDomain};
use crate::contract::{IEIP3009, ISettlementRouter};
use crate::params::SettlementParameters;

/// Default number of confirmations awaited for a settlement.
pub const DEFAULT_CONFIRMATIONS: u64 = 1;

/// Default receipt timeout.
pub const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(60);

/// [`SettlementChain`] over any alloy [`Provider`].
///
/// Sending a settlement requires the provider to carry a wallet filler for
/// the submitting account; read-only calls work with any provider.
#[derive(Debug, Clone)]
pub struct EvmChainClient<P> {
    provider: P,
    confirmations: u64,
    receipt_timeout: Duration,
}

impl<P> EvmChainClient<P> {
    /// Wraps `provider` with default confirmation settings.
    pub const fn new(provider: P) -> Self {
        Self {
            provider,
            confirmations: DEFAULT_CONFIRMATIONS,
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT,
        }
    }

    /// Sets the number of confirmations to wait for.
    #[must_use]
    pub const fn with_confirmations(mut self, confirmations: u64) -> Self {
        self.confirmations = confirmations;
        self
    }

    /// Sets how long to wait for a receipt.
    #[must_use]
    pub const fn with_receipt_timeout(mut self, timeout: Duration) -> Self {
        self.receipt_timeout = timeout;
        self
    }

    /// Returns the underlying provider.
    pub const fn provider(&self) -> &P {
        &self.provider
    }
}

impl<P: Provider + Send + Sync> SettlementChain for EvmChainClient<P> {
    fn chain_id(&self) -> ChainFuture<'_, u64> {
        Box::pin(async move { Ok(self.provider.get_chain_id().await?) })
    }

    fn token_domain(&self, token: Address) -> ChainFuture<'_, TokenDomain> {
        Box::pin(async move {
            let contract = IEIP3009::new(token, &self.provider);
            let name = contract.name().call().await?;
            let version = contract.version().call().await?;
            Ok(TokenDomain { name, version })
        })
    }

    fn balance_of(&self, token: Address, owner: Address) -> ChainFuture<'_, U256> {
        Box::pin(async move {
            let contract = IEIP3009::new(token, &self.provider);
            Ok(contract.balanceOf(owner).call().await?)
        })
    }

    fn calculate_commitment<'a>(
        &'a self,
        router: Address,
        params: &'a SettlementParameters,
    ) -> ChainFuture<'a, B256> {
        Box::pin(async move {
            let contract = ISettlementRouter::new(router, &self.provider);
            let commitment = contract
                .calculateCommitment(
                    params.token(),
                    params.from(),
                    params.value(),
                    U256::from(params.valid_after().as_secs()),
                    U256::from(params.valid_before().as_secs()),
                    params.salt(),
                    params.pay_to(),
                    params.facilitator_fee(),
                    params.hook(),
                    params.hook_data().clone(),
                )
                .call()
                .await?;
            Ok(commitment)
        })
    }

    fn send_settlement<'a>(
        &'a self,
        router: Address,
        params: &'a SettlementParameters,
        nonce: B256,
        signature: &'a Bytes,
    ) -> ChainFuture<'a, TxHash> {
        Box::pin(async move {
            let contract = ISettlementRouter::new(router, &self.provider);
            let pending = contract
                .settleAndExecute(
                    params.token(),
                    params.from(),
                    params.value(),
                    U256::from(params.valid_after().as_secs()),
                    U256::from(params.valid_before().as_secs()),
                    nonce,
                    signature.clone(),
                    params.salt(),
                    params.pay_to(),
                    params.facilitator_fee(),
                    params.hook(),
                    params.hook_data().clone(),
                )
                .send()
                .await?;
            let tx_hash = *pending.tx_hash();
            #[cfg(feature = "telemetry")]
            tracing::info!(%router, %nonce, %tx_hash, "settlement transaction sent");
            Ok(tx_hash)
        })
    }

    fn wait_for_receipt(&self, tx_hash: TxHash) -> ChainFuture<'_, SettlementReceipt> {
        Box::pin(async move {
            let watcher = PendingTransactionBuilder::new(self.provider.root().clone(), tx_hash)
                .with_required_confirmations(self.confirmations)
                .with_timeout(Some(self.receipt_timeout));
            let receipt = match watcher.get_receipt().await {
                Ok(receipt) => receipt,
                Err(PendingTransactionError::TxWatcher(WatchTxError::Timeout)) => {
                    return Err(ChainError::Timeout(tx_hash));
                }
                Err(e) => return Err(ChainError::Transport(e.to_string())),
            };
            Ok(SettlementReceipt {
                tx_hash: receipt.transaction_hash,
                block_number: receipt.block_number.unwrap_or_default(),
                success: receipt.status(),
                logs: receipt
                    .inner
                    .logs()
                    .iter()
                    .map(|log| log.inner.clone())
                    .collect(),
            })
        })
    }
}

/// Renders a JSON-RPC error into a revert reason, decoding router custom
/// errors when the node returns revert data.
pub(super) fn describe_revert(payload: &ErrorPayload) -> String {
    let decoded = payload
        .as_revert_data()
        .and_then(|data| ISettlementRouter::ISettlementRouterErrors::abi_decode(&data).ok());
    match decoded {
        Some(ISettlementRouter::ISettlementRouterErrors::AlreadySettled(_)) => {
            "commitment already settled".to_owned()
        }
        Some(ISettlementRouter::ISettlementRouterErrors::InvalidCommitment(_)) => {
            "commitment does not match settlement parameters".to_owned()
        }
        Some(ISettlementRouter::ISettlementRouterErrors::HookExecutionFailed(e)) => {
            format!("hook {} failed", e.hook)
        }
        None => payload.message.to_string(),
    }
}
