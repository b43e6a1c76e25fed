//! Settlement submission and receipt parsing.
//!
//! Submission is a single `settleAndExecute` transaction: the router pulls the
//! authorized funds and runs the hook atomically. If either part fails the
//! whole transaction reverts and nothing is transferred.

use alloy_primitives::{Address, B256, TxHash};
use alloy_sol_types::SolEvent;
use r402x::error::ExecutionError;
use serde::{Deserialize, Serialize};
#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::chain::{ChainError, SettlementChain, SettlementReceipt};
use crate::commitment::CommittedSettlement;
use crate::contract::{INftMintHook, IRewardHook, ISettlementRouter};
use crate::signer::Authorization;

/// `Settled` event emitted by the router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettledEvent {
    /// Commitment the settlement was recorded under.
    pub commitment: B256,
    /// Payer.
    pub payer: Address,
    /// Amount pulled, in token base units.
    pub amount: String,
    /// Hook that ran.
    pub hook: Address,
}

/// Reward points credited by the reward-points hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardSummary {
    /// Credited account.
    pub recipient: Address,
    /// Reward token.
    pub reward_token: Address,
    /// Points credited, in reward token base units.
    pub points: String,
}

/// Token minted by the NFT-mint hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintSummary {
    /// Receiver of the token.
    pub recipient: Address,
    /// NFT contract.
    pub nft_contract: Address,
    /// Minted token id.
    pub token_id: String,
}

/// Structured information recovered from a settlement receipt.
///
/// Parsing is best effort: logs that cannot be decoded are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementDetails {
    /// The router's `Settled` event, if present.
    pub settled: Option<SettledEvent>,
    /// Rewards credited by the hook.
    pub rewards: Vec<RewardSummary>,
    /// Tokens minted by the hook.
    pub minted: Vec<MintSummary>,
}

/// Sends `settleAndExecute` for `settlement` signed by `authorization`.
///
/// # Errors
///
/// Returns [`ExecutionError::Signing`] when the authorization was not signed
/// for this settlement, [`ExecutionError::Reverted`] when the node rejects
/// the transaction, and [`ExecutionError::Network`] on transport failure.
#[cfg_attr(feature = "telemetry", instrument(name = "settlement.send", skip_all, err, fields(commitment = %settlement.commitment())))]
pub async fn send_settlement(
    chain: &dyn SettlementChain,
    settlement: &CommittedSettlement,
    authorization: &Authorization,
) -> Result<TxHash, ExecutionError> {
    if authorization.typed.message.nonce != settlement.commitment()
        || authorization.typed.message.to != settlement.router()
    {
        return Err(ExecutionError::Signing(
            "authorization was not signed for this settlement".to_owned(),
        ));
    }
    let tx_hash = chain
        .send_settlement(
            settlement.router(),
            settlement.params(),
            settlement.commitment(),
            &authorization.signature,
        )
        .await?;
    Ok(tx_hash)
}

/// Waits for `tx_hash` to be mined and checks that it succeeded.
///
/// # Errors
///
/// Returns [`ExecutionError::Reverted`] when the transaction reverted, and
/// [`ExecutionError::Network`] when no receipt arrives.
#[cfg_attr(feature = "telemetry", instrument(name = "settlement.confirm", skip(chain), err))]
pub async fn await_confirmation(
    chain: &dyn SettlementChain,
    tx_hash: TxHash,
) -> Result<SettlementReceipt, ExecutionError> {
    let receipt = chain.wait_for_receipt(tx_hash).await?;
    if !receipt.success {
        return Err(ChainError::Revert(format!("transaction {tx_hash} reverted")).into());
    }
    #[cfg(feature = "telemetry")]
    tracing::info!(%tx_hash, block = receipt.block_number, "settlement confirmed");
    Ok(receipt)
}

/// Submits the settlement and waits for its receipt.
///
/// # Errors
///
/// See [`send_settlement`] and [`await_confirmation`].
pub async fn submit(
    chain: &dyn SettlementChain,
    settlement: &CommittedSettlement,
    authorization: &Authorization,
) -> Result<SettlementReceipt, ExecutionError> {
    let tx_hash = send_settlement(chain, settlement, authorization).await?;
    await_confirmation(chain, tx_hash).await
}

/// Extracts router and hook events from `receipt`.
///
/// Only `Settled` events emitted by `router` are considered; hook events are
/// accepted from any address since hooks may delegate to token contracts.
#[must_use]
pub fn parse_details(receipt: &SettlementReceipt, router: Address) -> SettlementDetails {
    let mut details = SettlementDetails::default();
    for log in &receipt.logs {
        let Some(topic) = log.data.topics().first() else {
            continue;
        };
        if *topic == ISettlementRouter::Settled::SIGNATURE_HASH
            && log.address == router
            && let Ok(event) = ISettlementRouter::Settled::decode_log_data(&log.data)
        {
            details.settled = Some(SettledEvent {
                commitment: event.contextKey,
                payer: event.payer,
                amount: event.amount.to_string(),
                hook: event.hook,
            });
        } else if *topic == IRewardHook::RewardsDistributed::SIGNATURE_HASH
            && let Ok(event) = IRewardHook::RewardsDistributed::decode_log_data(&log.data)
        {
            details.rewards.push(RewardSummary {
                recipient: event.recipient,
                reward_token: event.rewardToken,
                points: event.points.to_string(),
            });
        } else if *topic == INftMintHook::NftMinted::SIGNATURE_HASH
            && let Ok(event) = INftMintHook::NftMinted::decode_log_data(&log.data)
        {
            details.minted.push(MintSummary {
                recipient: event.recipient,
                nft_contract: event.nftContract,
                token_id: event.tokenId.to_string(),
            });
        }
    }
    details
}
