//! Service descriptors and split recipients.
//!
//! A [`ServiceDescriptor`] is the immutable description of a payable service,
//! fetched from the service registry once per execution. It names the hook
//! contract that runs alongside the payment, the router and stablecoin on the
//! target network, and the default payment terms.

use std::collections::HashMap;
use std::fmt;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Total basis points of a complete split set (100.00%).
pub const BIPS_TOTAL: u16 = 10_000;

/// The kind of side effect a hook performs.
///
/// Serialized in kebab-case (`"nft-mint"`, `"reward-points"`, `"transfer-split"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HookType {
    /// Mints an NFT to the payer.
    NftMint,
    /// Credits reward points to the payer.
    RewardPoints,
    /// Splits the payment among several recipients.
    TransferSplit,
}

impl HookType {
    /// Key in [`ServiceDescriptor::supporting_contracts`] that holds the
    /// contract this hook needs, if any.
    #[must_use]
    pub const fn supporting_contract_key(self) -> Option<&'static str> {
        match self {
            Self::NftMint => Some("nftContract"),
            Self::RewardPoints => Some("rewardToken"),
            Self::TransferSplit => None,
        }
    }

    /// Wire name of the hook type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NftMint => "nft-mint",
            Self::RewardPoints => "reward-points",
            Self::TransferSplit => "transfer-split",
        }
    }
}

impl fmt::Display for HookType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default payment terms of a service.
///
/// Amounts are human-readable decimal strings in whole stablecoin units
/// (e.g. `"0.1"` for ten cents of USDC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDefaults {
    /// Amount paid to the recipient.
    pub payment_amount: String,
    /// Fee retained by the settling facilitator.
    #[serde(default = "zero_amount")]
    pub facilitator_fee: String,
    /// Recipient of the payment.
    pub pay_to: Address,
}

fn zero_amount() -> String {
    "0".to_owned()
}

/// Immutable description of a payable service.
///
/// # JSON Format
///
/// ```json
/// {
///   "id": "mint-badge",
///   "title": "Mint a badge",
///   "hookType": "nft-mint",
///   "hookAddress": "0x...",
///   "network": "base-sepolia",
///   "chainId": 84532,
///   "settlementRouterAddress": "0x...",
///   "stablecoinAddress": "0x...",
///   "supportingContracts": { "nftContract": "0x..." },
///   "defaults": { "paymentAmount": "0.1", "facilitatorFee": "0", "payTo": "0x..." }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDescriptor {
    /// Registry identifier.
    pub id: String,
    /// Human-readable title.
    pub title: String,
    /// Side effect performed by the hook.
    pub hook_type: HookType,
    /// Hook contract invoked by the router.
    pub hook_address: Address,
    /// Network name (e.g. `"base-sepolia"`).
    pub network: String,
    /// EIP-155 chain id the service is deployed on.
    pub chain_id: u64,
    /// Settlement router contract.
    pub settlement_router_address: Address,
    /// Stablecoin (EIP-3009 token) contract.
    pub stablecoin_address: Address,
    /// Auxiliary contracts used by the hook, keyed by role.
    #[serde(default)]
    pub supporting_contracts: HashMap<String, Address>,
    /// Default payment terms.
    pub defaults: ServiceDefaults,
}

impl ServiceDescriptor {
    /// Returns the configured supporting contract for `key`, treating the
    /// zero address as unset.
    #[must_use]
    pub fn supporting_contract(&self, key: &str) -> Option<Address> {
        self.supporting_contracts
            .get(key)
            .copied()
            .filter(|address| !address.is_zero())
    }

    /// Checks that every address the settlement depends on is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ZeroAddress`] for the first unset address.
    pub fn validate_addresses(&self) -> Result<(), ValidationError> {
        let required = [
            ("hookAddress", self.hook_address),
            ("settlementRouterAddress", self.settlement_router_address),
            ("stablecoinAddress", self.stablecoin_address),
            ("defaults.payTo", self.defaults.pay_to),
        ];
        for (field, address) in required {
            if address.is_zero() {
                return Err(ValidationError::ZeroAddress(field));
            }
        }
        Ok(())
    }
}

/// Looks up a service by id in a registry listing.
#[must_use]
pub fn find_service<'a>(services: &'a [ServiceDescriptor], id: &str) -> Option<&'a ServiceDescriptor> {
    services.iter().find(|service| service.id == id)
}

/// One recipient of a transfer-split payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitRecipient {
    /// Address receiving this share.
    pub recipient: Address,
    /// Share in basis points (1/100 of a percent).
    pub bips: u16,
}

impl SplitRecipient {
    /// Creates a split recipient.
    #[must_use]
    pub const fn new(recipient: Address, bips: u16) -> Self {
        Self { recipient, bips }
    }
}

/// Validates a split set.
///
/// Every recipient must be non-zero, every share must lie in `(0, 10000]`,
/// and the shares must sum to exactly [`BIPS_TOTAL`]. An empty set is valid
/// and means "pay `payTo` directly".
///
/// # Errors
///
/// Returns the first [`ValidationError`] encountered.
pub fn validate_splits(splits: &[SplitRecipient]) -> Result<(), ValidationError> {
    if splits.is_empty() {
        return Ok(());
    }
    let mut total: u32 = 0;
    for (index, split) in splits.iter().enumerate() {
        if split.recipient.is_zero() {
            return Err(ValidationError::ZeroAddress("splits.recipient"));
        }
        if split.bips == 0 || split.bips > BIPS_TOTAL {
            return Err(ValidationError::InvalidSplitBips {
                index,
                bips: split.bips,
            });
        }
        total += u32::from(split.bips);
    }
    if total != u32::from(BIPS_TOTAL) {
        return Err(ValidationError::SplitSumMismatch { total });
    }
    Ok(())
}
