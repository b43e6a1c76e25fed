//! Hook data codec.
//!
//! Each hook type reads a fixed ABI layout from the `hookData` bytes passed to
//! the router:
//!
//! | Hook            | Layout                                      |
//! |-----------------|---------------------------------------------|
//! | `nft-mint`      | `(address nftContract)`                     |
//! | `reward-points` | `(address rewardToken)`                     |
//! | `transfer-split`| `(address recipient, uint16 bips)[]`, or `0x` |
//!
//! Empty hook data for `transfer-split` tells the hook to forward the whole
//! payment to `payTo`. Encoding is deterministic: the same inputs always
//! produce the same bytes, which is what makes the router commitment stable.

use std::collections::HashMap;

use alloy_primitives::{Address, Bytes};
use alloy_sol_types::SolValue;
use r402x::descriptor::{HookType, ServiceDescriptor, SplitRecipient, validate_splits};
use r402x::error::ValidationError;

use crate::contract::{MintConfig, RewardConfig, Split};

/// Decoded hook data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookData {
    /// Mint from the given NFT contract.
    NftMint {
        /// NFT contract to mint from.
        nft_contract: Address,
    },
    /// Distribute points of the given reward token.
    RewardPoints {
        /// Reward token contract.
        reward_token: Address,
    },
    /// Split the payment between recipients; empty means "all to `payTo`".
    TransferSplit(Vec<SplitRecipient>),
}

/// Errors raised while decoding hook data.
#[derive(Debug, thiserror::Error)]
pub enum HookDataError {
    /// The bytes do not match the hook's ABI layout.
    #[error("malformed hook data for {hook}: {source}")]
    Abi {
        /// Hook whose layout was expected.
        hook: HookType,
        /// Underlying ABI error.
        #[source]
        source: alloy_sol_types::Error,
    },
}

impl HookData {
    /// Builds hook data for `hook_type` from descriptor supporting contracts
    /// and optional split recipients.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingSupportingContract`] when the hook's
    /// supporting contract is absent or zero,
    /// [`ValidationError::UnexpectedSplits`] when splits are given to a hook
    /// other than `transfer-split`, and split validation errors otherwise.
    pub fn build(
        hook_type: HookType,
        supporting_contracts: &HashMap<String, Address>,
        splits: Option<&[SplitRecipient]>,
    ) -> Result<Self, ValidationError> {
        let splits = splits.unwrap_or_default();
        if hook_type != HookType::TransferSplit && !splits.is_empty() {
            return Err(ValidationError::UnexpectedSplits(hook_type));
        }
        let required = || {
            let key = hook_type.supporting_contract_key().unwrap_or_default();
            supporting_contracts
                .get(key)
                .copied()
                .filter(|address| !address.is_zero())
                .ok_or(ValidationError::MissingSupportingContract {
                    hook: hook_type,
                    key,
                })
        };
        match hook_type {
            HookType::NftMint => Ok(Self::NftMint {
                nft_contract: required()?,
            }),
            HookType::RewardPoints => Ok(Self::RewardPoints {
                reward_token: required()?,
            }),
            HookType::TransferSplit => {
                validate_splits(splits)?;
                Ok(Self::TransferSplit(splits.to_vec()))
            }
        }
    }

    /// Builds hook data for a service descriptor.
    ///
    /// # Errors
    ///
    /// See [`HookData::build`].
    pub fn for_service(
        service: &ServiceDescriptor,
        splits: Option<&[SplitRecipient]>,
    ) -> Result<Self, ValidationError> {
        Self::build(service.hook_type, &service.supporting_contracts, splits)
    }

    /// Returns the hook type this data is laid out for.
    #[must_use]
    pub const fn hook_type(&self) -> HookType {
        match self {
            Self::NftMint { .. } => HookType::NftMint,
            Self::RewardPoints { .. } => HookType::RewardPoints,
            Self::TransferSplit(_) => HookType::TransferSplit,
        }
    }

    /// ABI-encodes the hook data.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        match self {
            Self::NftMint { nft_contract } => MintConfig {
                nftContract: *nft_contract,
            }
            .abi_encode()
            .into(),
            Self::RewardPoints { reward_token } => RewardConfig {
                rewardToken: *reward_token,
            }
            .abi_encode()
            .into(),
            Self::TransferSplit(splits) if splits.is_empty() => Bytes::new(),
            Self::TransferSplit(splits) => splits
                .iter()
                .map(|split| Split {
                    recipient: split.recipient,
                    bips: split.bips,
                })
                .collect::<Vec<_>>()
                .abi_encode()
                .into(),
        }
    }

    /// Decodes hook data laid out for `hook_type`. Exact inverse of
    /// [`HookData::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`HookDataError::Abi`] when `data` does not match the layout.
    pub fn decode(hook_type: HookType, data: &[u8]) -> Result<Self, HookDataError> {
        let abi = |source| HookDataError::Abi {
            hook: hook_type,
            source,
        };
        match hook_type {
            HookType::NftMint => {
                let config = MintConfig::abi_decode(data).map_err(abi)?;
                Ok(Self::NftMint {
                    nft_contract: config.nftContract,
                })
            }
            HookType::RewardPoints => {
                let config = RewardConfig::abi_decode(data).map_err(abi)?;
                Ok(Self::RewardPoints {
                    reward_token: config.rewardToken,
                })
            }
            HookType::TransferSplit if data.is_empty() => Ok(Self::TransferSplit(Vec::new())),
            HookType::TransferSplit => {
                let splits = Vec::<Split>::abi_decode(data).map_err(abi)?;
                Ok(Self::TransferSplit(
                    splits
                        .into_iter()
                        .map(|split| SplitRecipient::new(split.recipient, split.bips))
                        .collect(),
                ))
            }
        }
    }
}

/// Encodes hook data for `hook_type` in one step.
///
/// # Errors
///
/// See [`HookData::build`].
pub fn encode(
    hook_type: HookType,
    supporting_contracts: &HashMap<String, Address>,
    splits: Option<&[SplitRecipient]>,
) -> Result<Bytes, ValidationError> {
    HookData::build(hook_type, supporting_contracts, splits).map(|data| data.encode())
}
