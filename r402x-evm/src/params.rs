//! Settlement parameters.
//!
//! A [`SettlementParameters`] value is the complete input of one settlement:
//! it is what the router hashes into the commitment and what
//! `settleAndExecute` is called with. Its fields are private; once
//! assembled the value is only ever read.

use alloy_primitives::{Address, B256, Bytes, U256};
use r402x::timestamp::UnixTimestamp;
use rand::RngExt;
use serde::{Deserialize, Serialize};

use crate::hook::HookData;

/// Seconds subtracted from "now" for `validAfter`, tolerating clock skew
/// between this host and the chain.
pub const DEFAULT_VALID_AFTER_SKEW_SECS: u64 = 600;

/// Seconds added to "now" for `validBefore`.
pub const DEFAULT_VALIDITY_SECS: u64 = 3600;

/// Time window during which an authorization may be settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidityWindow {
    /// Earliest settlement time (exclusive on-chain).
    pub valid_after: UnixTimestamp,
    /// Latest settlement time (exclusive on-chain).
    pub valid_before: UnixTimestamp,
}

impl ValidityWindow {
    /// Builds a window around the current time.
    #[must_use]
    pub fn starting_now(skew_secs: u64, validity_secs: u64) -> Self {
        let now = UnixTimestamp::now();
        Self {
            valid_after: now.saturating_sub(skew_secs),
            valid_before: now + validity_secs,
        }
    }
}

impl Default for ValidityWindow {
    fn default() -> Self {
        Self::starting_now(DEFAULT_VALID_AFTER_SKEW_SECS, DEFAULT_VALIDITY_SECS)
    }
}

/// Generates a fresh 32-byte salt.
///
/// The salt makes otherwise-identical settlements distinct, so each one gets
/// its own commitment and nonce.
#[must_use]
pub fn generate_salt() -> B256 {
    B256::from(rand::rng().random::<[u8; 32]>())
}

/// Complete input of one settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementParameters {
    token: Address,
    from: Address,
    value: U256,
    #[serde(flatten)]
    window: ValidityWindow,
    salt: B256,
    pay_to: Address,
    facilitator_fee: U256,
    hook: Address,
    hook_data: Bytes,
}

/// Builder for [`SettlementParameters`].
#[derive(Debug, Clone)]
pub struct SettlementParametersBuilder {
    token: Address,
    from: Address,
    value: U256,
    pay_to: Address,
    hook: Address,
    hook_data: Bytes,
    facilitator_fee: U256,
    window: Option<ValidityWindow>,
    salt: Option<B256>,
}

impl SettlementParameters {
    /// Starts building parameters for a transfer of `value` units of `token`
    /// from `from`.
    #[must_use]
    pub const fn builder(token: Address, from: Address, value: U256) -> SettlementParametersBuilder {
        SettlementParametersBuilder {
            token,
            from,
            value,
            pay_to: Address::ZERO,
            hook: Address::ZERO,
            hook_data: Bytes::new(),
            facilitator_fee: U256::ZERO,
            window: None,
            salt: None,
        }
    }

    /// Stablecoin contract.
    #[must_use]
    pub const fn token(&self) -> Address {
        self.token
    }

    /// Payer.
    #[must_use]
    pub const fn from(&self) -> Address {
        self.from
    }

    /// Amount pulled from the payer, in token base units.
    #[must_use]
    pub const fn value(&self) -> U256 {
        self.value
    }

    /// Authorization validity window.
    #[must_use]
    pub const fn window(&self) -> ValidityWindow {
        self.window
    }

    /// `validAfter` timestamp.
    #[must_use]
    pub const fn valid_after(&self) -> UnixTimestamp {
        self.window.valid_after
    }

    /// `validBefore` timestamp.
    #[must_use]
    pub const fn valid_before(&self) -> UnixTimestamp {
        self.window.valid_before
    }

    /// Per-settlement salt.
    #[must_use]
    pub const fn salt(&self) -> B256 {
        self.salt
    }

    /// Final payment recipient.
    #[must_use]
    pub const fn pay_to(&self) -> Address {
        self.pay_to
    }

    /// Fee reserved for the submitting facilitator.
    #[must_use]
    pub const fn facilitator_fee(&self) -> U256 {
        self.facilitator_fee
    }

    /// Hook contract run after the transfer.
    #[must_use]
    pub const fn hook(&self) -> Address {
        self.hook
    }

    /// Encoded hook data.
    #[must_use]
    pub const fn hook_data(&self) -> &Bytes {
        &self.hook_data
    }
}

impl SettlementParametersBuilder {
    /// Sets the final payment recipient.
    #[must_use]
    pub const fn pay_to(mut self, pay_to: Address) -> Self {
        self.pay_to = pay_to;
        self
    }

    /// Sets the hook contract and its encoded data.
    #[must_use]
    pub fn hook(mut self, hook: Address, data: &HookData) -> Self {
        self.hook = hook;
        self.hook_data = data.encode();
        self
    }

    /// Sets the facilitator fee.
    #[must_use]
    pub const fn facilitator_fee(mut self, fee: U256) -> Self {
        self.facilitator_fee = fee;
        self
    }

    /// Sets an explicit validity window instead of the default one.
    #[must_use]
    pub const fn window(mut self, window: ValidityWindow) -> Self {
        self.window = Some(window);
        self
    }

    /// Sets an explicit salt instead of a random one.
    #[must_use]
    pub const fn salt(mut self, salt: B256) -> Self {
        self.salt = Some(salt);
        self
    }

    /// Finalizes the parameters, filling in a default window and a random
    /// salt where none were given.
    #[must_use]
    pub fn build(self) -> SettlementParameters {
        SettlementParameters {
            token: self.token,
            from: self.from,
            value: self.value,
            window: self.window.unwrap_or_default(),
            salt: self.salt.unwrap_or_else(generate_salt),
            pay_to: self.pay_to,
            facilitator_fee: self.facilitator_fee,
            hook: self.hook,
            hook_data: self.hook_data,
        }
    }
}
