//! Transfer authorization signing.
//!
//! The payer signs an EIP-3009 `TransferWithAuthorization` whose `to` is the
//! settlement router and whose `nonce` is the router commitment. Two signing
//! capabilities implement [`SigningStrategy`]:
//!
//! - [`HeldKeySigner`] signs with a private key held by this process and
//!   never prompts.
//! - [`DelegatedSigner`] forwards the typed data to an external wallet and
//!   suspends until the wallet holder approves or rejects it.
//!
//! Both produce the same 65-byte signature over the same typed data, so the
//! rest of the pipeline is identical whichever one is used.
//!
//! Before either is asked to sign, [`derive_domain`] verifies that both the
//! RPC node and the signer itself are connected to the chain the service is
//! deployed on. A signature over the wrong chain id would fail on-chain
//! verification, so the mismatch is reported as a distinct, user-correctable
//! error instead.

mod delegated;
mod held_key;

pub use delegated::{DelegatedSigner, SignatureRequest};
pub use held_key::HeldKeySigner;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use alloy_primitives::{Address, B256, Bytes, Signature, U256};
use alloy_sol_types::{Eip712Domain, SolStruct, eip712_domain};
use r402x::error::{ExecutionError, ValidationError};
use r402x::timestamp::UnixTimestamp;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::chain::SettlementChain;
use crate::commitment::CommittedSettlement;
use crate::contract::TransferWithAuthorization;

/// How a signing capability obtains signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SigningMode {
    /// A locally held private key; no user interaction.
    HeldKey,
    /// An external wallet; each signature needs explicit approval.
    DelegatedWallet,
}

/// Errors returned by a signing capability.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SigningError {
    /// The wallet holder declined the request.
    #[error("{0}")]
    Rejected(String),
    /// The signature could not be produced.
    #[error("{0}")]
    Failed(String),
}

impl From<SigningError> for ExecutionError {
    fn from(e: SigningError) -> Self {
        match e {
            SigningError::Rejected(reason) => Self::UserRejected(reason),
            SigningError::Failed(reason) => Self::Signing(reason),
        }
    }
}

/// EIP-712 domain of the stablecoin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationDomain {
    /// Token `name()`.
    pub name: String,
    /// Token `version()`.
    pub version: String,
    /// Chain id the signature is bound to.
    pub chain_id: u64,
    /// Token contract.
    pub verifying_contract: Address,
}

/// The `TransferWithAuthorization` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferAuthorization {
    /// Payer.
    pub from: Address,
    /// Recipient of the pulled funds.
    pub to: Address,
    /// Amount in token base units.
    pub value: U256,
    /// Start of the validity window.
    pub valid_after: UnixTimestamp,
    /// End of the validity window.
    pub valid_before: UnixTimestamp,
    /// Unique authorization nonce.
    pub nonce: B256,
}

/// Complete EIP-712 typed data presented to a signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedAuthorization {
    /// Signing domain.
    pub domain: AuthorizationDomain,
    /// Message to sign.
    pub message: TransferAuthorization,
}

impl TypedAuthorization {
    /// Builds the router-bound authorization for a committed settlement: the
    /// router receives the funds and the commitment is the nonce.
    #[must_use]
    pub fn for_settlement(domain: AuthorizationDomain, settlement: &CommittedSettlement) -> Self {
        let params = settlement.params();
        Self {
            domain,
            message: TransferAuthorization {
                from: params.from(),
                to: settlement.router(),
                value: params.value(),
                valid_after: params.valid_after(),
                valid_before: params.valid_before(),
                nonce: settlement.commitment(),
            },
        }
    }

    /// Returns the alloy EIP-712 domain.
    #[must_use]
    pub fn eip712_domain(&self) -> Eip712Domain {
        eip712_domain! {
            name: self.domain.name.clone(),
            version: self.domain.version.clone(),
            chain_id: self.domain.chain_id,
            verifying_contract: self.domain.verifying_contract,
        }
    }

    /// Returns the EIP-712 signing hash.
    #[must_use]
    pub fn signing_hash(&self) -> B256 {
        let message = TransferWithAuthorization {
            from: self.message.from,
            to: self.message.to,
            value: self.message.value,
            validAfter: U256::from(self.message.valid_after.as_secs()),
            validBefore: U256::from(self.message.valid_before.as_secs()),
            nonce: self.message.nonce,
        };
        message.eip712_signing_hash(&self.eip712_domain())
    }

    /// Renders the typed data in `eth_signTypedData_v4` JSON form, as sent to
    /// browser and hardware wallets.
    #[must_use]
    pub fn typed_data(&self) -> Value {
        json!({
            "types": {
                "EIP712Domain": [
                    { "name": "name", "type": "string" },
                    { "name": "version", "type": "string" },
                    { "name": "chainId", "type": "uint256" },
                    { "name": "verifyingContract", "type": "address" },
                ],
                "TransferWithAuthorization": [
                    { "name": "from", "type": "address" },
                    { "name": "to", "type": "address" },
                    { "name": "value", "type": "uint256" },
                    { "name": "validAfter", "type": "uint256" },
                    { "name": "validBefore", "type": "uint256" },
                    { "name": "nonce", "type": "bytes32" },
                ],
            },
            "primaryType": "TransferWithAuthorization",
            "domain": {
                "name": self.domain.name,
                "version": self.domain.version,
                "chainId": self.domain.chain_id,
                "verifyingContract": self.domain.verifying_contract,
            },
            "message": {
                "from": self.message.from,
                "to": self.message.to,
                "value": self.message.value.to_string(),
                "validAfter": self.message.valid_after.as_secs().to_string(),
                "validBefore": self.message.valid_before.as_secs().to_string(),
                "nonce": self.message.nonce,
            },
        })
    }
}

/// A signed transfer authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorization {
    /// The typed data that was signed.
    pub typed: TypedAuthorization,
    /// 65-byte `r || s || v` signature.
    pub signature: Bytes,
}

/// Boxed future returned by [`SigningStrategy::sign_authorization`].
pub type SignFuture<'a> = Pin<Box<dyn Future<Output = Result<Bytes, SigningError>> + Send + 'a>>;

/// Boxed future returned by [`SigningStrategy::chain_id`].
pub type SignerChainFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Option<u64>, SigningError>> + Send + 'a>>;

/// A capability that can sign transfer authorizations for one address.
///
/// Dyn-compatible so that the pipeline can take `&dyn SigningStrategy`.
pub trait SigningStrategy: Send + Sync {
    /// Address whose funds the signature authorizes.
    fn address(&self) -> Address;

    /// How signatures are obtained.
    fn mode(&self) -> SigningMode;

    /// Chain the signer is connected to.
    ///
    /// `None` means the signer has no network of its own and signs for
    /// whatever chain the pipeline's RPC node is on.
    fn chain_id(&self) -> SignerChainFuture<'_>;

    /// Signs `authorization`, returning the 65-byte signature.
    fn sign_authorization<'a>(&'a self, authorization: &'a TypedAuthorization) -> SignFuture<'a>;
}

impl<T: SigningStrategy + ?Sized> SigningStrategy for Arc<T> {
    fn address(&self) -> Address {
        (**self).address()
    }

    fn mode(&self) -> SigningMode {
        (**self).mode()
    }

    fn chain_id(&self) -> SignerChainFuture<'_> {
        (**self).chain_id()
    }

    fn sign_authorization<'a>(&'a self, authorization: &'a TypedAuthorization) -> SignFuture<'a> {
        (**self).sign_authorization(authorization)
    }
}

/// Reads the token's EIP-712 domain and verifies the connected chains.
///
/// Both the RPC node and the signer must be on `expected_chain_id`. The
/// signer is only asked for its chain, never for a signature.
///
/// # Errors
///
/// Returns [`ExecutionError::ChainMismatch`] when either connected chain id
/// differs from `expected_chain_id`, a network error when the chain cannot
/// be queried, and a signing error when the signer cannot report its chain.
#[cfg_attr(
    feature = "telemetry",
    instrument(name = "signer.derive_domain", skip(chain, signer), err)
)]
pub async fn derive_domain(
    chain: &dyn SettlementChain,
    signer: &dyn SigningStrategy,
    token: Address,
    expected_chain_id: u64,
) -> Result<AuthorizationDomain, ExecutionError> {
    let actual = chain.chain_id().await?;
    if actual != expected_chain_id {
        return Err(ExecutionError::ChainMismatch {
            expected: expected_chain_id,
            actual,
        });
    }
    if let Some(wallet) = signer.chain_id().await?
        && wallet != expected_chain_id
    {
        return Err(ExecutionError::ChainMismatch {
            expected: expected_chain_id,
            actual: wallet,
        });
    }
    let token_domain = chain.token_domain(token).await?;
    Ok(AuthorizationDomain {
        name: token_domain.name,
        version: token_domain.version,
        chain_id: actual,
        verifying_contract: token,
    })
}

/// Signs the router-bound authorization for `settlement` with `signer`.
///
/// # Errors
///
/// Returns [`ValidationError::SignerMismatch`] when the signer is not the
/// payer recorded in the settlement, [`ExecutionError::UserRejected`] when a
/// wallet declines, and [`ExecutionError::Signing`] for other failures,
/// including a signature that does not recover to the payer.
#[cfg_attr(feature = "telemetry", instrument(name = "signer.sign", skip_all, err, fields(mode = ?signer.mode())))]
pub async fn sign(
    signer: &dyn SigningStrategy,
    domain: AuthorizationDomain,
    settlement: &CommittedSettlement,
) -> Result<Authorization, ExecutionError> {
    let payer = settlement.params().from();
    if signer.address() != payer {
        return Err(ValidationError::SignerMismatch {
            signer: signer.address(),
            payer,
        }
        .into());
    }
    let typed = TypedAuthorization::for_settlement(domain, settlement);
    let signature = signer.sign_authorization(&typed).await?;
    let recovered = Signature::from_raw(&signature)
        .and_then(|parsed| parsed.recover_address_from_prehash(&typed.signing_hash()))
        .map_err(|e| ExecutionError::Signing(format!("unusable signature: {e}")))?;
    if recovered != payer {
        return Err(ExecutionError::Signing(format!(
            "signature recovers to {recovered}, expected payer {payer}"
        )));
    }
    #[cfg(feature = "telemetry")]
    tracing::debug!(mode = ?signer.mode(), %payer, nonce = %typed.message.nonce, "transfer authorization signed");
    Ok(Authorization { typed, signature })
}

/// Verifies the chain and signs in one step.
///
/// # Errors
///
/// See [`derive_domain`] and [`sign`].
pub async fn authorize(
    chain: &dyn SettlementChain,
    signer: &dyn SigningStrategy,
    expected_chain_id: u64,
    settlement: &CommittedSettlement,
) -> Result<Authorization, ExecutionError> {
    let domain =
        derive_domain(chain, signer, settlement.params().token(), expected_chain_id).await?;
    sign(signer, domain, settlement).await
}
