//! Facilitator wire types for the `exact` scheme.
//!
//! These are the request and response bodies of a facilitator's `/verify`
//! and `/settle` endpoints, plus the payment payload carried base64-encoded
//! in the `X-PAYMENT` header.

use alloy_primitives::{Address, B256, Bytes};
use r402x::timestamp::UnixTimestamp;
use serde::{Deserialize, Serialize};

/// What the payee requires to accept a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    /// Payment scheme, always `"exact"` here.
    pub scheme: String,
    /// Network name the payment settles on.
    pub network: String,
    /// Amount in token base units, as a decimal string.
    pub max_amount_required: String,
    /// Resource being paid for.
    pub resource: String,
    /// Human-readable description.
    pub description: String,
    /// MIME type of the resource.
    pub mime_type: String,
    /// Recipient of the payment.
    pub pay_to: Address,
    /// How long the authorization stays valid.
    pub max_timeout_seconds: u64,
    /// Token contract.
    pub asset: Address,
    /// EIP-712 domain of the token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<AssetExtra>,
}

/// EIP-712 domain name and version of the payment token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetExtra {
    /// Domain name.
    pub name: String,
    /// Domain version.
    pub version: String,
}

/// ERC-3009 authorization fields as carried in the payment payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactAuthorization {
    /// Payer.
    pub from: Address,
    /// Payee.
    pub to: Address,
    /// Amount in base units, as a decimal string.
    pub value: String,
    /// Not valid at or before this instant.
    pub valid_after: UnixTimestamp,
    /// Not valid at or after this instant.
    pub valid_before: UnixTimestamp,
    /// Random 32-byte nonce.
    pub nonce: B256,
}

/// Signature plus authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExactPayload {
    /// 65-byte EIP-712 signature.
    pub signature: Bytes,
    /// The signed authorization.
    pub authorization: ExactAuthorization,
}

/// The document encoded into the `X-PAYMENT` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    /// Protocol version.
    pub x402_version: u8,
    /// Payment scheme.
    pub scheme: String,
    /// Network name.
    pub network: String,
    /// Scheme-specific payload.
    pub payload: ExactPayload,
}

/// Body of `POST /verify` and `POST /settle`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilitatorRequest {
    /// Protocol version.
    pub x402_version: u8,
    /// Base64 `X-PAYMENT` header value.
    pub payment_header: String,
    /// Requirements the header must satisfy.
    pub payment_requirements: PaymentRequirements,
}

/// Body of `POST /verify`.
pub type VerifyRequest = FacilitatorRequest;

/// Body of `POST /settle`.
pub type SettleRequest = FacilitatorRequest;

/// Response of `POST /verify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    /// Whether the payment header satisfies the requirements.
    pub is_valid: bool,
    /// Why verification failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_reason: Option<String>,
    /// Payer recovered by the facilitator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<Address>,
}

/// Response of `POST /settle`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleResponse {
    /// Whether the payment was settled on chain.
    pub success: bool,
    /// Why settlement failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
    /// Settlement transaction hash; empty on failure.
    #[serde(default)]
    pub transaction: String,
    /// Network the payment settled on.
    #[serde(default)]
    pub network: String,
    /// Payer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<Address>,
}
