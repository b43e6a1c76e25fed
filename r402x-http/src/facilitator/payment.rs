//! Facilitator payment pipeline.
//!
//! A reduced sibling of the settlement pipeline for payments that carry no
//! hook: `generating → verifying → settling`. The payer signs a plain
//! ERC-3009 authorization to the payee under the token's own domain, and
//! the facilitator owns replay protection and submission. Settlement is
//! never requested for a header the facilitator did not verify.

use std::str::FromStr;
use std::sync::Arc;

use alloy_primitives::{Address, B256, TxHash, U256};
use futures_util::Stream;
use r402x::amount::{display_amount, parse_units};
use r402x::error::{ExecutionError, ValidationError};
use r402x::event::{EventSink, ProgressEvent, Step, channel};
use r402x::session::ExecutionSession;
use r402x::timestamp::UnixTimestamp;
use r402x_evm::explorer_tx_url;
use r402x_evm::params::DEFAULT_VALID_AFTER_SKEW_SECS;
use r402x_evm::signer::{AuthorizationDomain, SigningStrategy, TransferAuthorization, TypedAuthorization};
use rand::RngExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
#[cfg(feature = "telemetry")]
use tracing::instrument;

use super::FacilitatorClient;
use crate::constants::{EXACT_SCHEME, X402_VERSION};
use crate::headers::encode_payment_header;
use crate::proto::{
    AssetExtra, ExactAuthorization, ExactPayload, FacilitatorRequest, PaymentPayload,
    PaymentRequirements,
};

const fn default_decimals() -> u8 {
    6
}

fn default_symbol() -> String {
    "USDC".to_owned()
}

const fn default_max_timeout_seconds() -> u64 {
    300
}

fn default_mime_type() -> String {
    "application/json".to_owned()
}

/// Token and network the facilitator settles in.
///
/// `name` and `version` are the token's EIP-712 domain; the payer signs
/// against it directly since no router sits in between.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilitatorSettings {
    /// Network name understood by the facilitator (e.g. `"base-sepolia"`).
    pub network: String,
    /// EIP-155 chain id of `network`.
    pub chain_id: u64,
    /// Token contract.
    pub asset: Address,
    /// Token EIP-712 domain name.
    pub name: String,
    /// Token EIP-712 domain version.
    pub version: String,
    /// Token decimals.
    #[serde(default = "default_decimals")]
    pub decimals: u8,
    /// Token symbol for display.
    #[serde(default = "default_symbol")]
    pub symbol: String,
    /// Validity of the signed authorization.
    #[serde(default = "default_max_timeout_seconds")]
    pub max_timeout_seconds: u64,
    /// MIME type advertised for the paid resource.
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
}

/// A payment to route through the facilitator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOrder {
    /// Recipient.
    pub pay_to: Address,
    /// Human-readable amount (e.g. `"0.1"`).
    pub amount: String,
    /// What the payment is for.
    #[serde(default)]
    pub description: String,
    /// Resource identifier, if any.
    #[serde(default)]
    pub resource: String,
}

/// A signed payment header and the requirements it was built for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPayment {
    /// Requirements the header answers.
    pub requirements: PaymentRequirements,
    /// The decoded payload.
    pub payload: PaymentPayload,
    /// Base64 `X-PAYMENT` header value.
    pub header: String,
}

/// Result of a facilitator-settled payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilitatorSettlement {
    /// Settlement transaction hash reported by the facilitator.
    pub tx_hash: String,
    /// Network the payment settled on.
    pub network: String,
    /// Payer.
    pub payer: Address,
    /// Display amount (e.g. `"0.1 USDC"`).
    pub amount: String,
    /// Recipient.
    pub pay_to: Address,
    /// Block explorer link, for known networks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
}

/// Drives facilitator payments.
#[derive(Debug, Clone)]
pub struct FacilitatorPayment {
    client: FacilitatorClient,
    settings: FacilitatorSettings,
}

impl FacilitatorPayment {
    /// Creates a pipeline that pays through `client` in `settings`' token.
    #[must_use]
    pub const fn new(client: FacilitatorClient, settings: FacilitatorSettings) -> Self {
        Self { client, settings }
    }

    /// Returns the settlement token and network.
    #[must_use]
    pub const fn settings(&self) -> &FacilitatorSettings {
        &self.settings
    }

    /// Builds the payment requirements for `order`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the recipient is unset or the amount is
    /// not a positive decimal in the token's precision.
    pub fn generate_requirements(
        &self,
        order: &PaymentOrder,
    ) -> Result<PaymentRequirements, ValidationError> {
        if order.pay_to == Address::ZERO {
            return Err(ValidationError::ZeroAddress("payTo"));
        }
        let value = parse_units(&order.amount, self.settings.decimals)?;
        if value == U256::ZERO {
            return Err(ValidationError::InvalidAmount {
                amount: order.amount.clone(),
                reason: "must be positive",
            });
        }
        Ok(PaymentRequirements {
            scheme: EXACT_SCHEME.to_owned(),
            network: self.settings.network.clone(),
            max_amount_required: value.to_string(),
            resource: order.resource.clone(),
            description: order.description.clone(),
            mime_type: self.settings.mime_type.clone(),
            pay_to: order.pay_to,
            max_timeout_seconds: self.settings.max_timeout_seconds,
            asset: self.settings.asset,
            extra: Some(AssetExtra {
                name: self.settings.name.clone(),
                version: self.settings.version.clone(),
            }),
        })
    }

    /// Signs an authorization answering `requirements` and encodes it as an
    /// `X-PAYMENT` header.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::ChainMismatch`] when the signer is connected
    /// to another chain than the facilitator's network, and
    /// [`ExecutionError::UserRejected`] or [`ExecutionError::Signing`] when the
    /// signer declines or fails.
    #[cfg_attr(feature = "telemetry", instrument(name = "facilitator.generate_header", skip_all, err, fields(mode = ?signer.mode())))]
    pub async fn generate_header(
        &self,
        signer: &dyn SigningStrategy,
        requirements: &PaymentRequirements,
    ) -> Result<SignedPayment, ExecutionError> {
        let value = U256::from_str(&requirements.max_amount_required).map_err(|_| {
            ValidationError::InvalidAmount {
                amount: requirements.max_amount_required.clone(),
                reason: "not an integer amount",
            }
        })?;
        let expected = self.settings.chain_id;
        if let Some(actual) = signer.chain_id().await?
            && actual != expected
        {
            return Err(ExecutionError::ChainMismatch { expected, actual });
        }
        let now = UnixTimestamp::now();
        let typed = TypedAuthorization {
            domain: AuthorizationDomain {
                name: self.settings.name.clone(),
                version: self.settings.version.clone(),
                chain_id: self.settings.chain_id,
                verifying_contract: requirements.asset,
            },
            message: TransferAuthorization {
                from: signer.address(),
                to: requirements.pay_to,
                value,
                valid_after: now.saturating_sub(DEFAULT_VALID_AFTER_SKEW_SECS),
                valid_before: now + requirements.max_timeout_seconds,
                nonce: B256::from(rand::rng().random::<[u8; 32]>()),
            },
        };
        let signature = signer.sign_authorization(&typed).await?;

        let message = typed.message;
        let payload = PaymentPayload {
            x402_version: X402_VERSION,
            scheme: EXACT_SCHEME.to_owned(),
            network: requirements.network.clone(),
            payload: ExactPayload {
                signature,
                authorization: ExactAuthorization {
                    from: message.from,
                    to: message.to,
                    value: message.value.to_string(),
                    valid_after: message.valid_after,
                    valid_before: message.valid_before,
                    nonce: message.nonce,
                },
            },
        };
        let header = encode_payment_header(&payload)
            .map_err(|e| ExecutionError::Signing(e.to_string()))?;
        Ok(SignedPayment {
            requirements: requirements.clone(),
            payload,
            header,
        })
    }

    /// Runs one facilitator payment, reporting progress to `sink`.
    ///
    /// # Errors
    ///
    /// Returns the [`ExecutionError`] that also terminated the session.
    pub async fn pay(
        &self,
        order: &PaymentOrder,
        signer: &dyn SigningStrategy,
        sink: &dyn EventSink,
    ) -> Result<FacilitatorSettlement, ExecutionError> {
        let mut session = ExecutionSession::new(sink);
        let result = self.run(&mut session, order, signer).await;
        match &result {
            Ok(settlement) => session.succeed(
                format!("Paid {} to {} via facilitator", settlement.amount, settlement.pay_to),
                json!({ "transaction": settlement }),
            ),
            Err(e) => session.fail(e),
        }
        result
    }

    /// Runs one payment on a background task and returns its events as a
    /// stream ending with the terminal event.
    pub fn spawn(
        self: &Arc<Self>,
        order: PaymentOrder,
        signer: Arc<dyn SigningStrategy>,
    ) -> impl Stream<Item = ProgressEvent> + Send + 'static {
        let (sink, rx) = channel();
        let pipeline = Arc::clone(self);
        tokio::spawn(async move {
            let _ = pipeline.pay(&order, signer.as_ref(), &sink).await;
        });
        futures_util::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        })
    }

    async fn run(
        &self,
        session: &mut ExecutionSession<'_>,
        order: &PaymentOrder,
        signer: &dyn SigningStrategy,
    ) -> Result<FacilitatorSettlement, ExecutionError> {
        session.advance(Step::Generating, "Generating payment requirements and header");
        let requirements = self.generate_requirements(order)?;
        let amount = display_amount(&order.amount, &self.settings.symbol)?;
        let signed = self.generate_header(signer, &requirements).await?;
        let request = FacilitatorRequest {
            x402_version: X402_VERSION,
            payment_header: signed.header,
            payment_requirements: signed.requirements,
        };

        session.advance(Step::Verifying, "Verifying payment with facilitator");
        let verified = self.client.verify(&request).await?;
        if !verified.is_valid {
            let reason = verified
                .invalid_reason
                .unwrap_or_else(|| "payment header rejected".to_owned());
            return Err(ExecutionError::FacilitatorRejected(reason));
        }

        session.advance(Step::Settling, "Settling payment via facilitator");
        let settled = self.client.settle(&request).await?;
        if !settled.success {
            let reason = settled
                .error_reason
                .unwrap_or_else(|| "settlement failed".to_owned());
            return Err(ExecutionError::FacilitatorRejected(reason));
        }

        #[cfg(feature = "telemetry")]
        tracing::info!(tx = %settled.transaction, network = %settled.network, "facilitator settled payment");

        let explorer_url = TxHash::from_str(&settled.transaction)
            .ok()
            .and_then(|hash| explorer_tx_url(self.settings.chain_id, hash));
        let network = if settled.network.is_empty() {
            self.settings.network.clone()
        } else {
            settled.network
        };
        Ok(FacilitatorSettlement {
            tx_hash: settled.transaction,
            network,
            payer: settled
                .payer
                .or(verified.payer)
                .unwrap_or_else(|| signer.address()),
            amount,
            pay_to: order.pay_to,
            explorer_url,
        })
    }
}
