use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use alloy_primitives::{Address, Bytes};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use super::{
    SignFuture, SignerChainFuture, SigningError, SigningMode, SigningStrategy, TypedAuthorization,
};

enum WalletDecision {
    Approved(Bytes),
    Rejected(String),
}

/// A pending request for the wallet holder's signature.
///
/// Exactly one of [`approve`](Self::approve) or [`reject`](Self::reject)
/// answers it. Dropping the request unanswered fails the signing step.
pub struct SignatureRequest {
    authorization: TypedAuthorization,
    reply: oneshot::Sender<WalletDecision>,
}

impl fmt::Debug for SignatureRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureRequest")
            .field("authorization", &self.authorization)
            .finish_non_exhaustive()
    }
}

impl SignatureRequest {
    /// The typed data awaiting signature.
    #[must_use]
    pub const fn authorization(&self) -> &TypedAuthorization {
        &self.authorization
    }

    /// The typed data in `eth_signTypedData_v4` form.
    #[must_use]
    pub fn typed_data(&self) -> Value {
        self.authorization.typed_data()
    }

    /// Answers the request with the wallet's signature.
    pub fn approve(self, signature: Bytes) {
        let _ = self.reply.send(WalletDecision::Approved(signature));
    }

    /// Declines the request.
    pub fn reject(self, reason: impl Into<String>) {
        let _ = self.reply.send(WalletDecision::Rejected(reason.into()));
    }
}

/// Forwards signing to an external wallet and waits for its answer.
///
/// There is no timeout: the pipeline stays suspended in the sign step for as
/// long as the wallet holder takes to respond.
///
/// The wallet's network is tracked separately from the pipeline's RPC node.
/// The bridge reports network switches through
/// [`switch_chain`](Self::switch_chain); clones share the same value.
#[derive(Debug, Clone)]
pub struct DelegatedSigner {
    address: Address,
    chain_id: Arc<AtomicU64>,
    requests: mpsc::Sender<SignatureRequest>,
}

impl DelegatedSigner {
    /// Creates a signer for `address`, connected to `chain_id`, that sends
    /// requests to `requests`.
    #[must_use]
    pub fn new(address: Address, chain_id: u64, requests: mpsc::Sender<SignatureRequest>) -> Self {
        Self {
            address,
            chain_id: Arc::new(AtomicU64::new(chain_id)),
            requests,
        }
    }

    /// Creates a signer together with the receiving end the wallet bridge
    /// reads requests from.
    #[must_use]
    pub fn channel(
        address: Address,
        chain_id: u64,
        buffer: usize,
    ) -> (Self, mpsc::Receiver<SignatureRequest>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self::new(address, chain_id, tx), rx)
    }

    /// Records that the wallet is now connected to `chain_id`.
    pub fn switch_chain(&self, chain_id: u64) {
        self.chain_id.store(chain_id, Ordering::Release);
    }
}

impl SigningStrategy for DelegatedSigner {
    fn address(&self) -> Address {
        self.address
    }

    fn mode(&self) -> SigningMode {
        SigningMode::DelegatedWallet
    }

    fn chain_id(&self) -> SignerChainFuture<'_> {
        let chain_id = self.chain_id.load(Ordering::Acquire);
        Box::pin(async move { Ok(Some(chain_id)) })
    }

    fn sign_authorization<'a>(&'a self, authorization: &'a TypedAuthorization) -> SignFuture<'a> {
        Box::pin(async move {
            let (reply, decision) = oneshot::channel();
            let request = SignatureRequest {
                authorization: authorization.clone(),
                reply,
            };
            self.requests
                .send(request)
                .await
                .map_err(|_| SigningError::Failed("wallet is not connected".to_owned()))?;
            match decision.await {
                Ok(WalletDecision::Approved(signature)) => Ok(signature),
                Ok(WalletDecision::Rejected(reason)) => Err(SigningError::Rejected(reason)),
                Err(_) => Err(SigningError::Failed(
                    "wallet dropped the signature request".to_owned(),
                )),
            }
        })
    }
}
