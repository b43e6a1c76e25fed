use std::fmt;
use std::str::FromStr;

use alloy_primitives::Address;
use alloy_signer::Signer;
use alloy_signer_local::{LocalSignerError, PrivateKeySigner};

use super::{
    SignFuture, SignerChainFuture, SigningError, SigningMode, SigningStrategy, TypedAuthorization,
};

/// Signs with a private key held by this process.
///
/// Signing never prompts. Used by server-side automation and by the
/// facilitator delegation path.
#[derive(Clone)]
pub struct HeldKeySigner {
    signer: PrivateKeySigner,
}

impl HeldKeySigner {
    /// Wraps a local signer.
    #[must_use]
    pub const fn new(signer: PrivateKeySigner) -> Self {
        Self { signer }
    }

    /// Returns the underlying alloy signer.
    #[must_use]
    pub const fn inner(&self) -> &PrivateKeySigner {
        &self.signer
    }
}

impl fmt::Debug for HeldKeySigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeldKeySigner")
            .field("address", &self.signer.address())
            .finish_non_exhaustive()
    }
}

impl FromStr for HeldKeySigner {
    type Err = LocalSignerError;

    /// Parses a hex private key, with or without `0x` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PrivateKeySigner::from_str(s.trim()).map(Self::new)
    }
}

impl SigningStrategy for HeldKeySigner {
    fn address(&self) -> Address {
        self.signer.address()
    }

    fn mode(&self) -> SigningMode {
        SigningMode::HeldKey
    }

    fn chain_id(&self) -> SignerChainFuture<'_> {
        // A raw key signs for any chain; the RPC node decides which.
        Box::pin(async { Ok(None) })
    }

    fn sign_authorization<'a>(&'a self, authorization: &'a TypedAuthorization) -> SignFuture<'a> {
        Box::pin(async move {
            let hash = authorization.signing_hash();
            let signature = self
                .signer
                .sign_hash(&hash)
                .await
                .map_err(|e| SigningError::Failed(format!("{e:?}")))?;
            Ok(signature.as_bytes().into())
        })
    }
}
