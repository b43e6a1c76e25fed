//! Remote facilitator access.
//!
//! [`FacilitatorClient`] speaks a facilitator's `/verify` and `/settle`
//! endpoints. [`FacilitatorPayment`] drives the hook-less payment pipeline
//! on top of it: build requirements, sign a header, verify, then settle.

mod payment;

pub use payment::{FacilitatorPayment, FacilitatorSettings, FacilitatorSettlement, PaymentOrder, SignedPayment};

use std::time::Duration;

use http::HeaderMap;
use url::Url;

use crate::client::{self, JsonClient};
use crate::error::HttpClientError;
use crate::proto::{SettleRequest, SettleResponse, VerifyRequest, VerifyResponse};

/// A client for communicating with a remote x402 facilitator.
#[derive(Clone, Debug)]
pub struct FacilitatorClient {
    base_url: Url,
    verify_url: Url,
    settle_url: Url,
    http: JsonClient,
}

impl FacilitatorClient {
    /// Constructs a new [`FacilitatorClient`] from a base URL.
    ///
    /// This sets up `./verify` and `./settle` endpoint URLs relative to the base.
    ///
    /// # Errors
    ///
    /// Returns [`HttpClientError`] if URL construction fails.
    pub fn try_new(base_url: Url) -> Result<Self, HttpClientError> {
        let verify_url = client::join(&base_url, "./verify", "Failed to construct ./verify URL")?;
        let settle_url = client::join(&base_url, "./settle", "Failed to construct ./settle URL")?;
        Ok(Self {
            base_url,
            verify_url,
            settle_url,
            http: JsonClient::default(),
        })
    }

    /// Returns the base URL used by this client.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the computed `./verify` URL.
    #[must_use]
    pub const fn verify_url(&self) -> &Url {
        &self.verify_url
    }

    /// Returns the computed `./settle` URL.
    #[must_use]
    pub const fn settle_url(&self) -> &Url {
        &self.settle_url
    }

    /// Attaches custom headers to all future requests.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.http.set_headers(headers);
        self
    }

    /// Sets a timeout for all future requests.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http.set_timeout(timeout);
        self
    }

    /// Sends a `POST /verify` request to the facilitator.
    ///
    /// # Errors
    ///
    /// Returns [`HttpClientError`] if the HTTP request fails.
    pub async fn verify(&self, request: &VerifyRequest) -> Result<VerifyResponse, HttpClientError> {
        let fut = self.http.post_json(&self.verify_url, "POST /verify", request);
        #[cfg(feature = "telemetry")]
        let fut = client::with_span(
            fut,
            tracing::info_span!("facilitator.verify", timeout = ?self.http.timeout()),
        );
        fut.await
    }

    /// Sends a `POST /settle` request to the facilitator.
    ///
    /// # Errors
    ///
    /// Returns [`HttpClientError`] if the HTTP request fails.
    pub async fn settle(&self, request: &SettleRequest) -> Result<SettleResponse, HttpClientError> {
        let fut = self.http.post_json(&self.settle_url, "POST /settle", request);
        #[cfg(feature = "telemetry")]
        let fut = client::with_span(
            fut,
            tracing::info_span!("facilitator.settle", timeout = ?self.http.timeout()),
        );
        fut.await
    }
}

impl TryFrom<&str> for FacilitatorClient {
    type Error = HttpClientError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_new(client::parse_base_url(value)?)
    }
}

impl TryFrom<String> for FacilitatorClient {
    type Error = HttpClientError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}
