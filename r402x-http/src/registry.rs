//! A [`ServiceRegistry`] backed by a remote `GET /services` endpoint.
//!
//! The service list is cached with a TTL and shared by every session that
//! holds the registry. Descriptors that fail to parse are skipped rather than
//! failing the whole listing, so one bad entry cannot take the registry down.

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use http::HeaderMap;
use r402x::descriptor::ServiceDescriptor;
use r402x::registry::{RegistryError, ServiceRegistry};
use serde::Deserialize;
use serde_with::{VecSkipError, serde_as};
use tokio::sync::RwLock;
use url::Url;

#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::client::{self, JsonClient};
use crate::error::HttpClientError;

/// Accepted response shapes of `GET /services`.
#[serde_as]
#[derive(Deserialize)]
#[serde(untagged)]
enum ServiceListing {
    Wrapped {
        #[serde_as(as = "VecSkipError<_>")]
        services: Vec<ServiceDescriptor>,
    },
    Bare(#[serde_as(as = "VecSkipError<_>")] Vec<ServiceDescriptor>),
}

impl ServiceListing {
    fn into_services(self) -> Vec<ServiceDescriptor> {
        match self {
            Self::Wrapped { services } | Self::Bare(services) => services,
        }
    }
}

#[derive(Clone, Debug)]
struct CacheState {
    services: Vec<ServiceDescriptor>,
    expires_at: Instant,
}

/// TTL cache for the service list.
///
/// Each clone has an independent cache state.
#[derive(Debug)]
pub struct ServiceCache {
    ttl: Duration,
    state: RwLock<Option<CacheState>>,
}

impl ServiceCache {
    /// Creates a new cache with the given TTL.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: RwLock::new(None),
        }
    }

    /// Returns the cached list if still fresh.
    pub async fn get(&self) -> Option<Vec<ServiceDescriptor>> {
        let guard = self.state.read().await;
        let cache = guard.as_ref()?;
        (Instant::now() < cache.expires_at).then(|| cache.services.clone())
    }

    /// Stores a list with the configured TTL.
    pub async fn set(&self, services: Vec<ServiceDescriptor>) {
        let mut guard = self.state.write().await;
        *guard = Some(CacheState {
            services,
            expires_at: Instant::now() + self.ttl,
        });
    }

    /// Clears the cache.
    pub async fn clear(&self) {
        let mut guard = self.state.write().await;
        *guard = None;
    }
}

impl Clone for ServiceCache {
    fn clone(&self) -> Self {
        Self::new(self.ttl)
    }
}

/// HTTP client for a remote service registry.
#[derive(Clone, Debug)]
pub struct HttpServiceRegistry {
    base_url: Url,
    services_url: Url,
    http: JsonClient,
    cache: ServiceCache,
}

impl HttpServiceRegistry {
    /// Default TTL for the cached service list.
    pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

    /// Constructs a registry client rooted at `base_url`; the list is read
    /// from `./services` relative to it.
    ///
    /// # Errors
    ///
    /// Returns [`HttpClientError`] if URL construction fails.
    pub fn try_new(base_url: Url) -> Result<Self, HttpClientError> {
        let services_url = client::join(&base_url, "./services", "Failed to construct ./services URL")?;
        Ok(Self {
            base_url,
            services_url,
            http: JsonClient::default(),
            cache: ServiceCache::new(Self::DEFAULT_CACHE_TTL),
        })
    }

    /// Returns the base URL used by this client.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the computed `./services` URL.
    #[must_use]
    pub const fn services_url(&self) -> &Url {
        &self.services_url
    }

    /// Returns the configured timeout, if any.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.http.timeout()
    }

    /// Returns any custom headers configured on the client.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        self.http.headers()
    }

    /// Returns a reference to the service cache.
    #[must_use]
    pub const fn cache(&self) -> &ServiceCache {
        &self.cache
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

    /// Sets the TTL of the cached service list.
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache = ServiceCache::new(ttl);
        self
    }

    /// Disables caching; every call hits the network.
    #[must_use]
    pub fn without_cache(self) -> Self {
        self.with_cache_ttl(Duration::ZERO)
    }

    /// Fetches the service list, always making an HTTP request.
    ///
    /// # Errors
    ///
    /// Returns [`HttpClientError`] if the request fails or the body is not a
    /// service listing.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "registry.fetch", skip_all, err, fields(url = %self.services_url))
    )]
    pub async fn fetch(&self) -> Result<Vec<ServiceDescriptor>, HttpClientError> {
        let listing: ServiceListing = self
            .http
            .get_json(&self.services_url, "GET /services")
            .await?;
        Ok(listing.into_services())
    }

    /// Returns the service list, served from cache while fresh.
    ///
    /// # Errors
    ///
    /// See [`Self::fetch`].
    pub async fn list(&self) -> Result<Vec<ServiceDescriptor>, HttpClientError> {
        if let Some(services) = self.cache.get().await {
            return Ok(services);
        }

        #[cfg(feature = "telemetry")]
        tracing::debug!("registry cache miss");

        let services = self.fetch().await?;
        self.cache.set(services.clone()).await;
        Ok(services)
    }
}

impl ServiceRegistry for HttpServiceRegistry {
    fn services(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ServiceDescriptor>, RegistryError>> + Send + '_>>
    {
        Box::pin(async move { self.list().await.map_err(RegistryError::from) })
    }
}

impl TryFrom<&str> for HttpServiceRegistry {
    type Error = HttpClientError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_new(client::parse_base_url(value)?)
    }
}

impl TryFrom<String> for HttpServiceRegistry {
    type Error = HttpClientError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn descriptor(id: &str) -> Value {
        json!({
            "id": id,
            "title": "Mint a badge",
            "hookType": "nft-mint",
            "hookAddress": "0x1111111111111111111111111111111111111111",
            "network": "base-sepolia",
            "chainId": 84532,
            "settlementRouterAddress": "0x817e4f0ee2fbdaac426f1178e149f7dc98873ecb",
            "stablecoinAddress": "0x036CbD53842c5426634e7929541eC2318f3dCF7e",
            "supportingContracts": { "nftContract": "0x2222222222222222222222222222222222222222" },
            "defaults": { "paymentAmount": "0.1", "payTo": "0x3333333333333333333333333333333333333333" }
        })
    }

    async fn mount(server: &MockServer, body: Value, expected_calls: u64) {
        Mock::given(method("GET"))
            .and(path("/services"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_list_is_cached() {
        let server = MockServer::start().await;
        mount(&server, json!([descriptor("mint-badge")]), 1).await;

        let registry = HttpServiceRegistry::try_from(server.uri()).unwrap();
        let first = registry.services().await.unwrap();
        let second = registry.services().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].id, "mint-badge");
    }

    #[tokio::test]
    async fn test_cache_disabled_hits_network_each_time() {
        let server = MockServer::start().await;
        mount(&server, json!([descriptor("mint-badge")]), 2).await;

        let registry = HttpServiceRegistry::try_from(server.uri())
            .unwrap()
            .without_cache();
        registry.list().await.unwrap();
        registry.list().await.unwrap();
    }

    #[tokio::test]
    async fn test_cache_expires() {
        let server = MockServer::start().await;
        mount(&server, json!([descriptor("mint-badge")]), 2).await;

        let registry = HttpServiceRegistry::try_from(server.uri())
            .unwrap()
            .with_cache_ttl(Duration::from_millis(1));
        registry.list().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        registry.list().await.unwrap();
    }

    #[tokio::test]
    async fn test_wrapped_listing_is_accepted() {
        let server = MockServer::start().await;
        mount(
            &server,
            json!({ "services": [descriptor("a"), descriptor("b")] }),
            1,
        )
        .await;

        let registry = HttpServiceRegistry::try_from(server.uri()).unwrap();
        let ids: Vec<_> = registry
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[tokio::test]
    async fn test_malformed_entries_are_skipped() {
        let server = MockServer::start().await;
        let mut broken = descriptor("broken");
        broken["hookType"] = json!("teleport");
        mount(&server, json!([descriptor("ok"), broken]), 1).await;

        let registry = HttpServiceRegistry::try_from(server.uri()).unwrap();
        let services = registry.list().await.unwrap();
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].id, "ok");
    }

    #[tokio::test]
    async fn test_server_error_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/services"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let registry = HttpServiceRegistry::try_from(server.uri()).unwrap();
        let err = registry.services().await.unwrap_err();
        assert!(matches!(err, RegistryError::Transport(ref msg) if msg.contains("maintenance")));
    }

    #[tokio::test]
    async fn test_non_listing_body_is_malformed() {
        let server = MockServer::start().await;
        mount(&server, json!({ "error": "nope" }), 1).await;

        let registry = HttpServiceRegistry::try_from(server.uri()).unwrap();
        let err = registry.services().await.unwrap_err();
        assert!(matches!(err, RegistryError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/services"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        mount(&server, json!([descriptor("mint-badge")]), 1).await;

        let registry = HttpServiceRegistry::try_from(server.uri()).unwrap();
        assert!(registry.list().await.is_err());
        assert_eq!(registry.list().await.unwrap().len(), 1);
    }
}
