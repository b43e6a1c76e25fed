//! Shared JSON-over-HTTP plumbing for the registry and facilitator clients.

use std::fmt::Display;
use std::time::Duration;

use http::{HeaderMap, StatusCode};
use reqwest::{Client, RequestBuilder};
use url::Url;

#[cfg(feature = "telemetry")]
use tracing::{Instrument, Span};

use crate::error::HttpClientError;

/// A reqwest client with per-request headers and timeout.
#[derive(Clone, Debug, Default)]
pub(crate) struct JsonClient {
    client: Client,
    headers: HeaderMap,
    timeout: Option<Duration>,
}

impl JsonClient {
    pub(crate) const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub(crate) const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub(crate) fn set_headers(&mut self, headers: HeaderMap) {
        self.headers = headers;
    }

    pub(crate) const fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = Some(timeout);
    }

    /// `context` is a human-readable identifier used in tracing and error
    /// messages (e.g. `"POST /verify"`).
    pub(crate) async fn post_json<T, R>(
        &self,
        url: &Url,
        context: &'static str,
        payload: &T,
    ) -> Result<R, HttpClientError>
    where
        T: serde::Serialize + Sync + ?Sized,
        R: serde::de::DeserializeOwned,
    {
        self.send(self.client.post(url.clone()).json(payload), context)
            .await
    }

    pub(crate) async fn get_json<R>(
        &self,
        url: &Url,
        context: &'static str,
    ) -> Result<R, HttpClientError>
    where
        R: serde::de::DeserializeOwned,
    {
        self.send(self.client.get(url.clone()), context).await
    }

    async fn send<R>(&self, mut req: RequestBuilder, context: &'static str) -> Result<R, HttpClientError>
    where
        R: serde::de::DeserializeOwned,
    {
        for (key, value) in &self.headers {
            req = req.header(key, value);
        }
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }
        let http_response = req
            .send()
            .await
            .map_err(|e| HttpClientError::Http { context, source: e })?;

        let result = if http_response.status() == StatusCode::OK {
            http_response
                .json::<R>()
                .await
                .map_err(|e| HttpClientError::JsonDeserialization { context, source: e })
        } else {
            let status = http_response.status();
            let body = http_response
                .text()
                .await
                .map_err(|e| HttpClientError::ResponseBodyRead { context, source: e })?;
            Err(HttpClientError::HttpStatus {
                context,
                status,
                body,
            })
        };

        record_result_on_span(&result);

        result
    }
}

/// Parses `value` as a base URL, normalizing it to exactly one trailing slash
/// so that relative joins land under it.
pub(crate) fn parse_base_url(value: &str) -> Result<Url, HttpClientError> {
    let mut normalized = value.trim_end_matches('/').to_owned();
    normalized.push('/');
    Url::parse(&normalized).map_err(|e| HttpClientError::UrlParse {
        context: "Failed to parse base url",
        source: e,
    })
}

/// Joins a relative endpoint onto `base`.
pub(crate) fn join(base: &Url, endpoint: &str, context: &'static str) -> Result<Url, HttpClientError> {
    base.join(endpoint)
        .map_err(|e| HttpClientError::UrlParse { context, source: e })
}

/// Records the outcome of a request on the current span.
#[cfg(feature = "telemetry")]
fn record_result_on_span<R, E: Display>(result: &Result<R, E>) {
    let span = Span::current();
    match result {
        Ok(_) => {
            span.record("otel.status_code", "OK");
        }
        Err(err) => {
            span.record("otel.status_code", "ERROR");
            span.record("error.message", tracing::field::display(err));
            tracing::event!(tracing::Level::ERROR, error = %err, "HTTP request failed");
        }
    }
}

/// Noop if telemetry feature is off.
#[cfg(not(feature = "telemetry"))]
const fn record_result_on_span<R, E: Display>(_result: &Result<R, E>) {}

/// Instruments a future with a given tracing span.
#[cfg(feature = "telemetry")]
pub(crate) fn with_span<F: Future>(fut: F, span: Span) -> impl Future<Output = F::Output> {
    fut.instrument(span)
}
