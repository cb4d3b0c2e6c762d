//! Outbound HTTP transport.
//!
//! The dispatcher talks to providers only through [`Transport`], so tests can
//! substitute a recording stub and production uses [`HttpTransport`].

use std::fmt;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::Client;
use serde_json::Value;

use crate::providers::ProviderError;

/// Default user agent for outbound calls.
pub const USER_AGENT: &str = concat!("llm-relay/", env!("CARGO_PKG_VERSION"));

/// Default connection timeout.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Request / response
// ---------------------------------------------------------------------------

/// A fully built outbound POST with a JSON body.
#[derive(Clone)]
pub struct OutboundRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Value,
    pub timeout: Duration,
}

impl OutboundRequest {
    pub fn new(url: impl Into<String>, body: Value, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            query: Vec::new(),
            body,
            timeout,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn bearer(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {token}"))
    }
}

// Header and query values carry credentials.
impl fmt::Debug for OutboundRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Vec<&str> = self.headers.iter().map(|(k, _)| k.as_str()).collect();
        let query: Vec<&str> = self.query.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("OutboundRequest")
            .field("url", &self.url)
            .field("headers", &headers)
            .field("query", &query)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

// ---------------------------------------------------------------------------
// Transport trait
// ---------------------------------------------------------------------------

/// Boxed-future trait so it can be held as `Arc<dyn Transport>`.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: OutboundRequest,
    ) -> BoxFuture<'_, Result<TransportResponse, ProviderError>>;
}

// ---------------------------------------------------------------------------
// HttpTransport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        let client = match Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
        {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("Failed to build HTTP client with custom config: {}; using defaults", e);
                Client::default()
            }
        };
        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn send(
        &self,
        request: OutboundRequest,
    ) -> BoxFuture<'_, Result<TransportResponse, ProviderError>> {
        async move {
            let timeout_secs = whole_secs(request.timeout);
            let mut builder = self
                .client
                .post(&request.url)
                .timeout(request.timeout)
                .json(&request.body);
            if !request.query.is_empty() {
                builder = builder.query(&request.query);
            }
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }

            let response = builder
                .send()
                .await
                .map_err(|e| map_reqwest_error(e, timeout_secs))?;
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .map_err(|e| map_reqwest_error(e, timeout_secs))?;

            Ok(TransportResponse { status, body })
        }
        .boxed()
    }
}

/// Seconds, rounded up so sub-second timeouts never report zero.
pub fn whole_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

/// The URL is stripped because query-param auth puts the key in it.
fn map_reqwest_error(err: reqwest::Error, timeout_secs: u64) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(timeout_secs)
    } else {
        ProviderError::Network(err.without_url().to_string())
    }
}
