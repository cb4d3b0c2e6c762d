//! Ordered provider fallback.
//!
//! The [`Dispatcher`] walks the requested provider order, skips providers the
//! caller did not supply a key for, and returns the first successful response.
//! It holds no per-request state, so one instance serves all requests.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::providers::ProviderError;
use crate::providers::keys::ProviderKeys;
use crate::providers::registry::{AuthScheme, ProviderId, ProviderRegistry, ProviderSpec, WireFormat};
use crate::providers::transform::{
    CompletionRequest, from_gemini_response, from_openai_response, gemini_finish_reason,
    gemini_usage, to_gemini_request,
};
use crate::providers::transport::{OutboundRequest, Transport, TransportResponse, whole_secs};
use crate::providers::types::{ChatRequest, NormalizedResponse};

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    /// Per-call timeout.
    pub timeout: Duration,
    /// Optional budget for the whole sweep.
    pub deadline: Option<Duration>,
    pub default_temperature: f32,
    pub default_max_tokens: u32,
    pub log_content: bool,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            deadline: None,
            default_temperature: 0.7,
            default_max_tokens: 1500,
            log_content: false,
        }
    }
}

impl DispatchSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: config.providers.timeout(),
            deadline: config.providers.deadline(),
            default_temperature: config.providers.default_temperature,
            default_max_tokens: config.providers.default_max_tokens,
            log_content: config.logging.log_content,
        }
    }
}

// ---------------------------------------------------------------------------
// Failure report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// `provider_order` named a provider the relay does not know.
    InvalidOrder,
    /// None of the candidate providers had a key.
    NoKeys,
    /// Every provider with a key was attempted and failed.
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// No key was supplied; no call was made.
    Skipped,
    Failed(ProviderError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub provider: ProviderId,
    pub outcome: AttemptOutcome,
}

/// Aggregated failure of a dispatch.
#[derive(Debug, Clone)]
pub struct DispatchFailure {
    pub kind: FailureKind,
    pub last_error: Option<ProviderError>,
    /// Every provider in the resolved order, skipped ones included.
    pub tried_providers: Vec<ProviderId>,
    pub attempts: Vec<Attempt>,
}

impl DispatchFailure {
    fn invalid_order(err: ProviderError) -> Self {
        Self {
            kind: FailureKind::InvalidOrder,
            last_error: Some(err),
            tried_providers: Vec::new(),
            attempts: Vec::new(),
        }
    }

    pub fn message(&self) -> String {
        match self.kind {
            FailureKind::InvalidOrder => self
                .last_error
                .as_ref()
                .map_or_else(|| "Invalid provider order".to_string(), ToString::to_string),
            FailureKind::NoKeys if self.tried_providers.is_empty() => {
                "No providers requested".to_string()
            }
            FailureKind::NoKeys => format!(
                "No API key provided for any of the requested providers: {}",
                join_ids(&self.tried_providers)
            ),
            FailureKind::Exhausted => match self.last_error {
                Some(ref e) => format!("All providers failed. Last error: {e}"),
                None => "All providers failed".to_string(),
            },
        }
    }
}

impl fmt::Display for DispatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for DispatchFailure {}

fn join_ids(ids: &[ProviderId]) -> String {
    ids.iter().map(ProviderId::as_str).collect::<Vec<_>>().join(", ")
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

pub struct Dispatcher {
    registry: Arc<ProviderRegistry>,
    transport: Arc<dyn Transport>,
    settings: DispatchSettings,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        transport: Arc<dyn Transport>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            registry,
            transport,
            settings,
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Try each provider in order and return the first success.
    pub async fn dispatch(
        &self,
        request: &ChatRequest,
        keys: &ProviderKeys,
    ) -> Result<NormalizedResponse, DispatchFailure> {
        let order = self
            .registry
            .resolve_order(request.provider_order.as_deref())
            .map_err(DispatchFailure::invalid_order)?;

        if self.settings.log_content {
            debug!(
                messages = request.messages.len(),
                tools = request.offered_tools().map_or(0, |t| t.len()),
                order = %join_ids(&order),
                "Dispatching chat request"
            );
        }

        let started = Instant::now();
        let mut attempts = Vec::with_capacity(order.len());
        let mut last_err: Option<ProviderError> = None;

        for &id in &order {
            let Some(key) = keys.get(id) else {
                debug!(provider = %id, "No key supplied, skipping provider");
                attempts.push(Attempt {
                    provider: id,
                    outcome: AttemptOutcome::Skipped,
                });
                continue;
            };

            let result = match self.call_budget(started) {
                Some(timeout) => self.attempt(id, request, key, timeout).await,
                None => Err(ProviderError::DeadlineExceeded),
            };

            match result {
                Ok(response) => {
                    info!(
                        provider = %id,
                        model = %response.model,
                        latency_ms = started.elapsed().as_millis() as u64,
                        "Chat succeeded"
                    );
                    return Ok(response);
                }
                Err(e) => {
                    warn!(provider = %id, error = %e, "Chat failed, trying next provider");
                    attempts.push(Attempt {
                        provider: id,
                        outcome: AttemptOutcome::Failed(e.clone()),
                    });
                    last_err = Some(e);
                }
            }
        }

        let kind = if last_err.is_some() {
            FailureKind::Exhausted
        } else {
            FailureKind::NoKeys
        };
        Err(DispatchFailure {
            kind,
            last_error: last_err,
            tried_providers: order,
            attempts,
        })
    }

    /// Forward a raw OpenAI body to Groq with one caller key.
    ///
    /// The upstream body is returned untouched on 200. No fallback.
    pub async fn relay_legacy(&self, body: &Value, key: &str) -> Result<Value, ProviderError> {
        let spec = self
            .registry
            .get(ProviderId::Groq)
            .ok_or(ProviderError::NotRegistered(ProviderId::Groq))?;
        let timeout = self.settings.timeout;

        let outbound = OutboundRequest::new(spec.url(), body.clone(), timeout).bearer(key);
        let started = Instant::now();
        let response = self.send(outbound, timeout).await?;

        if !response.is_success() {
            return Err(ProviderError::Api {
                status: response.status,
                message: response.body,
            });
        }

        let value = serde_json::from_str(&response.body)
            .map_err(|e| ProviderError::InvalidResponse(format!("{}: {e}", spec.id)))?;
        info!(
            provider = %spec.id,
            latency_ms = started.elapsed().as_millis() as u64,
            "Legacy relay succeeded"
        );
        Ok(value)
    }

    /// Timeout for the next call, or `None` once the deadline has passed.
    fn call_budget(&self, started: Instant) -> Option<Duration> {
        match self.settings.deadline {
            None => Some(self.settings.timeout),
            Some(deadline) => {
                let remaining = deadline.checked_sub(started.elapsed())?;
                if remaining.is_zero() {
                    None
                } else {
                    Some(remaining.min(self.settings.timeout))
                }
            }
        }
    }

    async fn attempt(
        &self,
        id: ProviderId,
        request: &ChatRequest,
        key: &str,
        timeout: Duration,
    ) -> Result<NormalizedResponse, ProviderError> {
        let spec = self.registry.get(id).ok_or(ProviderError::NotRegistered(id))?;
        debug!(provider = %id, model = %spec.model, "Attempting chat");

        let outbound = self.build_request(spec, request, key, timeout)?;
        let response = self.send(outbound, timeout).await?;

        if !response.is_success() {
            return Err(ProviderError::Api {
                status: response.status,
                message: response.body,
            });
        }

        match spec.wire {
            WireFormat::OpenAi => from_openai_response(id, &spec.model, &response.body),
            WireFormat::Gemini => Ok(normalize_gemini(spec, &response.body)),
        }
    }

    fn build_request(
        &self,
        spec: &ProviderSpec,
        request: &ChatRequest,
        key: &str,
        timeout: Duration,
    ) -> Result<OutboundRequest, ProviderError> {
        let temperature = request.temperature.unwrap_or(self.settings.default_temperature);
        let max_tokens = request.max_tokens.unwrap_or(self.settings.default_max_tokens);
        let tools = request.offered_tools();

        let body = match spec.wire {
            WireFormat::OpenAi => serde_json::to_value(CompletionRequest::new(
                &spec.model,
                &request.messages,
                temperature,
                max_tokens,
                tools,
            )),
            WireFormat::Gemini => serde_json::to_value(
                to_gemini_request(&request.messages, tools)
                    .with_generation_config(temperature, max_tokens),
            ),
        }
        .map_err(|e| ProviderError::Encode(e.to_string()))?;

        let outbound = OutboundRequest::new(spec.url(), body, timeout);
        Ok(match spec.auth {
            AuthScheme::Bearer => outbound.bearer(key),
            AuthScheme::QueryParam { name } => outbound.query(name, key),
        })
    }

    /// Send with a hard timeout on top of the transport's own.
    async fn send(
        &self,
        outbound: OutboundRequest,
        timeout: Duration,
    ) -> Result<TransportResponse, ProviderError> {
        match tokio::time::timeout(timeout, self.transport.send(outbound)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(whole_secs(timeout))),
        }
    }
}

/// Build a normalized response from a 200 Gemini body. Never fails.
fn normalize_gemini(spec: &ProviderSpec, body: &str) -> NormalizedResponse {
    let raw: Value =
        serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()));
    let message = from_gemini_response(&raw);
    let finish_reason = gemini_finish_reason(&raw, &message);

    let mut body = Map::new();
    body.insert("object".into(), Value::from("chat.completion"));
    body.insert(
        "choices".into(),
        json!([{ "index": 0, "message": message, "finish_reason": finish_reason }]),
    );
    if let Some(usage) = gemini_usage(&raw) {
        body.insert("usage".into(), usage);
    }

    NormalizedResponse::new(spec.id, spec.model.clone(), body)
}
