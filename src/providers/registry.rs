//! Provider Registry
//!
//! Immutable table of the upstream providers the relay knows how to call.
//! Built once at startup (optionally with endpoint/model overrides from
//! configuration) and shared by reference; nothing mutates it afterwards.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::{ProviderOverride, ProvidersConfig};
use crate::providers::ProviderError;

// ---------------------------------------------------------------------------
// Provider identifiers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Groq,
    Gemini,
    OpenRouter,
    Together,
}

impl ProviderId {
    /// Natural order, used when a request does not name its own.
    pub const ALL: [ProviderId; 4] = [
        ProviderId::Groq,
        ProviderId::Gemini,
        ProviderId::OpenRouter,
        ProviderId::Together,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Groq => "groq",
            Self::Gemini => "gemini",
            Self::OpenRouter => "openrouter",
            Self::Together => "together",
        }
    }

    /// Inbound header carrying the caller's key for this provider.
    pub fn key_header(&self) -> &'static str {
        match self {
            Self::Groq => "x-groq-key",
            Self::Gemini => "x-gemini-key",
            Self::OpenRouter => "x-openrouter-key",
            Self::Together => "x-together-key",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', '_'], "").as_str() {
            "groq" => Ok(Self::Groq),
            "gemini" => Ok(Self::Gemini),
            "openrouter" => Ok(Self::OpenRouter),
            "together" | "togetherai" => Ok(Self::Together),
            _ => Err(ProviderError::UnknownProvider(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Provider spec
// ---------------------------------------------------------------------------

/// How the caller's key is attached to the outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// `Authorization: Bearer <key>`.
    Bearer,
    /// Key passed as a URL query parameter; no auth header.
    QueryParam { name: &'static str },
}

/// Request/response shape spoken by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    OpenAi,
    Gemini,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSpec {
    pub id: ProviderId,
    pub name: &'static str,
    /// Endpoint URL. A `{model}` placeholder is replaced by [`Self::model`].
    pub endpoint: String,
    pub model: String,
    pub auth: AuthScheme,
    pub wire: WireFormat,
}

impl ProviderSpec {
    /// Fully resolved endpoint URL.
    pub fn url(&self) -> String {
        self.endpoint.replace("{model}", &self.model)
    }

    fn builtin(id: ProviderId) -> Self {
        match id {
            ProviderId::Groq => Self {
                id,
                name: "Groq",
                endpoint: "https://api.groq.com/openai/v1/chat/completions".to_string(),
                model: "llama-3.3-70b-versatile".to_string(),
                auth: AuthScheme::Bearer,
                wire: WireFormat::OpenAi,
            },
            ProviderId::Gemini => Self {
                id,
                name: "Google Gemini",
                endpoint:
                    "https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent"
                        .to_string(),
                model: "gemini-2.0-flash".to_string(),
                auth: AuthScheme::QueryParam { name: "key" },
                wire: WireFormat::Gemini,
            },
            ProviderId::OpenRouter => Self {
                id,
                name: "OpenRouter",
                endpoint: "https://openrouter.ai/api/v1/chat/completions".to_string(),
                model: "meta-llama/llama-3.3-70b-instruct".to_string(),
                auth: AuthScheme::Bearer,
                wire: WireFormat::OpenAi,
            },
            ProviderId::Together => Self {
                id,
                name: "Together AI",
                endpoint: "https://api.together.xyz/v1/chat/completions".to_string(),
                model: "meta-llama/Llama-3.3-70B-Instruct-Turbo".to_string(),
                auth: AuthScheme::Bearer,
                wire: WireFormat::OpenAi,
            },
        }
    }

    fn apply_override(&mut self, ov: &ProviderOverride) -> Result<(), ProviderError> {
        if let Some(ref model) = ov.model {
            self.model = model.clone();
        }
        if let Some(ref endpoint) = ov.endpoint {
            self.endpoint = endpoint.clone();
        }

        let url = url::Url::parse(&self.url()).map_err(|e| {
            ProviderError::Config(format!("Invalid endpoint for {}: {e}", self.id))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ProviderError::Config(format!(
                "Endpoint for {} must use http or https, got {}",
                self.id,
                url.scheme()
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ProviderRegistry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    /// Specs in natural order.
    specs: Vec<ProviderSpec>,
}

impl ProviderRegistry {
    /// Registry with the built-in endpoints and default models.
    pub fn builtin() -> Self {
        Self {
            specs: ProviderId::ALL.into_iter().map(ProviderSpec::builtin).collect(),
        }
    }

    /// Registry with per-provider overrides from configuration applied.
    pub fn from_config(config: &ProvidersConfig) -> Result<Self, ProviderError> {
        let mut registry = Self::builtin();
        for spec in &mut registry.specs {
            if let Some(ov) = config.override_for(spec.id) {
                spec.apply_override(ov)?;
            }
        }
        Ok(registry)
    }

    pub fn get(&self, id: ProviderId) -> Option<&ProviderSpec> {
        self.specs.iter().find(|s| s.id == id)
    }

    pub fn specs(&self) -> &[ProviderSpec] {
        &self.specs
    }

    pub fn natural_order(&self) -> Vec<ProviderId> {
        self.specs.iter().map(|s| s.id).collect()
    }

    /// Turn a caller-supplied order into provider ids.
    ///
    /// `None` yields the natural order. Unknown names are rejected; repeated
    /// names keep only their first position.
    pub fn resolve_order(&self, requested: Option<&[String]>) -> Result<Vec<ProviderId>, ProviderError> {
        let Some(requested) = requested else {
            return Ok(self.natural_order());
        };

        let mut order = Vec::with_capacity(requested.len());
        for name in requested {
            let id: ProviderId = name.parse()?;
            if self.get(id).is_none() {
                return Err(ProviderError::UnknownProvider(name.clone()));
            }
            if !order.contains(&id) {
                order.push(id);
            }
        }
        Ok(order)
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
