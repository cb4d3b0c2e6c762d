//! OpenAI-compatible request building and response normalization.
//!
//! Used for every provider whose wire format is the OpenAI chat schema
//! (Groq, OpenRouter, Together).

use serde::Serialize;
use serde_json::Value;

use crate::providers::ProviderError;
use crate::providers::registry::ProviderId;
use crate::providers::types::{ChatMessage, NormalizedResponse, Tool};

/// Outbound body. Messages and tools are borrowed and serialized verbatim.
#[derive(Debug, Serialize)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub temperature: f32,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<&'a [Tool]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<&'static str>,
}

impl<'a> CompletionRequest<'a> {
    pub fn new(
        model: &'a str,
        messages: &'a [ChatMessage],
        temperature: f32,
        max_tokens: u32,
        tools: Option<&'a [Tool]>,
    ) -> Self {
        Self {
            model,
            messages,
            temperature,
            max_tokens,
            tools,
            tool_choice: tools.map(|_| "auto"),
        }
    }
}

/// Parse a 200 body into a [`NormalizedResponse`].
///
/// `provider` and `model` are always set by the relay. Everything else,
/// `choices` included, is kept exactly as the upstream sent it.
pub fn from_openai_response(
    provider: ProviderId,
    model: &str,
    body: &str,
) -> Result<NormalizedResponse, ProviderError> {
    let parsed: Value = serde_json::from_str(body)
        .map_err(|e| ProviderError::InvalidResponse(format!("{provider}: {e}")))?;
    let Value::Object(map) = parsed else {
        return Err(ProviderError::InvalidResponse(format!(
            "{provider}: response is not a JSON object"
        )));
    };
    Ok(NormalizedResponse::new(provider, model, map))
}
