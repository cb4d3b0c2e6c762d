//! OpenAI <-> Gemini conversion.
//!
//! Lossy by nature: Gemini gets plain text parts only. `tool` messages and a
//! system prompt that cannot be folded into a leading user turn are dropped.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::providers::transform::util;
use crate::providers::types::{
    ChatMessage, FunctionCall, MessageRole, ResponseMessage, Tool, ToolCall,
};

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<GeminiTool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl GeminiRequest {
    pub fn with_generation_config(mut self, temperature: f32, max_output_tokens: u32) -> Self {
        self.generation_config = Some(GenerationConfig {
            temperature: Some(temperature),
            max_output_tokens: Some(max_output_tokens),
        });
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeminiRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeminiContent {
    pub role: GeminiRole,
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeminiPart {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiTool {
    pub function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

// ---------------------------------------------------------------------------
// Request conversion
// ---------------------------------------------------------------------------

/// Convert an OpenAI-style conversation into a Gemini request body.
///
/// The first system message (wherever it appears) is prefixed to the first
/// converted entry with a blank line between them, but only when that entry
/// is a user turn. Otherwise the system prompt is dropped. Messages with no
/// text produce no entry.
pub fn to_gemini_request(messages: &[ChatMessage], tools: Option<&[Tool]>) -> GeminiRequest {
    let system = messages
        .iter()
        .find(|m| m.role == MessageRole::System)
        .and_then(ChatMessage::text_content)
        .filter(|s| !s.is_empty());

    let mut contents: Vec<GeminiContent> = messages
        .iter()
        .filter_map(|msg| {
            let role = match msg.role {
                MessageRole::User => GeminiRole::User,
                MessageRole::Assistant => GeminiRole::Model,
                // Gemini has no equivalent without functionResponse plumbing.
                MessageRole::System | MessageRole::Tool => return None,
            };
            let text = msg.text_content().filter(|t| !t.is_empty())?;
            Some(GeminiContent {
                role,
                parts: vec![GeminiPart { text }],
            })
        })
        .collect();

    if let Some(system) = system {
        match contents.first_mut() {
            Some(first) if first.role == GeminiRole::User => {
                if let Some(part) = first.parts.first_mut() {
                    part.text = format!("{system}\n\n{}", part.text);
                }
            }
            _ => tracing::debug!("Dropping system prompt: first Gemini turn is not a user turn"),
        }
    }

    GeminiRequest {
        contents,
        tools: tools.and_then(convert_tools),
        generation_config: None,
    }
}

fn convert_tools(tools: &[Tool]) -> Option<Vec<GeminiTool>> {
    let declarations: Vec<FunctionDeclaration> = tools
        .iter()
        .filter_map(Tool::as_function)
        .map(|f| FunctionDeclaration {
            name: f.name.clone(),
            description: f.description.clone(),
            parameters: f.parameters.clone(),
        })
        .collect();

    if declarations.is_empty() {
        None
    } else {
        Some(vec![GeminiTool {
            function_declarations: declarations,
        }])
    }
}

// ---------------------------------------------------------------------------
// Response conversion
// ---------------------------------------------------------------------------

/// Convert a raw Gemini response into an assistant message.
///
/// Only the first part of the first candidate is read. Any structural
/// surprise degrades to a text message holding the raw response.
pub fn from_gemini_response(raw: &Value) -> ResponseMessage {
    let Some(part) = first_part(raw) else {
        return fallback_message(raw);
    };

    if let Some(call) = part.get("functionCall") {
        let name = call.get("name").and_then(Value::as_str).unwrap_or_default();
        let args = call.get("args").cloned().unwrap_or_else(|| json!({}));
        let arguments = serde_json::to_string(&args).unwrap_or_else(|_| "{}".to_string());
        return ResponseMessage {
            role: "assistant".to_string(),
            content: None,
            tool_calls: Some(vec![ToolCall {
                id: format!("call_{name}"),
                r#type: "function".to_string(),
                function: FunctionCall {
                    name: name.to_string(),
                    arguments,
                },
            }]),
            extra: Default::default(),
        };
    }

    let text = part.get("text").and_then(Value::as_str).unwrap_or_default();
    ResponseMessage::assistant_text(text)
}

/// OpenAI finish reason for a converted Gemini response.
///
/// `None` whenever the message is the raw-body fallback.
pub fn gemini_finish_reason(raw: &Value, message: &ResponseMessage) -> Option<String> {
    first_part(raw)?;
    if message.tool_calls.is_some() {
        return Some("tool_calls".to_string());
    }
    let reason = raw
        .pointer("/candidates/0/finishReason")
        .and_then(Value::as_str)
        .unwrap_or("STOP");
    Some(util::map_finish_reason_to_openai(reason).to_string())
}

/// OpenAI-style `usage` object built from Gemini's `usageMetadata`.
pub fn gemini_usage(raw: &Value) -> Option<Value> {
    let meta = raw.get("usageMetadata")?;
    let prompt = meta.get("promptTokenCount").and_then(Value::as_u64).unwrap_or(0);
    let completion = meta
        .get("candidatesTokenCount")
        .and_then(Value::as_u64)
        .unwrap_or(0);
    let total = meta
        .get("totalTokenCount")
        .and_then(Value::as_u64)
        .unwrap_or(prompt + completion);
    Some(json!({
        "prompt_tokens": prompt,
        "completion_tokens": completion,
        "total_tokens": total,
    }))
}

/// First candidate part, unless it is missing, not an object, or a
/// `functionCall` without a name.
fn first_part(raw: &Value) -> Option<&Value> {
    raw.pointer("/candidates/0/content/parts/0").filter(|p| {
        p.is_object()
            && p.get("functionCall")
                .is_none_or(|call| call.get("name").is_some_and(Value::is_string))
    })
}

fn fallback_message(raw: &Value) -> ResponseMessage {
    let content = match raw {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    ResponseMessage::assistant_text(content)
}
