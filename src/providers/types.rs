use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::providers::registry::ProviderId;

/// Inbound chat request accepted by `POST /api/chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Provider ids to try, in order. `None` means the registry's natural order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_order: Option<Vec<String>>,
}

impl ChatRequest {
    /// Tools to offer upstream, or `None` when the list is absent or empty.
    pub fn offered_tools(&self) -> Option<&[Tool]> {
        self.tools.as_deref().filter(|tools| !tools.is_empty())
    }
}

/// OpenAI-compatible chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    #[serde(default)]
    pub content: Option<MessageContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn text(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(MessageContent::Text(content.into())),
            name: None,
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Plain text of the message, joining text parts with newlines.
    pub fn text_content(&self) -> Option<String> {
        self.content.as_ref().map(MessageContent::to_text)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    /// Multimodal parts, kept as raw JSON so image and audio parts reach
    /// OpenAI-compatible providers untouched.
    Parts(Vec<Value>),
}

impl MessageContent {
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter(|p| p.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

/// Tool definition offered to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    pub r#type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<FunctionDef>,
}

impl Tool {
    /// The function definition, if this is a `function` tool.
    pub fn as_function(&self) -> Option<&FunctionDef> {
        if self.r#type == "function" {
            self.function.as_ref()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default)]
    pub id: String,
    #[serde(default = "default_tool_type")]
    pub r#type: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

fn default_tool_type() -> String {
    "function".to_string()
}

fn default_assistant_role() -> String {
    "assistant".to_string()
}

/// OpenAI-style response returned to the caller, whichever provider served it.
///
/// `provider` and `model` are set by the relay. Everything else in `body`
/// (`choices`, `id`, `usage`, ...) is what the upstream sent, untouched for
/// OpenAI-compatible providers and synthesized for Gemini.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedResponse {
    pub provider: ProviderId,
    pub model: String,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl NormalizedResponse {
    /// Build a response; `provider` and `model` keys in `body` are replaced.
    pub fn new(
        provider: ProviderId,
        model: impl Into<String>,
        mut body: Map<String, Value>,
    ) -> Self {
        body.remove("provider");
        body.remove("model");
        Self {
            provider,
            model: model.into(),
            body,
        }
    }

    /// The `choices` array, or empty when the upstream sent none.
    pub fn choices(&self) -> &[Value] {
        self.body
            .get("choices")
            .and_then(Value::as_array)
            .map_or(&[], Vec::as_slice)
    }

    /// String content of the first choice's message.
    pub fn first_content(&self) -> Option<&str> {
        self.choices().first()?.pointer("/message/content")?.as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMessage {
    #[serde(default = "default_assistant_role")]
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResponseMessage {
    pub fn assistant_text(content: impl Into<String>) -> Self {
        Self {
            role: default_assistant_role(),
            content: Some(content.into()),
            tool_calls: None,
            extra: Map::new(),
        }
    }
}
