use axum::Json;
use axum::extract::State;
use serde::Serialize;
use serde_json::{Value, json};

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub version: &'static str,
    /// RFC 3339, UTC.
    pub timestamp: String,
    pub providers: Vec<ProviderInfo>,
    pub exec_enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct ProviderInfo {
    pub id: String,
    pub name: String,
    pub model: String,
    pub key_header: String,
}

/// GET /api/health
///
/// Liveness plus the provider table. Makes no upstream calls.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let providers = state
        .dispatcher
        .registry()
        .specs()
        .iter()
        .map(|spec| ProviderInfo {
            id: spec.id.to_string(),
            name: spec.name.to_string(),
            model: spec.model.clone(),
            key_header: header_display_name(spec.id.key_header()),
        })
        .collect();

    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Relay server is running".to_string(),
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
        providers,
        exec_enabled: state.exec.is_some(),
    })
}

/// GET /
///
/// Static service descriptor with a usage example.
pub async fn home() -> Json<Value> {
    Json(json!({
        "name": "LLM Relay",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "/api/health": "Health check (GET)",
            "/api/chat": "Multi-provider chat with ordered fallback (POST)",
            "/api/groq/chat": "Proxy to Groq API (POST)",
            "/api/exec": "Run a shell command (POST, disabled by default)"
        },
        "usage": {
            "method": "POST",
            "url": "/api/chat",
            "headers": {
                "Content-Type": "application/json",
                "X-Groq-Key": "your-groq-api-key",
                "X-Gemini-Key": "your-gemini-api-key"
            },
            "body": {
                "provider_order": ["groq", "gemini"],
                "messages": [
                    { "role": "system", "content": "You are a helpful assistant" },
                    { "role": "user", "content": "Hello!" }
                ]
            }
        }
    }))
}

/// `x-groq-key` -> `X-Groq-Key`.
fn header_display_name(header: &str) -> String {
    header
        .split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}
