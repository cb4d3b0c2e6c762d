use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;
use serde_json::Value;

use crate::AppState;
use crate::api::keys::extract_legacy_key;
use crate::error::AppError;
use crate::providers::dispatcher::AttemptOutcome;
use crate::providers::keys::ProviderKeys;
use crate::providers::types::{ChatRequest, NormalizedResponse};

/// POST /api/chat
///
/// Tries providers in `provider_order` (or the natural order) using the keys
/// from the `X-<Provider>-Key` headers and returns the first success.
pub async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<NormalizedResponse>, AppError> {
    let Json(request) = payload?;
    let keys = ProviderKeys::from_headers(&headers);

    tracing::info!(
        messages = request.messages.len(),
        keys = keys.len(),
        "Chat request"
    );

    match state.dispatcher.dispatch(&request, &keys).await {
        Ok(response) => Ok(Json(response)),
        Err(failure) => {
            for attempt in &failure.attempts {
                match attempt.outcome {
                    AttemptOutcome::Skipped => {
                        tracing::debug!(provider = %attempt.provider, "Skipped (no key)");
                    }
                    AttemptOutcome::Failed(ref e) => {
                        tracing::debug!(provider = %attempt.provider, error = %e, "Attempt failed");
                    }
                }
            }
            tracing::warn!(
                tried = failure.tried_providers.len(),
                error = %failure,
                "Chat request failed"
            );
            Err(failure.into())
        }
    }
}

/// POST /api/groq/chat
///
/// Legacy single-provider relay: the body goes to Groq verbatim with the key
/// from `X-API-Key`, and Groq's answer comes back unchanged.
pub async fn groq_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let key = extract_legacy_key(&headers)?;
    let Json(body) = payload?;

    let model = body.get("model").and_then(Value::as_str).unwrap_or("-");
    tracing::info!(model, "Legacy Groq relay request");

    match state.dispatcher.relay_legacy(&body, &key).await {
        Ok(value) => Ok(Json(value)),
        Err(e) => {
            tracing::warn!(error = %e, "Legacy Groq relay failed");
            Err(e.into())
        }
    }
}
