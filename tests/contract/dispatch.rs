//! Dispatcher against real HTTP upstreams.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use llm_relay::providers::dispatcher::{AttemptOutcome, FailureKind};
use llm_relay::providers::types::ChatRequest;
use llm_relay::providers::{
    DispatchSettings, Dispatcher, HttpTransport, ProviderError, ProviderId, ProviderKeys,
    ProviderRegistry,
};

use super::common::*;

fn dispatcher_for(server: &MockServer) -> Dispatcher {
    let config = config_for(server);
    let registry = ProviderRegistry::from_config(&config.providers).unwrap();
    Dispatcher::new(
        Arc::new(registry),
        Arc::new(HttpTransport::new()),
        DispatchSettings::from_config(&config),
    )
}

fn request(order: &[&str]) -> ChatRequest {
    let mut body = chat_body();
    body["provider_order"] = json!(order);
    serde_json::from_value(body).unwrap()
}

#[tokio::test]
async fn test_array_content_is_relayed_without_fallback() {
    let server = MockServer::start().await;
    let choices = json!([{
        "index": 0,
        "message": {
            "role": "assistant",
            "content": [{ "type": "text", "text": "part one" }]
        },
        "finish_reason": "stop"
    }]);
    Mock::given(method("POST"))
        .and(path(GROQ_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id": "chatcmpl-arr", "choices": choices })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(TOGETHER_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_completion("unused")))
        .expect(0)
        .mount(&server)
        .await;

    let keys: ProviderKeys = [(ProviderId::Groq, "gk-1"), (ProviderId::Together, "tk-1")]
        .into_iter()
        .collect();
    let response = dispatcher_for(&server)
        .dispatch(&request(&["groq", "together"]), &keys)
        .await
        .unwrap();

    assert_eq!(response.provider, ProviderId::Groq);
    let body = serde_json::to_value(&response).unwrap();
    assert_eq!(body["choices"], choices);
}

#[tokio::test]
async fn test_openai_wire_request_and_passthrough() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GROQ_PATH))
        .and(header("authorization", "Bearer gk-1"))
        .and(body_partial_json(json!({
            "model": "llama-3.3-70b-versatile",
            "max_tokens": 1500,
            "messages": [
                { "role": "system", "content": "Be brief." },
                { "role": "user", "content": "Hello!" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_completion("Hi there")))
        .expect(1)
        .mount(&server)
        .await;

    let keys: ProviderKeys = [(ProviderId::Groq, "gk-1")].into_iter().collect();
    let response = dispatcher_for(&server)
        .dispatch(&request(&["groq"]), &keys)
        .await
        .unwrap();

    assert_eq!(response.provider, ProviderId::Groq);
    assert_eq!(response.model, "llama-3.3-70b-versatile");
    assert_eq!(response.first_content(), Some("Hi there"));

    let body = serde_json::to_value(&response).unwrap();
    assert_eq!(body["provider"], "groq");
    assert_eq!(body["id"], "chatcmpl-abc");
    assert_eq!(body["usage"]["total_tokens"], 7);
}

#[tokio::test]
async fn test_gemini_wire_request_and_normalization() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .and(query_param("key", "gem-1"))
        .and(body_partial_json(json!({
            "contents": [{ "role": "user", "parts": [{ "text": "Be brief.\n\nHello!" }] }],
            "generationConfig": { "maxOutputTokens": 1500 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_completion("Halo")))
        .expect(1)
        .mount(&server)
        .await;

    let keys: ProviderKeys = [(ProviderId::Gemini, "gem-1")].into_iter().collect();
    let response = dispatcher_for(&server)
        .dispatch(&request(&["gemini"]), &keys)
        .await
        .unwrap();

    let body = serde_json::to_value(&response).unwrap();
    assert_eq!(body["provider"], "gemini");
    assert_eq!(body["model"], "gemini-2.0-flash");
    assert_eq!(body["object"], "chat.completion");
    assert_eq!(body["choices"][0]["message"]["role"], "assistant");
    assert_eq!(body["choices"][0]["message"]["content"], "Halo");
    assert_eq!(body["choices"][0]["finish_reason"], "stop");
    assert_eq!(body["usage"]["prompt_tokens"], 4);
}

#[tokio::test]
async fn test_falls_back_in_requested_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOGETHER_PATH))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(OPENROUTER_PATH))
        .and(header("authorization", "Bearer or-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_completion("from openrouter")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(GROQ_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_completion("unused")))
        .expect(0)
        .mount(&server)
        .await;

    let keys: ProviderKeys = [
        (ProviderId::Together, "tg-1"),
        (ProviderId::OpenRouter, "or-1"),
        (ProviderId::Groq, "gk-1"),
    ]
    .into_iter()
    .collect();
    let response = dispatcher_for(&server)
        .dispatch(&request(&["together", "openrouter", "groq"]), &keys)
        .await
        .unwrap();

    assert_eq!(response.provider, ProviderId::OpenRouter);
    assert_eq!(response.first_content(), Some("from openrouter"));
}

#[tokio::test]
async fn test_exhausted_reports_every_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GROQ_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_string("bad key"))
        .mount(&server)
        .await;

    let keys: ProviderKeys = [(ProviderId::Groq, "gk"), (ProviderId::Gemini, "gm")]
        .into_iter()
        .collect();
    let failure = dispatcher_for(&server)
        .dispatch(&request(&["groq", "openrouter", "gemini"]), &keys)
        .await
        .unwrap_err();

    assert_eq!(failure.kind, FailureKind::Exhausted);
    assert_eq!(
        failure.tried_providers,
        vec![ProviderId::Groq, ProviderId::OpenRouter, ProviderId::Gemini]
    );
    assert_eq!(
        failure.last_error,
        Some(ProviderError::Api {
            status: 403,
            message: "bad key".into()
        })
    );
    assert!(matches!(failure.attempts[1].outcome, AttemptOutcome::Skipped));
    assert_eq!(
        failure.to_string(),
        "All providers failed. Last error: API error (403): bad key"
    );
}

#[tokio::test]
async fn test_slow_provider_times_out_and_next_is_tried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GROQ_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(openai_completion("late"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_completion("on time")))
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.providers.timeout_secs = 1;
    let dispatcher = Dispatcher::new(
        Arc::new(ProviderRegistry::from_config(&config.providers).unwrap()),
        Arc::new(HttpTransport::new()),
        DispatchSettings::from_config(&config),
    );

    let keys: ProviderKeys = [(ProviderId::Groq, "gk"), (ProviderId::Gemini, "gm")]
        .into_iter()
        .collect();
    let response = dispatcher
        .dispatch(&request(&["groq", "gemini"]), &keys)
        .await
        .unwrap();

    assert_eq!(response.provider, ProviderId::Gemini);
    assert_eq!(response.first_content(), Some("on time"));
}

#[tokio::test]
async fn test_invalid_success_body_falls_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GROQ_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(TOGETHER_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_completion("ok")))
        .mount(&server)
        .await;

    let keys: ProviderKeys = [(ProviderId::Groq, "gk"), (ProviderId::Together, "tg")]
        .into_iter()
        .collect();
    let response = dispatcher_for(&server)
        .dispatch(&request(&["groq", "together"]), &keys)
        .await
        .unwrap();

    assert_eq!(response.provider, ProviderId::Together);
}
