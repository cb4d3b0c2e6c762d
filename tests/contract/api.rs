//! The HTTP surface, end to end through the router.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::common::*;

// ---------------------------------------------------------------------------
// Health / home
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_health_lists_providers_without_calling_them() {
    let server = MockServer::start().await;
    let (status, body) = call(app_for(config_for(&server)), get("/api/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["exec_enabled"], false);
    let ids: Vec<&str> = body["providers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["groq", "gemini", "openrouter", "together"]);
    assert_eq!(body["providers"][1]["key_header"], "X-Gemini-Key");
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_home_describes_endpoints() {
    let server = MockServer::start().await;
    let (status, body) = call(app_for(config_for(&server)), get("/")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["endpoints"]["/api/chat"].is_string());
}

#[tokio::test]
async fn test_cors_preflight_is_answered() {
    let server = MockServer::start().await;
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/chat")
        .header("origin", "http://localhost:3000")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type,x-groq-key")
        .body(Body::empty())
        .unwrap();

    let response = tower::ServiceExt::oneshot(app_for(config_for(&server)), request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*"
    );
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let server = MockServer::start().await;
    let response = tower::ServiceExt::oneshot(app_for(config_for(&server)), get("/api/health"))
        .await
        .unwrap();

    assert!(response.headers().contains_key("x-request-id"));
}

// ---------------------------------------------------------------------------
// POST /api/chat
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_chat_falls_back_to_gemini() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GROQ_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_completion("Halo!")))
        .expect(1)
        .mount(&server)
        .await;

    let mut body = chat_body();
    body["provider_order"] = json!(["groq", "gemini"]);
    let request = post_json(
        "/api/chat",
        &[("x-groq-key", "gk"), ("x-gemini-key", "gm")],
        &body,
    );
    let (status, body) = call(app_for(config_for(&server)), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["provider"], "gemini");
    assert_eq!(body["choices"][0]["message"]["content"], "Halo!");
}

#[tokio::test]
async fn test_chat_without_keys_is_rejected_before_any_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let request = post_json("/api/chat", &[], &chat_body());
    let (status, body) = call(app_for(config_for(&server)), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "No API key provided for any of the requested providers: groq, gemini, openrouter, together"
    );
    assert_eq!(
        body["tried_providers"],
        json!(["groq", "gemini", "openrouter", "together"])
    );
}

#[tokio::test]
async fn test_chat_all_failed_is_500() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GROQ_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
        .mount(&server)
        .await;

    let mut body = chat_body();
    body["provider_order"] = json!(["groq"]);
    let request = post_json("/api/chat", &[("x-groq-key", "bad")], &body);
    let (status, body) = call(app_for(config_for(&server)), request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body["error"],
        "All providers failed. Last error: API error (401): invalid key"
    );
    assert_eq!(body["tried_providers"], json!(["groq"]));
}

#[tokio::test]
async fn test_chat_unknown_provider_is_400() {
    let server = MockServer::start().await;
    let mut body = chat_body();
    body["provider_order"] = json!(["groq", "mistral"]);
    let request = post_json("/api/chat", &[("x-groq-key", "gk")], &body);
    let (status, body) = call(app_for(config_for(&server)), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Unknown provider: mistral");
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_chat_malformed_body_is_400() {
    let server = MockServer::start().await;
    let request = Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header("content-type", "application/json")
        .header("x-groq-key", "gk")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = call(app_for(config_for(&server)), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid JSON body"));
}

// ---------------------------------------------------------------------------
// POST /api/groq/chat
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_legacy_missing_key_makes_no_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let request = post_json("/api/groq/chat", &[], &json!({ "messages": [] }));
    let (status, body) = call(app_for(config_for(&server)), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "API key not found. Send your API key in the X-API-Key header"
    );
}

#[tokio::test]
async fn test_legacy_relays_body_and_response_verbatim() {
    let server = MockServer::start().await;
    let inbound = json!({
        "model": "mixtral-8x7b-32768",
        "messages": [{ "role": "user", "content": "Hi" }],
        "stream": false,
        "seed": 42
    });
    let upstream = json!({
        "id": "chatcmpl-legacy",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": "Hello" } }],
        "x_groq": { "id": "req_1" }
    });
    Mock::given(method("POST"))
        .and(path(GROQ_PATH))
        .and(header("authorization", "Bearer legacy-key"))
        .and(body_json(&inbound))
        .respond_with(ResponseTemplate::new(200).set_body_json(&upstream))
        .expect(1)
        .mount(&server)
        .await;

    let request = post_json("/api/groq/chat", &[("x-api-key", "legacy-key")], &inbound);
    let (status, body) = call(app_for(config_for(&server)), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, upstream);
}

#[tokio::test]
async fn test_legacy_passes_upstream_status_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GROQ_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid API Key"))
        .mount(&server)
        .await;

    let request = post_json("/api/groq/chat", &[("x-api-key", "nope")], &json!({}));
    let (status, body) = call(app_for(config_for(&server)), request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Groq API Error: Invalid API Key");
    assert_eq!(body["status_code"], 401);
}

#[tokio::test]
async fn test_legacy_timeout_is_504() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GROQ_PATH))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.providers.timeout_secs = 1;
    let request = post_json("/api/groq/chat", &[("x-api-key", "k")], &json!({}));
    let (status, body) = call(app_for(config), request).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["error"], "Request timeout. Groq API did not respond.");
}

// ---------------------------------------------------------------------------
// POST /api/exec
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_exec_disabled_is_403() {
    let server = MockServer::start().await;
    let request = post_json("/api/exec", &[], &json!({ "command": "echo hi" }));
    let (status, _) = call(app_for(config_for(&server)), request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[cfg(unix)]
#[tokio::test]
async fn test_exec_enabled_runs_command() {
    let server = MockServer::start().await;
    let mut config = config_for(&server);
    config.exec.enabled = true;

    let request = post_json("/api/exec", &[], &json!({ "command": "echo hi" }));
    let (status, body) = call(app_for(config), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stdout"], "hi\n");
    assert_eq!(body["exit_code"], 0);
    assert_eq!(body["success"], true);
}
