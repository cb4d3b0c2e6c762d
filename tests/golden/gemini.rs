use serde_json::{Value, json};

use llm_relay::providers::transform::{
    from_gemini_response, gemini_finish_reason, gemini_usage, to_gemini_request,
};
use llm_relay::providers::types::ChatRequest;

use crate::golden::GoldenTest;

fn convert_request(golden: &GoldenTest, name: &str) -> Value {
    let req: ChatRequest = golden.load_json(name);
    let body = to_gemini_request(&req.messages, req.offered_tools())
        .with_generation_config(req.temperature.unwrap_or(0.7), req.max_tokens.unwrap_or(1500));
    serde_json::to_value(body).unwrap()
}

fn convert_response(golden: &GoldenTest, name: &str) -> Value {
    let raw: Value = golden.load_json(name);
    let message = from_gemini_response(&raw);
    let finish_reason = gemini_finish_reason(&raw, &message);
    json!({
        "message": message,
        "finish_reason": finish_reason,
        "usage": gemini_usage(&raw),
    })
}

#[test]
fn test_gemini_simple_chat_request() {
    let golden = GoldenTest::new("gemini");
    let actual = convert_request(&golden, "simple_chat_req");
    golden.assert_json("simple_chat_req_google", &actual);
}

#[test]
fn test_gemini_multi_turn_tools_request() {
    let golden = GoldenTest::new("gemini");
    let actual = convert_request(&golden, "tools_chat_req");
    golden.assert_json("tools_chat_req_google", &actual);
}

#[test]
fn test_gemini_text_response() {
    let golden = GoldenTest::new("gemini");
    let actual = convert_response(&golden, "simple_chat_resp");
    golden.assert_json("simple_chat_resp_internal", &actual);
}

#[test]
fn test_gemini_function_call_response() {
    let golden = GoldenTest::new("gemini");
    let actual = convert_response(&golden, "function_call_resp");
    golden.assert_json("function_call_resp_internal", &actual);
}
