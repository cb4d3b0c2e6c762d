//! Small helpers shared by the converters.

/// Map a provider-native finish reason onto the OpenAI vocabulary.
///
/// Unknown values collapse to `"stop"`.
pub fn map_finish_reason_to_openai(reason: &str) -> &'static str {
    match reason {
        // Gemini
        "STOP" => "stop",
        "MAX_TOKENS" => "length",
        "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII" => "content_filter",
        // Already OpenAI format
        "stop" => "stop",
        "length" => "length",
        "tool_calls" => "tool_calls",
        "content_filter" => "content_filter",
        _ => "stop",
    }
}
