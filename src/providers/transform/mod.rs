//! Wire-format conversion between the relay's OpenAI-style schema and each
//! provider's native request/response shapes.

pub mod gemini;
pub mod openai;
pub mod util;

// Re-export commonly used items.
pub use gemini::{from_gemini_response, gemini_finish_reason, gemini_usage, to_gemini_request};
pub use openai::{CompletionRequest, from_openai_response};
pub use util::map_finish_reason_to_openai;
