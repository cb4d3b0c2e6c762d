//! LLM Provider Module
//!
//! Defines the provider error type, plus sub-modules for the provider
//! registry, caller-supplied keys, outbound transport, wire-format conversion
//! and the ordered fallback dispatcher.

pub mod dispatcher;
pub mod keys;
pub mod registry;
pub mod transform;
pub mod transport;
pub mod types;

// Re-exports for convenience.
pub use self::dispatcher::{DispatchFailure, DispatchSettings, Dispatcher};
pub use self::keys::ProviderKeys;
pub use self::registry::{ProviderId, ProviderRegistry};
pub use self::transport::{HttpTransport, Transport};

// ---------------------------------------------------------------------------
// ProviderError
// ---------------------------------------------------------------------------

/// Errors that can occur during a single provider call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to encode request: {0}")]
    Encode(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Provider not registered: {0}")]
    NotRegistered(ProviderId),

    #[error("Deadline exceeded before the provider was attempted")]
    DeadlineExceeded,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ProviderError {
    /// True when the failure is a timeout of any kind.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::DeadlineExceeded)
    }
}
