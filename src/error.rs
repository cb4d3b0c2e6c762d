use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::exec::ExecError;
use crate::providers::dispatcher::{DispatchFailure, FailureKind};
use crate::providers::{ProviderError, ProviderId};

/// Error type for every handler. Renders as a flat `{error, ...}` JSON body.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Forbidden(String),

    /// No candidate provider had a key.
    #[error("{message}")]
    NoProviderKeys {
        message: String,
        tried_providers: Vec<ProviderId>,
    },

    /// Every attempted provider failed.
    #[error("{message}")]
    AllProvidersFailed {
        message: String,
        tried_providers: Vec<ProviderId>,
    },

    /// Non-200 from the upstream on the legacy relay; status is passed through.
    #[error("{message}")]
    Upstream { status: u16, message: String },

    #[error("{0}")]
    Timeout(String),

    #[error("{0}")]
    Network(String),

    /// Logged in full, rendered generically.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tried_providers: Option<Vec<ProviderId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status_code: Option<u16>,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::NoProviderKeys { .. } => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::AllProvidersFailed { .. } | Self::Network(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::BadRequest(_) => Some("invalid_request"),
            Self::Forbidden(_) => Some("forbidden"),
            Self::NoProviderKeys { .. } => Some("missing_api_key"),
            Self::AllProvidersFailed { .. } => Some("all_providers_failed"),
            Self::Timeout(_) => Some("timeout"),
            Self::Upstream { .. } | Self::Network(_) | Self::Internal(_) => None,
        }
    }

    fn public_message(&self) -> String {
        match self {
            Self::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Self::Internal(ref detail) = self {
            tracing::error!(error = %detail, "Internal error");
        }

        let status = self.status_code();
        let (tried_providers, status_code) = match &self {
            Self::NoProviderKeys {
                tried_providers, ..
            }
            | Self::AllProvidersFailed {
                tried_providers, ..
            } => (Some(tried_providers.clone()), None),
            Self::Upstream { status, .. } => (None, Some(*status)),
            _ => (None, None),
        };
        let body = ErrorResponse {
            error: self.public_message(),
            code: self.error_code(),
            tried_providers,
            status_code,
        };
        (status, axum::Json(body)).into_response()
    }
}

impl From<DispatchFailure> for AppError {
    fn from(failure: DispatchFailure) -> Self {
        let message = failure.message();
        match failure.kind {
            FailureKind::InvalidOrder => Self::BadRequest(message),
            FailureKind::NoKeys => Self::NoProviderKeys {
                message,
                tried_providers: failure.tried_providers,
            },
            FailureKind::Exhausted => Self::AllProvidersFailed {
                message,
                tried_providers: failure.tried_providers,
            },
        }
    }
}

/// Legacy relay errors, worded for the Groq-only contract.
impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Api { status, message } => Self::Upstream {
                status,
                message: format!("Groq API Error: {message}"),
            },
            ProviderError::Timeout(_) | ProviderError::DeadlineExceeded => {
                Self::Timeout("Request timeout. Groq API did not respond.".to_string())
            }
            ProviderError::Network(msg) => Self::Network(format!("Network error: {msg}")),
            ProviderError::UnknownProvider(_) => Self::BadRequest(err.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<ExecError> for AppError {
    fn from(err: ExecError) -> Self {
        match err {
            ExecError::Disabled => Self::Forbidden(err.to_string()),
            ExecError::EmptyCommand => Self::BadRequest(err.to_string()),
            ExecError::Timeout(_) => Self::Timeout(err.to_string()),
            ExecError::Spawn(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}
