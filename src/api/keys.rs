use axum::http::HeaderMap;

use crate::error::AppError;

/// Header carrying the caller's key on the legacy Groq route.
pub const LEGACY_KEY_HEADER: &str = "x-api-key";

/// Extract the caller's key for the legacy relay.
///
/// Missing, blank or non-text values are rejected before any upstream call.
pub fn extract_legacy_key(headers: &HeaderMap) -> Result<String, AppError> {
    let header = headers.get(LEGACY_KEY_HEADER).ok_or_else(|| {
        AppError::BadRequest(
            "API key not found. Send your API key in the X-API-Key header".to_string(),
        )
    })?;

    let value = header
        .to_str()
        .map_err(|_| AppError::BadRequest("Invalid X-API-Key header encoding".to_string()))?
        .trim();

    if value.is_empty() {
        return Err(AppError::BadRequest("X-API-Key header is empty".to_string()));
    }

    Ok(value.to_string())
}
