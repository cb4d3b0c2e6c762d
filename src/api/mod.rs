pub mod chat;
pub mod exec;
pub mod health;
pub mod keys;

use axum::Router;
use axum::routing::{get, post};

use crate::AppState;

/// Build the API router.
///
/// Route layout:
/// ```text
/// /                  GET   service descriptor
/// /api/health        GET   liveness
/// /api/chat          POST  multi-provider chat with fallback (X-<Provider>-Key headers)
/// /api/groq/chat     POST  legacy Groq relay (X-API-Key header)
/// /api/exec          POST  shell-exec collaborator (disabled unless configured)
/// ```
pub fn build_api_router() -> Router<AppState> {
    Router::new()
        .route("/", get(health::home))
        .route("/api/health", get(health::health_check))
        .route("/api/chat", post(chat::chat))
        .route("/api/groq/chat", post(chat::groq_chat))
        .route("/api/exec", post(exec::exec_command))
}
