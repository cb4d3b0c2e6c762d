pub mod api;
pub mod config;
pub mod error;
pub mod exec;
pub mod providers;

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::exec::CommandRunner;
use crate::providers::{DispatchSettings, Dispatcher, HttpTransport, ProviderRegistry, Transport};

/// Shared application state accessible from all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub dispatcher: Arc<Dispatcher>,
    /// `None` when `exec.enabled` is false.
    pub exec: Option<Arc<CommandRunner>>,
}

impl AppState {
    /// Production state: registry from config, reqwest transport.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        Self::with_transport(config, Arc::new(HttpTransport::new()))
    }

    /// State with a caller-chosen transport.
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> anyhow::Result<Self> {
        let registry = ProviderRegistry::from_config(&config.providers)?;
        let dispatcher = Dispatcher::new(
            Arc::new(registry),
            transport,
            DispatchSettings::from_config(&config),
        );
        let exec = CommandRunner::from_config(&config.exec).map(Arc::new);
        Ok(Self {
            config: Arc::new(config),
            dispatcher: Arc::new(dispatcher),
            exec,
        })
    }
}

/// Build the application router with all middleware layers.
pub fn build_app(state: AppState) -> Router {
    // -- CORS layer -----------------------------------------------------------
    let cors = build_cors_layer(&state.config);

    // -- Request ID layer (X-Request-ID) --------------------------------------
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // -- Tracing layer --------------------------------------------------------
    let trace = TraceLayer::new_for_http();

    api::build_api_router()
        .layer(propagate_id)
        .layer(request_id)
        .layer(trace)
        .layer(cors)
        .with_state(state)
}

/// Build the CORS layer from config. Preflight requests are answered here.
pub fn build_cors_layer(config: &Config) -> CorsLayer {
    if config.server.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .server
            .cors_origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(origin) => Some(origin),
                Err(_) => {
                    tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
