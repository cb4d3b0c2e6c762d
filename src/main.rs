//! llm-relay -- chat-completion relay with caller-supplied provider keys.
//!
//! Entry point. Wires together:
//!   - Configuration loading (file + `RELAY_*` / `PORT` overrides)
//!   - Tracing initialization
//!   - Provider registry, transport and dispatcher
//!   - HTTP server with CORS, request ids and request tracing
//!   - Graceful shutdown on SIGTERM / SIGINT

use std::path::PathBuf;

use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use llm_relay::config::{Config, ConfigSource, DEFAULT_CONFIG_FILE, LoadedConfig};
use llm_relay::{AppState, build_app};

// ---------------------------------------------------------------------------
// CLI argument parsing (minimal, no clap dependency)
// ---------------------------------------------------------------------------

struct CliArgs {
    config_path: Option<PathBuf>,
}

fn parse_args() -> CliArgs {
    let mut args = std::env::args().skip(1);
    let mut config_path = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                if let Some(path) = args.next() {
                    config_path = Some(PathBuf::from(path));
                } else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("llm-relay {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                eprintln!("Run with --help for usage information.");
                std::process::exit(1);
            }
        }
    }

    CliArgs { config_path }
}

fn print_usage() {
    println!(
        "\
llm-relay {version} -- Chat-completion relay with provider fallback

USAGE:
    llm-relay [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Path to configuration file [default: {default_config}]
    -h, --help             Print this help message
    -V, --version          Print version information

ENVIRONMENT:
    RUST_LOG               Override log filter (e.g. RUST_LOG=debug)
    RELAY_CONFIG           Alternative to --config flag
    PORT                   Listening port, overrides everything else
    RELAY_*                Per-setting overrides (see README)
",
        version = env!("CARGO_PKG_VERSION"),
        default_config = DEFAULT_CONFIG_FILE,
    );
}

/// `--config` wins over `RELAY_CONFIG`, which wins over the default file.
fn resolve_config_path(cli: Option<PathBuf>, env: Option<String>) -> PathBuf {
    cli.or_else(|| env.filter(|s| !s.is_empty()).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Parse CLI arguments
    let cli = parse_args();
    let config_path = resolve_config_path(cli.config_path, std::env::var("RELAY_CONFIG").ok());

    // 2. Load configuration
    let LoadedConfig {
        config,
        source,
        ignored_overrides,
    } = Config::load(&config_path)?;

    // 3. Initialize tracing/logging
    init_tracing(&config);

    if source == ConfigSource::Defaults {
        tracing::warn!(config = %config_path.display(), "Config file not found, using defaults");
    }
    for (var, value) in &ignored_overrides {
        tracing::warn!(var = %var, value = %value, "Ignoring unparseable override");
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        "Starting llm-relay"
    );

    // 4. Build shared application state
    let state = AppState::from_config(config.clone())?;
    for spec in state.dispatcher.registry().specs() {
        tracing::debug!(provider = %spec.id, model = %spec.model, endpoint = %spec.url(), "Provider registered");
    }
    if state.exec.is_some() {
        tracing::warn!(shell = %config.exec.shell, "Shell exec endpoint is ENABLED");
    }

    // 5. Build the router
    let app = build_app(state);

    // 6. Bind and serve
    let listen_addr = config.listen_addr();
    let listener = TcpListener::bind(&listen_addr).await?;
    tracing::info!(addr = %listen_addr, "Listening");

    println!();
    println!("  llm-relay v{} is running", env!("CARGO_PKG_VERSION"));
    println!("  Chat:    http://{listen_addr}/api/chat");
    println!("  Health:  http://{listen_addr}/api/health");
    println!();

    // 7. Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down gracefully");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tracing initialization
// ---------------------------------------------------------------------------

/// Set up the tracing subscriber based on configuration.
fn init_tracing(config: &Config) {
    // RUST_LOG env var takes precedence over config file
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(&config.logging.level)));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if config.logging.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// This crate and tower_http at the configured level, dependencies at warn.
fn default_filter(level: &str) -> String {
    format!("llm_relay={level},tower_http={level},warn")
}

// ---------------------------------------------------------------------------
// Graceful shutdown
// ---------------------------------------------------------------------------

/// Wait for a shutdown signal (SIGTERM or SIGINT / Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl+C)");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
