use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::providers::registry::ProviderId;

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "llm-relay.toml";

// ---------------------------------------------------------------------------
// Main configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub exec: ExecConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins. Empty means any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProvidersConfig {
    /// Per-call timeout for every provider.
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
    /// Optional budget for a whole fallback sweep.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_secs: Option<u64>,
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groq: Option<ProviderOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini: Option<ProviderOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openrouter: Option<ProviderOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub together: Option<ProviderOverride>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_provider_timeout(),
            deadline_secs: None,
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            groq: None,
            gemini: None,
            openrouter: None,
            together: None,
        }
    }
}

impl ProvidersConfig {
    pub fn override_for(&self, id: ProviderId) -> Option<&ProviderOverride> {
        match id {
            ProviderId::Groq => self.groq.as_ref(),
            ProviderId::Gemini => self.gemini.as_ref(),
            ProviderId::OpenRouter => self.openrouter.as_ref(),
            ProviderId::Together => self.together.as_ref(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }
}

/// Endpoint and/or model replacement for one built-in provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProviderOverride {
    /// May contain a `{model}` placeholder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExecConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_exec_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_shell")]
    pub shell: String,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_secs: default_exec_timeout(),
            shell: default_shell(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
    /// Log message counts and provider order at debug level.
    #[serde(default)]
    pub log_content: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            log_content: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_port() -> u16 {
    5000
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
const fn default_provider_timeout() -> u64 {
    60
}
const fn default_temperature() -> f32 {
    0.7
}
const fn default_max_tokens() -> u32 {
    1500
}
const fn default_exec_timeout() -> u64 {
    30
}
fn default_shell() -> String {
    "sh".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

// ---------------------------------------------------------------------------
// Config loading and env overrides
// ---------------------------------------------------------------------------

/// Where the base configuration came from, before env overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    File,
    Defaults,
}

/// Result of [`Config::load`].
///
/// Nothing is logged while loading since tracing is configured from the
/// result; the caller reports `source` and `ignored_overrides` afterwards.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: Config,
    pub source: ConfigSource,
    /// `(variable, value)` pairs that failed to parse.
    pub ignored_overrides: Vec<(String, String)>,
}

impl Config {
    /// Load configuration from a TOML file, then apply environment variable
    /// overrides. A missing file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<LoadedConfig> {
        let (mut config, source) = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config = toml::from_str::<Config>(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {e}", path.display()))?;
            (config, ConfigSource::File)
        } else {
            (Self::default(), ConfigSource::Defaults)
        };
        let ignored_overrides = config.apply_env_overrides();
        config.validate()?;
        Ok(LoadedConfig {
            config,
            source,
            ignored_overrides,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Reject values that would make every request fail.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.providers.timeout_secs == 0 {
            anyhow::bail!("providers.timeout_secs must be greater than zero");
        }
        if self.providers.deadline_secs == Some(0) {
            anyhow::bail!("providers.deadline_secs must be greater than zero when set");
        }
        if !(0.0..=2.0).contains(&self.providers.default_temperature) {
            anyhow::bail!("providers.default_temperature must be between 0 and 2");
        }
        if self.exec.enabled && self.exec.timeout_secs == 0 {
            anyhow::bail!("exec.timeout_secs must be greater than zero");
        }
        Ok(())
    }

    /// Apply `RELAY_*` overrides (and `PORT`) from the process environment.
    pub fn apply_env_overrides(&mut self) -> Vec<(String, String)> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides using an arbitrary variable lookup.
    ///
    /// Unparseable numeric values leave the field unchanged and are returned
    /// as `(variable, value)`. `PORT` is applied last so it wins over
    /// `RELAY_SERVER_PORT` and the file.
    pub fn apply_overrides_from<F>(&mut self, get: F) -> Vec<(String, String)>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut ignored = Vec::new();

        // -- Helpers (macros for concise per-field overrides) --

        macro_rules! env_str {
            ($env:expr, $field:expr) => {
                if let Some(val) = get($env) {
                    $field = val;
                }
            };
        }
        macro_rules! env_bool {
            ($env:expr, $field:expr) => {
                if let Some(val) = get($env) {
                    $field = matches!(val.to_lowercase().as_str(), "1" | "true" | "yes" | "on");
                }
            };
        }
        macro_rules! env_parse {
            ($env:expr, $field:expr) => {
                if let Some(val) = get($env) {
                    match val.trim().parse() {
                        Ok(parsed) => $field = parsed,
                        Err(_) => ignored.push(($env.to_string(), val)),
                    }
                }
            };
        }

        // -- Server --
        env_str!("RELAY_SERVER_HOST", self.server.host);
        env_parse!("RELAY_SERVER_PORT", self.server.port);
        if let Some(val) = get("RELAY_SERVER_CORS_ORIGINS") {
            self.server.cors_origins = val
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // -- Providers --
        env_parse!("RELAY_PROVIDERS_TIMEOUT", self.providers.timeout_secs);
        if let Some(val) = get("RELAY_PROVIDERS_DEADLINE") {
            if val.trim().is_empty() {
                self.providers.deadline_secs = None;
            } else {
                match val.trim().parse() {
                    Ok(secs) => self.providers.deadline_secs = Some(secs),
                    Err(_) => ignored.push(("RELAY_PROVIDERS_DEADLINE".to_string(), val)),
                }
            }
        }

        // -- Exec --
        env_bool!("RELAY_EXEC_ENABLED", self.exec.enabled);
        env_parse!("RELAY_EXEC_TIMEOUT", self.exec.timeout_secs);

        // -- Logging --
        env_str!("RELAY_LOG_LEVEL", self.logging.level);
        env_bool!("RELAY_LOG_JSON", self.logging.json);
        env_bool!("RELAY_LOG_CONTENT", self.logging.log_content);

        env_parse!("PORT", self.server.port);

        ignored
    }
}
