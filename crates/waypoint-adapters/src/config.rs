//! Configuration management for waypoint
//!
//! Settings live in `~/.config/waypoint/config.toml` (or a path given on the
//! command line) and are overlaid by environment variables. The upstream
//! credential is only ever read from the environment.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable holding the upstream credential.
pub const API_KEY_ENV: &str = "CEREBRAS_API_KEY";
/// Overrides `upstream.base_url`.
pub const UPSTREAM_URL_ENV: &str = "WAYPOINT_UPSTREAM_URL";
/// Overrides `server.bind`.
pub const BIND_ENV: &str = "WAYPOINT_BIND";

const DEFAULT_BIND: &str = "127.0.0.1:3000";
const DEFAULT_BODY_LIMIT_KB: usize = 16;
const DEFAULT_UPSTREAM_URL: &str = "https://api.cerebras.ai/v1";
const DEFAULT_MODEL: &str = "llama-3.3-70b";
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_MAX_COMPLETION_TOKENS: u32 = 4000;
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_WINDOW_SECS: u64 = 60;
const DEFAULT_MAX_REQUESTS: usize = 5;
const DEFAULT_IDLE_WINDOWS: u32 = 10;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Whether generation goes to the upstream service or the offline mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Live,
    Mock,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Live => "live",
            Mode::Mock => "mock",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub body_limit_kb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            body_limit_kb: DEFAULT_BODY_LIMIT_KB,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_completion_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_UPSTREAM_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_completion_tokens: DEFAULT_MAX_COMPLETION_TOKENS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub window_secs: u64,
    pub max_requests: usize,
    /// Entries idle for this many windows are evicted by the sweeper.
    pub idle_windows: u32,
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: DEFAULT_WINDOW_SECS,
            max_requests: DEFAULT_MAX_REQUESTS,
            idle_windows: DEFAULT_IDLE_WINDOWS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Hosts accepted as official documentation on top of the built-in list.
    pub extra_doc_hosts: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub rate_limit: RateLimitConfig,
    pub validation: ValidationConfig,
    /// Upstream credential. Environment only.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Config {
    fn sanitize(&mut self) {
        let defaults = Config::default();
        if self.server.bind.trim().is_empty() {
            self.server.bind = defaults.server.bind;
        }
        if self.server.body_limit_kb == 0 {
            self.server.body_limit_kb = defaults.server.body_limit_kb;
        }
        if self.upstream.base_url.trim().is_empty() {
            self.upstream.base_url = defaults.upstream.base_url;
        }
        self.upstream.base_url = self.upstream.base_url.trim_end_matches('/').to_string();
        if self.upstream.model.trim().is_empty() {
            self.upstream.model = defaults.upstream.model;
        }
        if !(0.0..=2.0).contains(&self.upstream.temperature) {
            self.upstream.temperature = defaults.upstream.temperature;
        }
        if self.upstream.max_completion_tokens == 0 {
            self.upstream.max_completion_tokens = defaults.upstream.max_completion_tokens;
        }
        if self.upstream.timeout_secs == 0 {
            self.upstream.timeout_secs = defaults.upstream.timeout_secs;
        }
        if self.rate_limit.window_secs == 0 {
            self.rate_limit.window_secs = defaults.rate_limit.window_secs;
        }
        if self.rate_limit.max_requests == 0 {
            self.rate_limit.max_requests = defaults.rate_limit.max_requests;
        }
        if self.rate_limit.idle_windows == 0 {
            self.rate_limit.idle_windows = defaults.rate_limit.idle_windows;
        }
        if self.rate_limit.sweep_interval_secs == 0 {
            self.rate_limit.sweep_interval_secs = defaults.rate_limit.sweep_interval_secs;
        }
        self.api_key = self
            .api_key
            .take()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
    }

    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("waypoint"))
    }

    /// Get the default config file path
    pub fn default_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.toml"))
    }

    /// Load config from the default location, or return defaults.
    ///
    /// A corrupt default file is reported and ignored.
    pub fn load() -> Self {
        let mut config = match Self::default_path().filter(|p| p.exists()) {
            Some(path) => match Self::read_file(&path) {
                Ok(config) => config,
                Err(err) => {
                    tracing::warn!(error = %err, "ignoring unreadable config file, using defaults");
                    Self::default()
                }
            },
            None => Self::default(),
        };
        config.apply_env();
        config
    }

    /// Load config from an explicit path. Missing or invalid files are errors.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::read_file(path)?;
        config.apply_env();
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse config from TOML text. Environment is not consulted.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        let mut config: Config = toml::from_str(content)?;
        config.sanitize();
        Ok(config)
    }

    /// Overlay values from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary variable lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(API_KEY_ENV) {
            self.api_key = Some(key);
        }
        if let Some(url) = lookup(UPSTREAM_URL_ENV) {
            self.upstream.base_url = url;
        }
        if let Some(bind) = lookup(BIND_ENV) {
            self.server.bind = bind;
        }
        self.sanitize();
    }

    /// Live when a credential is configured, mock otherwise.
    pub fn mode(&self) -> Mode {
        if self.api_key.is_some() {
            Mode::Live
        } else {
            Mode::Mock
        }
    }

    /// Get the config file location for display
    pub fn config_location() -> String {
        Self::default_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "~/.config/waypoint/config.toml".to_string())
    }
}
