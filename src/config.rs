//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and `IRONLOG_*` environment overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::analytics::units::{LengthUnit, MassUnit};
use crate::local::DEFAULT_QUOTA_BYTES;
use crate::remote::{RestConfig, SyncConfig};
use crate::store::UnitSettings;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub units: UnitsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Local cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    #[serde(default = "default_cache_quota")]
    pub cache_quota_bytes: usize,
}

fn default_data_dir() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("ironlog").to_string_lossy().to_string())
        .unwrap_or_else(|| "./ironlog_data".to_string())
}

fn default_cache_quota() -> usize {
    DEFAULT_QUOTA_BYTES
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            cache_quota_bytes: default_cache_quota(),
        }
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Which document store the sync layer talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RemoteBackend {
    #[default]
    Memory,
    Rest,
}

impl std::str::FromStr for RemoteBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(RemoteBackend::Memory),
            "rest" => Ok(RemoteBackend::Rest),
            other => Err(format!("unknown remote backend: {}", other)),
        }
    }
}

/// Remote document store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    #[serde(default)]
    pub backend: RemoteBackend,

    #[serde(default = "default_remote_url")]
    pub base_url: String,

    #[serde(default = "default_project_id")]
    pub project_id: String,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_migrate")]
    pub migrate_local_data: bool,
}

fn default_remote_url() -> String {
    "http://localhost:8088".to_string()
}

fn default_project_id() -> String {
    "ironlog".to_string()
}

fn default_poll_interval() -> u64 {
    5
}

fn default_migrate() -> bool {
    true
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            backend: RemoteBackend::default(),
            base_url: default_remote_url(),
            project_id: default_project_id(),
            poll_interval_secs: default_poll_interval(),
            migrate_local_data: default_migrate(),
        }
    }
}

impl RemoteConfig {
    pub fn rest_config(&self, request_timeout_secs: u64) -> RestConfig {
        RestConfig {
            base_url: self.base_url.clone(),
            project_id: self.project_id.clone(),
            poll_interval: Duration::from_secs(self.poll_interval_secs.max(1)),
            request_timeout: Duration::from_secs(request_timeout_secs.max(1)),
        }
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            migrate_local_data: self.migrate_local_data,
        }
    }
}

/// Units used until the user picks their own
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnitsConfig {
    #[serde(default)]
    pub mass: MassUnit,

    #[serde(default)]
    pub length: LengthUnit,
}

impl UnitsConfig {
    pub fn settings(&self) -> UnitSettings {
        UnitSettings {
            mass: self.mass,
            length: self.length,
            updated_at: 0,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("ironlog").join("config.toml")),
            Some(PathBuf::from("/etc/ironlog/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply `IRONLOG_*` overrides looked up through `var`
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // Storage overrides
        if let Some(data_dir) = var("IRONLOG_DATA_DIR") {
            self.storage.data_dir = data_dir;
        }
        if let Some(quota) = var("IRONLOG_CACHE_QUOTA_BYTES").and_then(|v| v.parse().ok()) {
            self.storage.cache_quota_bytes = quota;
        }

        // API overrides
        if let Some(host) = var("IRONLOG_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = var("IRONLOG_API_PORT").and_then(|v| v.parse().ok()) {
            self.api.port = port;
        }

        // Remote overrides
        if let Some(backend) = var("IRONLOG_REMOTE_BACKEND") {
            match backend.parse() {
                Ok(backend) => self.remote.backend = backend,
                Err(e) => tracing::warn!("Ignoring IRONLOG_REMOTE_BACKEND: {}", e),
            }
        }
        if let Some(url) = var("IRONLOG_REMOTE_URL") {
            self.remote.base_url = url;
        }
        if let Some(project) = var("IRONLOG_REMOTE_PROJECT") {
            self.remote.project_id = project;
        }

        // Logging overrides
        if let Some(level) = var("IRONLOG_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("IRONLOG_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# IronLog Configuration
#
# Environment variables override these settings:
# - IRONLOG_DATA_DIR
# - IRONLOG_CACHE_QUOTA_BYTES
# - IRONLOG_API_HOST
# - IRONLOG_API_PORT
# - IRONLOG_REMOTE_BACKEND
# - IRONLOG_REMOTE_URL
# - IRONLOG_REMOTE_PROJECT
# - IRONLOG_LOG_LEVEL
# - IRONLOG_LOG_FORMAT

[storage]
# Directory holding the offline cache (cache.db)
data_dir = "~/.local/share/ironlog"

# Cache size limit; exceeding it clears the cache and retries once
cache_quota_bytes = 5242880

[api]
# API server host
host = "0.0.0.0"

# API server port
port = 8090

# Allowed CORS origins (empty = any)
cors_origins = []

# Request timeout in seconds
request_timeout_secs = 30

[remote]
# Document store: "memory" (in-process) or "rest"
backend = "memory"

# REST document API location
base_url = "http://localhost:8088"
project_id = "ironlog"

# How often REST subscriptions poll (seconds)
poll_interval_secs = 5

# Copy the offline cache to the remote store on first sign-in
migrate_local_data = true

[units]
# Defaults until the user changes them: kg | lbs, cm | in
mass = "kg"
length = "cm"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
