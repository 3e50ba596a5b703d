//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use crate::api;
use crate::store::RestConfig;
use crate::task::{DecodePolicy, TaskOptions, DEFAULT_DATA_TABLE, DEFAULT_FAMILY, DEFAULT_MAX_ROWS};
use crate::tsdb::types::DEFAULT_UID_WIDTH;
use crate::tsdb::KeyLayout;
use crate::uid::DEFAULT_UID_TABLE;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub tables: TablesConfig,

    #[serde(default)]
    pub layout: LayoutConfig,

    #[serde(default)]
    pub task: TaskConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Store gateway configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_url")]
    pub url: String,

    #[serde(default = "default_store_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_scanner_batch")]
    pub scanner_batch: usize,
}

fn default_store_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_store_timeout() -> u64 {
    30
}

fn default_scanner_batch() -> usize {
    10_000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_store_url(),
            request_timeout_secs: default_store_timeout(),
            scanner_batch: default_scanner_batch(),
        }
    }
}

/// Table and column family names
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TablesConfig {
    #[serde(default = "default_data_table")]
    pub data: String,

    #[serde(default = "default_uid_table")]
    pub uid: String,

    #[serde(default = "default_family")]
    pub family: String,
}

fn default_data_table() -> String {
    DEFAULT_DATA_TABLE.to_string()
}

fn default_uid_table() -> String {
    DEFAULT_UID_TABLE.to_string()
}

fn default_family() -> String {
    DEFAULT_FAMILY.to_string()
}

impl Default for TablesConfig {
    fn default() -> Self {
        Self {
            data: default_data_table(),
            uid: default_uid_table(),
            family: default_family(),
        }
    }
}

/// Identifier widths of the row key
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LayoutConfig {
    #[serde(default = "default_uid_width")]
    pub metric_width: usize,

    #[serde(default = "default_uid_width")]
    pub tag_width: usize,
}

fn default_uid_width() -> usize {
    DEFAULT_UID_WIDTH
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            metric_width: default_uid_width(),
            tag_width: default_uid_width(),
        }
    }
}

/// Collection task limits
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TaskConfig {
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,

    #[serde(default)]
    pub decode_policy: DecodePolicy,
}

fn default_max_rows() -> usize {
    DEFAULT_MAX_ROWS
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            max_rows: default_max_rows(),
            decode_policy: DecodePolicy::default(),
        }
    }
}

/// API server configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    42421
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
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

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
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

    /// Load the first config file found in the default locations, or fall
    /// back to defaults with environment overrides when there is none.
    ///
    /// A file that exists but cannot be loaded is an error.
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load_first(&search_paths())
    }

    fn load_first(paths: &[PathBuf]) -> Result<Self, ConfigError> {
        match paths.iter().find(|path| path.exists()) {
            Some(path) => {
                let config = Self::load_with_env(path)?;
                tracing::info!("Loaded config from {:?}", path);
                Ok(config)
            }
            None => {
                tracing::info!("Using default config with environment overrides");
                Ok(Self::from_env())
            }
        }
    }

    /// Check values the decoder and store client cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.layout.metric_width == 0 {
            return Err(ConfigError::Invalid("layout.metric_width must be at least 1".to_string()));
        }
        if self.layout.tag_width == 0 {
            return Err(ConfigError::Invalid("layout.tag_width must be at least 1".to_string()));
        }
        if self.task.max_rows == 0 {
            return Err(ConfigError::Invalid("task.max_rows must be at least 1".to_string()));
        }
        if self.store.scanner_batch == 0 {
            return Err(ConfigError::Invalid("store.scanner_batch must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Store client settings
    pub fn rest_config(&self) -> RestConfig {
        RestConfig {
            base_url: self.store.url.clone(),
            request_timeout_ms: self.store.request_timeout_secs.saturating_mul(1000),
            scanner_batch: self.store.scanner_batch,
        }
    }

    /// Options for every collection task
    pub fn task_options(&self) -> TaskOptions {
        TaskOptions {
            data_table: self.tables.data.clone(),
            family: self.tables.family.clone(),
            uid_table: self.tables.uid.clone(),
            max_rows: self.task.max_rows,
            layout: KeyLayout::new(self.layout.metric_width, self.layout.tag_width),
            decode_policy: self.task.decode_policy,
        }
    }

    /// HTTP server settings
    pub fn server_config(&self) -> api::ApiConfig {
        api::ApiConfig {
            host: self.api.host.clone(),
            port: self.api.port,
            cors_origins: self.api.cors_origins.clone(),
        }
    }

    /// Apply environment variable overrides to an existing config
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("HYPERION_STORE_URL") {
            self.store.url = url;
        }

        if let Some(host) = var("HYPERION_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = var("HYPERION_API_PORT") {
            match port.parse() {
                Ok(p) => self.api.port = p,
                Err(_) => tracing::warn!("Ignoring invalid HYPERION_API_PORT {:?}", port),
            }
        }

        if let Some(level) = var("HYPERION_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("HYPERION_LOG_FORMAT") {
            self.logging.format = format;
        }

        if let Some(policy) = var("HYPERION_DECODE_POLICY") {
            match policy.parse() {
                Ok(p) => self.task.decode_policy = p,
                Err(e) => tracing::warn!("Ignoring HYPERION_DECODE_POLICY: {}", e),
            }
        }
    }
}

/// Config file locations, in lookup order
pub fn search_paths() -> Vec<PathBuf> {
    [
        dirs::config_dir().map(|p| p.join("hyperion").join("config.toml")),
        Some(PathBuf::from("/etc/hyperion/config.toml")),
        Some(PathBuf::from("./config.toml")),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Hyperion Configuration
#
# Environment variables override these settings:
# - HYPERION_STORE_URL
# - HYPERION_API_HOST
# - HYPERION_API_PORT
# - HYPERION_LOG_LEVEL
# - HYPERION_LOG_FORMAT
# - HYPERION_DECODE_POLICY

[store]
# HBase REST gateway
url = "http://127.0.0.1:8080"

# Per-request timeout in seconds
request_timeout_secs = 30

# Rows requested per scanner batch
scanner_batch = 10000

[tables]
# OpenTSDB data table
data = "tsdb"

# OpenTSDB uid table
uid = "tsdb-uid"

# Data column family
family = "t"

[layout]
# Width in bytes of metric ids
metric_width = 3

# Width in bytes of tag key and tag value ids
tag_width = 3

[task]
# Upper bound on rows fetched per metric and day
max_rows = 10000000

# What to do with undecodable rows: fail_fast or skip
decode_policy = "fail_fast"

[api]
# API server host
host = "0.0.0.0"

# API server port
port = 42421

# Allowed CORS origins (empty allows any)
cors_origins = []

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config_file_matches_defaults() {
        let parsed: Config = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[store]
url = "http://hbase:8080"

[layout]
metric_width = 4

[task]
decode_policy = "skip"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.store.url, "http://hbase:8080");
        assert_eq!(config.store.request_timeout_secs, 30);
        assert_eq!(config.layout.metric_width, 4);
        assert_eq!(config.layout.tag_width, 3);
        assert_eq!(config.task.decode_policy, DecodePolicy::Skip);
        assert_eq!(config.api.port, 42421);

        let options = config.task_options();
        assert_eq!(options.layout, KeyLayout::new(4, 3));
        assert_eq!(options.data_table, "tsdb");
        assert_eq!(options.decode_policy, DecodePolicy::Skip);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("missing.toml");
        assert!(matches!(Config::load(&missing), Err(ConfigError::Io { .. })));

        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "[store\nurl = ").unwrap();
        assert!(matches!(Config::load(&broken), Err(ConfigError::Parse { .. })));

        let invalid = dir.path().join("invalid.toml");
        std::fs::write(&invalid, "[layout]\ntag_width = 0\n").unwrap();
        assert!(matches!(Config::load(&invalid), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_first_existing_path() {
        let dir = tempfile::tempdir().unwrap();
        let absent = dir.path().join("absent.toml");
        let present = dir.path().join("config.toml");
        std::fs::write(&present, "[tables]\ndata = \"tsdb-test\"\n").unwrap();

        let config = Config::load_first(&[absent.clone(), present]).unwrap();
        assert_eq!(config.tables.data, "tsdb-test");

        assert!(Config::load_first(&[absent]).is_ok());
    }

    #[test]
    fn test_load_first_reports_broken_file() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("config.toml");
        let fallback = dir.path().join("fallback.toml");
        std::fs::write(&broken, "[store\nurl = ").unwrap();
        std::fs::write(&fallback, "").unwrap();

        let result = Config::load_first(&[broken, fallback]);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("HYPERION_STORE_URL", "http://gateway:9000"),
            ("HYPERION_API_PORT", "8000"),
            ("HYPERION_LOG_FORMAT", "json"),
            ("HYPERION_DECODE_POLICY", "skip"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.store.url, "http://gateway:9000");
        assert_eq!(config.api.port, 8000);
        assert_eq!(config.api.host, "0.0.0.0");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.task.decode_policy, DecodePolicy::Skip);
    }

    #[test]
    fn test_invalid_overrides_are_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            "HYPERION_API_PORT" => Some("not-a-port".to_string()),
            "HYPERION_DECODE_POLICY" => Some("sometimes".to_string()),
            _ => None,
        });

        assert_eq!(config.api.port, 42421);
        assert_eq!(config.task.decode_policy, DecodePolicy::FailFast);
    }

    #[test]
    fn test_rest_config() {
        let config = Config::default();
        let rest = config.rest_config();
        assert_eq!(rest.base_url, "http://127.0.0.1:8080");
        assert_eq!(rest.request_timeout_ms, 30_000);
        assert_eq!(rest.scanner_batch, 10_000);
    }
}
