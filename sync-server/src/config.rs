//! Configuration loading for marksync-server.
//!
//! Configuration is loaded from a TOML file (default: `marksync.toml`).
//! Every field has a default, so an empty file or a missing section is valid.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "marksync.toml";

/// Root configuration for marksync-server.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Sync service policy.
    #[serde(default)]
    pub service: ServiceConfig,
    /// HTTP endpoints configuration.
    #[serde(default)]
    pub http: HttpConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the HTTP listener (default: 0.0.0.0:8080).
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

/// Which storage engine backs the collection store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    /// SQLite database file.
    #[default]
    Sqlite,
    /// Process memory; contents are lost on restart.
    Memory,
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Storage engine (default: sqlite).
    #[serde(default)]
    pub backend: StorageBackendKind,
    /// Path to SQLite database file.
    #[serde(default = "default_database_path")]
    pub database: PathBuf,
    /// Maximum pooled SQLite connections (default: 10).
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// How long a writer waits on a locked database, in seconds (default: 5).
    #[serde(default = "default_busy_timeout_secs")]
    pub busy_timeout_secs: u64,
}

/// Sync service policy.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Whether new collections may be created (default: true).
    #[serde(default = "default_accept_new_collections")]
    pub accept_new_collections: bool,
    /// Largest accepted payload in bytes (default: 512 KiB).
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
    /// Operator message returned by `/info`.
    #[serde(default)]
    pub message: String,
    /// Deadline for each storage operation in seconds (default: none).
    pub request_timeout_secs: Option<u64>,
}

impl ServiceConfig {
    /// The per-operation deadline, if one is configured.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// HTTP endpoints configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Enable metrics endpoint (default: true).
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
    /// Allow cross-origin requests (default: true).
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence (default: info).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Directory for daily-rolling log files. Logs go to stdout when unset.
    pub directory: Option<PathBuf>,
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("marksync.db")
}

fn default_max_connections() -> u32 {
    10
}

fn default_busy_timeout_secs() -> u64 {
    5
}

fn default_accept_new_collections() -> bool {
    true
}

fn default_max_payload_bytes() -> usize {
    512 * 1024 // 512 KiB
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendKind::default(),
            database: default_database_path(),
            max_connections: default_max_connections(),
            busy_timeout_secs: default_busy_timeout_secs(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            accept_new_collections: default_accept_new_collections(),
            max_payload_bytes: default_max_payload_bytes(),
            message: String::new(),
            request_timeout_secs: None,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: default_true(),
            cors_enabled: default_true(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Load configuration for startup.
    ///
    /// An explicitly given path must exist. Without one, `marksync.toml` in
    /// the working directory is used when present, built-in defaults otherwise.
    pub fn load(explicit: Option<&std::path::Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let path = std::path::Path::new(DEFAULT_CONFIG_PATH);
                if path.exists() {
                    Self::from_file(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}
