//! Application configuration loaded from environment variables.

use std::path::PathBuf;

use serde::Deserialize;
use strum::{Display, EnumString};

use crate::api::RESERVED_PATHS;
use crate::error::ServiceError;

/// Which counter store implementation backs the endpoint.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Deserialize, Display, EnumString, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StoreBackend {
    /// SQLite file, survives restarts.
    Sqlite,
    /// Process-local map, lost on exit.
    Memory,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Counter ===
    /// Name of the single counter this endpoint increments.
    #[serde(default = "default_counter_name")]
    pub counter_name: String,

    /// Path the counter endpoint is mounted on.
    #[serde(default = "default_endpoint_path")]
    pub endpoint_path: String,

    // === Store ===
    /// Store implementation.
    #[serde(default = "default_store_backend")]
    pub store_backend: StoreBackend,

    /// SQLite database file for the durable backend.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Upper bound on a single store call, in milliseconds.
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,

    // === Server Configuration ===
    /// HTTP server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Log output format.
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
}

fn default_counter_name() -> String {
    "site_visits".to_string()
}

fn default_endpoint_path() -> String {
    "/".to_string()
}

fn default_store_backend() -> StoreBackend {
    StoreBackend::Sqlite
}

fn default_database_path() -> PathBuf {
    PathBuf::from("visitor-count.db")
}

fn default_store_timeout_ms() -> u64 {
    3000
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Text
}

impl Default for Config {
    fn default() -> Self {
        Self {
            counter_name: default_counter_name(),
            endpoint_path: default_endpoint_path(),
            store_backend: default_store_backend(),
            database_path: default_database_path(),
            store_timeout_ms: default_store_timeout_ms(),
            port: default_port(),
            rust_log: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> crate::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Build configuration from `(NAME, value)` pairs.
    pub fn from_vars<I>(vars: I) -> crate::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Ok(envy::from_iter(vars)?)
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.counter_name.trim().is_empty() {
            return Err(ServiceError::Invalid(
                "COUNTER_NAME must not be empty".to_string(),
            ));
        }

        if !self.endpoint_path.starts_with('/') {
            return Err(ServiceError::Invalid(
                "ENDPOINT_PATH must start with /".to_string(),
            ));
        }

        if RESERVED_PATHS.contains(&self.endpoint_path.as_str()) {
            return Err(ServiceError::Invalid(format!(
                "ENDPOINT_PATH {} is reserved",
                self.endpoint_path
            )));
        }

        if self.store_timeout_ms == 0 {
            return Err(ServiceError::Invalid(
                "STORE_TIMEOUT_MS must be greater than 0".to_string(),
            ));
        }

        if self.store_backend == StoreBackend::Sqlite
            && self.database_path.as_os_str().is_empty()
        {
            return Err(ServiceError::Invalid(
                "DATABASE_PATH is required for the sqlite backend".to_string(),
            ));
        }

        Ok(())
    }

    /// Store call timeout as a `Duration`.
    pub fn store_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.store_timeout_ms)
    }
}
