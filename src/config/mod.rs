//! Typed configuration.
//!
//! Process-level settings come from environment variables; the dispatch
//! setup (roster, capacity, deadline) comes from an optional TOML file with
//! defaults for every field.

pub mod dispatch;

pub use dispatch::DispatchConfig;

use crate::error::{Error, Result};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub otel_endpoint: Option<String>,
    pub log_level: String,
    /// Path to a dispatch TOML file, if any.
    pub dispatch_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        let log_level = optional_var("LOG_LEVEL")?.unwrap_or_else(|| "info".to_string());
        if log_level.trim().is_empty() {
            return Err(Error::Config("LOG_LEVEL must not be empty".to_string()));
        }
        Ok(Self {
            otel_endpoint: optional_var("OTEL_ENDPOINT")?,
            log_level,
            dispatch_path: optional_var("DISPATCHQ_CONFIG")?.map(PathBuf::from),
        })
    }

    /// Load the dispatch config named by `DISPATCHQ_CONFIG`, or defaults.
    pub fn dispatch(&self) -> Result<DispatchConfig> {
        match self.dispatch_path {
            Some(ref path) => DispatchConfig::load(path),
            None => Ok(DispatchConfig::default()),
        }
    }
}

fn optional_var(name: &str) -> Result<Option<String>> {
    match std::env::var(name) {
        Ok(value) => Ok(Some(value)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => Err(Error::Config(format!(
            "environment variable {name} is not valid unicode"
        ))),
    }
}
