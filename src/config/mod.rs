//! Configuration module for the telemetry server
//!
//! The server reads one TOML file at startup. Every table and field is
//! optional; anything missing falls back to the defaults in [`settings`].
//!
//! # Config Location
//!
//! 1. The path in the `LINETRACE_CONFIG` environment variable, if set
//! 2. Otherwise the platform config directory:
//!    - **Linux**: `~/.config/dev.hxyulin.linetrace-telemetry/server.toml`
//!    - **macOS**: `~/Library/Application Support/dev.hxyulin.linetrace-telemetry/server.toml`
//!    - **Windows**: `%APPDATA%\dev.hxyulin.linetrace-telemetry\server.toml`
//!
//! # Example
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:3000"
//!
//! [store]
//! capacity = 100
//!
//! [stream]
//! poll_interval_ms = 500
//!
//! [simulator]
//! enabled = true
//! interval_ms = 100
//!
//! [simulator.pattern]
//! kind = "sine"
//! frequency = 0.25
//! amplitude = 5.0
//! offset = 0.0
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{Result, ResultExt, TelemetryError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for config directories
pub const APP_ID: &str = "dev.hxyulin.linetrace-telemetry";

/// Config filename inside the config directory
pub const CONFIG_FILE: &str = "server.toml";

/// Environment variable overriding the config path
pub const CONFIG_ENV_VAR: &str = "LINETRACE_CONFIG";

// ==================== Config Directory ====================

/// Get the application config directory path
pub fn app_config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID))
}

/// Resolve the config file path: env override first, then the config dir
pub fn config_path() -> Option<PathBuf> {
    match std::env::var_os(CONFIG_ENV_VAR) {
        Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
        _ => app_config_dir().map(|p| p.join(CONFIG_FILE)),
    }
}

// ==================== Server Config ====================

/// Complete server configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ServerSettings,
    pub store: StoreSettings,
    pub stream: StreamSettings,
    pub twin: TwinSettings,
    pub logging: LoggingSettings,
    pub simulator: SimulatorSettings,
}

impl ServerConfig {
    /// Load a config file; a missing file yields the defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;

        toml::from_str(&content).map_err(|e| {
            TelemetryError::Config(format!("Failed to parse config {:?}: {}", path, e))
        })
    }

    /// Load a config file, returning defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Load from [`config_path`], returning defaults on any error
    ///
    /// Returns the resolved path alongside the config so callers can log it.
    pub fn from_env() -> (Self, Option<PathBuf>) {
        match config_path() {
            Some(path) => (Self::load_or_default(&path), Some(path)),
            None => {
                tracing::warn!("Could not determine config directory, using defaults");
                (Self::default(), None)
            }
        }
    }

    /// Save the config as pretty TOML, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, content).with_context(|| format!("Failed to write config {:?}", path))
    }
}

// ==================== Tests ====================
