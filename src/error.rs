//! Error handling for the line-tracer telemetry service
//!
//! This module defines custom error types and a Result alias for use
//! throughout the crate.

use thiserror::Error;

/// Main error type for telemetry operations
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// An ingest payload could not be turned into a telemetry record
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// The store has not received any record yet
    #[error("No data available")]
    NoData,

    /// A live-push data source failed to answer a poll
    #[error("Data source error: {0}")]
    Source(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<TelemetryError>,
    },
}

impl TelemetryError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        TelemetryError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping any context wrappers
    pub fn root(&self) -> &TelemetryError {
        match self {
            TelemetryError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<toml::ser::Error> for TelemetryError {
    fn from(err: toml::ser::Error) -> Self {
        TelemetryError::Serialization(err.to_string())
    }
}

/// Result type alias for telemetry operations
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Extension trait for adding context to Results
///
/// Works on any result whose error converts into [`TelemetryError`], so IO
/// calls can be wrapped without a manual `map_err`.
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<TelemetryError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}
