//! Settings sections of the server configuration
//!
//! Each struct maps to one TOML table of `server.toml`. Every field has a
//! default, so a partial file (or no file at all) is always valid.
//!
//! # Main Types
//!
//! - [`ServerSettings`] - HTTP listener
//! - [`StoreSettings`] - Ring buffer size and query defaults
//! - [`StreamSettings`] - Live-push polling
//! - [`TwinSettings`] - Track geometry and view of the digital twin
//! - [`LoggingSettings`] - Log filter and optional rolling file
//! - [`SimulatorSettings`] - Built-in synthetic robot

use crate::simulator::OffsetPattern;
use crate::store::DEFAULT_CAPACITY;
use crate::twin::camera::{DEFAULT_VIEW_HEIGHT, DEFAULT_VIEW_WIDTH};
use crate::twin::path::{DEFAULT_CORNER_RADIUS, DEFAULT_PROGRESS_STEP, DEFAULT_TRACK_SIZE};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default listen address
pub const DEFAULT_BIND: &str = "0.0.0.0:3000";

/// Default number of records returned by a history query without `count`
pub const DEFAULT_HISTORY_COUNT: usize = 10;

/// Default live-push poll interval in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Default lateral offset per unit of steering error
pub const DEFAULT_DEVIATION_SCALE: f64 = 4.0;

/// Default log filter when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "info,linetrace_telemetry=debug";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Socket address to listen on
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Maximum number of records kept in memory
    pub capacity: usize,
    /// Records returned by `GET /api/telemetry` without `count`
    pub default_history_count: usize,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            default_history_count: DEFAULT_HISTORY_COUNT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSettings {
    pub poll_interval_ms: u64,
}

impl StreamSettings {
    /// Poll interval, never shorter than one millisecond
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

/// Digital twin geometry and view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TwinSettings {
    /// Side length of the rounded-square track
    pub track_size: f64,
    /// Corner radius of the track
    pub corner_radius: f64,
    /// Screen offset per unit of steering error
    pub deviation_scale: f64,
    /// Walker progress added per frame
    pub progress_step: f64,
    pub view_width: f64,
    pub view_height: f64,
}

impl Default for TwinSettings {
    fn default() -> Self {
        Self {
            track_size: DEFAULT_TRACK_SIZE,
            corner_radius: DEFAULT_CORNER_RADIUS,
            deviation_scale: DEFAULT_DEVIATION_SCALE,
            progress_step: DEFAULT_PROGRESS_STEP,
            view_width: DEFAULT_VIEW_WIDTH,
            view_height: DEFAULT_VIEW_HEIGHT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing` filter directive used when `RUST_LOG` is unset
    pub filter: String,
    /// Directory for a daily-rotated log file; console only when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorSettings {
    /// Feed synthetic records into the store
    pub enabled: bool,
    /// Time between synthetic records in milliseconds
    pub interval_ms: u64,
    /// How the simulated line drifts under the robot
    pub pattern: OffsetPattern,
}

impl SimulatorSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_ms: 100,
            pattern: OffsetPattern::default(),
        }
    }
}
