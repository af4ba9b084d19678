//! Core data types for the telemetry service
//!
//! This module contains the canonical telemetry record and the small value
//! types it is built from. Every accepted wire shape is normalized into these
//! types by [`crate::ingest`]; nothing past the ingestion boundary looks at
//! the raw payload again.
//!
//! # Main Types
//!
//! - [`SensorArray`] - The 8-channel binary optical sensor reading
//! - [`MotorState`] - Raw PWM magnitudes of the drive motors
//! - [`ControlState`] - Producer-computed steering diagnostics
//! - [`TelemetryRecord`] - One ingested sample
//! - [`IncrementalStats`] - Running count/sum/min/max used for aggregates
//!
//! # Sensor Convention
//!
//! Channel 0 is the leftmost sensor. A value of [`LINE_DETECTED`] (`0`) means
//! the sensor sees the black line, [`BACKGROUND`] (`1`) means it sees the
//! white floor.
//!
//! # Motor Scale
//!
//! Producers disagree on the PWM scale (0-255 and 0-65535 both occur), so
//! speeds are stored raw and unit-less.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Number of optical sensor channels on the robot
pub const SENSOR_CHANNELS: usize = 8;

/// Sensor value reported when the line (black) is under the channel
pub const LINE_DETECTED: u8 = 0;

/// Sensor value reported when the background (white) is under the channel
pub const BACKGROUND: u8 = 1;

/// An 8-channel binary sensor reading, index 0 = leftmost channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "[u8; 8]", into = "[u8; 8]")]
pub struct SensorArray([u8; SENSOR_CHANNELS]);

impl SensorArray {
    /// A reading where no channel sees the line
    pub const ALL_BACKGROUND: SensorArray = SensorArray([BACKGROUND; SENSOR_CHANNELS]);

    /// A reading where every channel sees the line
    pub const ALL_DETECTED: SensorArray = SensorArray([LINE_DETECTED; SENSOR_CHANNELS]);

    /// Create a reading, rejecting values other than 0 and 1
    pub fn new(values: [u8; SENSOR_CHANNELS]) -> Result<Self, String> {
        if let Some((idx, value)) = values
            .iter()
            .enumerate()
            .find(|(_, v)| **v != LINE_DETECTED && **v != BACKGROUND)
        {
            return Err(format!(
                "sensor channel {} has value {}, expected 0 or 1",
                idx, value
            ));
        }
        Ok(Self(values))
    }

    /// Create a reading from a slice that must contain exactly 8 channels
    pub fn from_slice(values: &[u8]) -> Result<Self, String> {
        let array: [u8; SENSOR_CHANNELS] = values.try_into().map_err(|_| {
            format!(
                "expected {} sensor channels, got {}",
                SENSOR_CHANNELS,
                values.len()
            )
        })?;
        Self::new(array)
    }

    /// Raw channel values
    pub fn values(&self) -> &[u8; SENSOR_CHANNELS] {
        &self.0
    }

    /// Whether the given channel sees the line
    pub fn is_detected(&self, channel: usize) -> bool {
        self.0.get(channel) == Some(&LINE_DETECTED)
    }

    /// Number of channels that see the line
    pub fn detected_count(&self) -> usize {
        self.0.iter().filter(|v| **v == LINE_DETECTED).count()
    }

    /// True when every channel reports the same value (all black or all white)
    pub fn is_saturated(&self) -> bool {
        let count = self.detected_count();
        count == 0 || count == SENSOR_CHANNELS
    }

    /// The reading as a compact bit string, leftmost channel first (e.g. `"01111111"`)
    pub fn as_binary_string(&self) -> String {
        self.0.iter().map(|v| if *v == LINE_DETECTED { '0' } else { '1' }).collect()
    }
}

impl TryFrom<[u8; SENSOR_CHANNELS]> for SensorArray {
    type Error = String;

    fn try_from(values: [u8; SENSOR_CHANNELS]) -> Result<Self, Self::Error> {
        Self::new(values)
    }
}

impl From<SensorArray> for [u8; SENSOR_CHANNELS] {
    fn from(array: SensorArray) -> Self {
        array.0
    }
}

impl std::fmt::Display for SensorArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_binary_string())
    }
}

/// Rotation direction reported by the legacy nested motor shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotorDirection {
    Forward,
    Backward,
    Stop,
}

/// Raw PWM magnitudes of the drive motors
///
/// Either side may be missing; producers sometimes report only one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MotorState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_speed: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_speed: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_direction: Option<MotorDirection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_direction: Option<MotorDirection>,
}

impl MotorState {
    /// Create a motor state without direction information
    pub fn new(left_speed: u32, right_speed: u32) -> Self {
        Self {
            left_speed: Some(left_speed),
            right_speed: Some(right_speed),
            left_direction: None,
            right_direction: None,
        }
    }

    /// Whether both motors report zero speed
    ///
    /// A side that reports nothing does not count as stopped.
    pub fn is_stopped(&self) -> bool {
        self.left_speed == Some(0) && self.right_speed == Some(0)
    }
}

/// Producer-computed steering diagnostics, passed through unmodified
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ControlState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_speed: Option<i64>,
}

impl ControlState {
    /// Control state carrying only the steering error
    pub fn from_error(error: f64) -> Self {
        Self {
            error: Some(error),
            turn: None,
            base_speed: None,
        }
    }
}

/// Run state reported by the robot firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RobotStatus {
    Running,
    Stopped,
    Error,
}

impl std::fmt::Display for RobotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RobotStatus::Running => write!(f, "running"),
            RobotStatus::Stopped => write!(f, "stopped"),
            RobotStatus::Error => write!(f, "error"),
        }
    }
}

/// One telemetry sample
///
/// Records are immutable once appended to the store; the store hands out
/// clones only.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Producer timestamp in milliseconds since the Unix epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,

    /// Server receive time, assigned on append when absent
    #[serde(
        rename = "server_timestamp",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub received_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensors: Option<SensorArray>,

    /// Producer-side line detection flag (legacy firmware shape)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_detected: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motor: Option<MotorState>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control: Option<ControlState>,

    /// Network information, stored exactly as the producer sent it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wifi: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RobotStatus>,

    /// Battery level in percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery: Option<f64>,

    /// Unrecognized top-level keys, re-emitted verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TelemetryRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the producer timestamp (ms since epoch)
    pub fn with_timestamp(mut self, timestamp_ms: i64) -> Self {
        self.timestamp = Some(timestamp_ms);
        self
    }

    /// Set the sensor reading
    pub fn with_sensors(mut self, sensors: SensorArray) -> Self {
        self.sensors = Some(sensors);
        self
    }

    /// Set both motor speeds
    pub fn with_motor(mut self, left_speed: u32, right_speed: u32) -> Self {
        self.motor = Some(MotorState::new(left_speed, right_speed));
        self
    }

    /// Set the full control block
    pub fn with_control(mut self, control: ControlState) -> Self {
        self.control = Some(control);
        self
    }

    /// Set only the producer steering error
    pub fn with_control_error(self, error: f64) -> Self {
        self.with_control(ControlState::from_error(error))
    }

    /// Set the wifi block
    pub fn with_wifi(mut self, wifi: Value) -> Self {
        self.wifi = Some(wifi);
        self
    }

    /// Set the robot run state
    pub fn with_status(mut self, status: RobotStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Set the battery level
    pub fn with_battery(mut self, percent: f64) -> Self {
        self.battery = Some(percent);
        self
    }

    /// Producer steering error, if the record carries one
    pub fn control_error(&self) -> Option<f64> {
        self.control.and_then(|c| c.error)
    }

    /// Left motor speed, if the record carries one
    pub fn left_speed(&self) -> Option<u32> {
        self.motor.and_then(|m| m.left_speed)
    }

    /// Right motor speed, if the record carries one
    pub fn right_speed(&self) -> Option<u32> {
        self.motor.and_then(|m| m.right_speed)
    }
}

/// Incremental statistics tracker
/// O(1) updates for count, mean, min and max without keeping the values
#[derive(Debug, Clone)]
pub struct IncrementalStats {
    /// Current count of values
    pub count: u64,
    /// Running sum for average calculation
    pub sum: f64,
    /// Current minimum value
    pub min: f64,
    /// Current maximum value
    pub max: f64,
}

impl Default for IncrementalStats {
    fn default() -> Self {
        Self::new()
    }
}

impl IncrementalStats {
    /// Create a new empty stats tracker
    pub fn new() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            min: f64::MAX,
            max: f64::MIN,
        }
    }

    /// Add a new value to the statistics
    #[inline]
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// Add a value when present, skip it otherwise
    #[inline]
    pub fn push_opt(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.push(v);
        }
    }

    /// Get the current average (0 when empty)
    #[inline]
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    /// Get statistics as (min, max, avg) tuple, all 0 when empty
    #[inline]
    pub fn as_tuple(&self) -> (f64, f64, f64) {
        if self.count == 0 {
            (0.0, 0.0, 0.0)
        } else {
            (self.min, self.max, self.average())
        }
    }
}
