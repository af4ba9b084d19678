//! Synthetic line-tracer for running the server without hardware
//!
//! The simulator moves a virtual line under the sensor bar following an
//! [`OffsetPattern`], derives the 8-channel reading from the line position,
//! and closes the loop with a proportional controller the way the robot
//! firmware does. Each sample is a complete [`TelemetryRecord`].
//!
//! # Data Patterns
//!
//! - [`OffsetPattern::Constant`] - Line parked at a fixed offset
//! - [`OffsetPattern::Sine`] - Smooth weaving
//! - [`OffsetPattern::Triangle`] - Linear sweeps edge to edge
//! - [`OffsetPattern::Square`] - Abrupt jumps between two offsets
//! - [`OffsetPattern::Random`] - Jitter within a range
//!
//! Offsets use the same units as the deviation estimate: positive means the
//! line is left of center, `±7` puts it under an outer channel.

use crate::config::SimulatorSettings;
use crate::store::TelemetryStore;
use crate::twin::deviation::{self, CHANNEL_WEIGHTS};
use crate::types::{
    ControlState, RobotStatus, SensorArray, TelemetryRecord, BACKGROUND, LINE_DETECTED,
    SENSOR_CHANNELS,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::MissedTickBehavior;

/// Half the width of the simulated line, in channel-weight units
pub const LINE_HALF_WIDTH: f64 = 1.5;

/// Base PWM for both motors when driving straight
pub const BASE_SPEED: i64 = 180;

/// Proportional gain from steering error to PWM difference
pub const TURN_GAIN: f64 = 10.0;

/// Upper bound of the simulated PWM scale
pub const MAX_SPEED: i64 = 255;

/// How the simulated line moves under the robot over time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OffsetPattern {
    /// Fixed offset
    Constant { offset: f64 },
    /// Sine wave with frequency (Hz) and amplitude
    Sine {
        frequency: f64,
        amplitude: f64,
        offset: f64,
    },
    /// Triangle wave
    Triangle { period: f64, amplitude: f64 },
    /// Square wave
    Square { period: f64, amplitude: f64 },
    /// Uniform random values within range
    Random { min: f64, max: f64 },
}

impl Default for OffsetPattern {
    fn default() -> Self {
        OffsetPattern::Sine {
            frequency: 0.25,
            amplitude: 5.0,
            offset: 0.0,
        }
    }
}

/// Generates synthetic telemetry records
#[derive(Debug, Clone)]
pub struct RobotSimulator {
    pattern: OffsetPattern,
    seed: u64,
    last_error: f64,
    battery: f64,
}

impl RobotSimulator {
    pub fn new(pattern: OffsetPattern) -> Self {
        Self {
            pattern,
            seed: 12345,
            last_error: 0.0,
            battery: 100.0,
        }
    }

    pub fn pattern(&self) -> OffsetPattern {
        self.pattern
    }

    /// Line offset at the given time since start
    pub fn line_offset(&mut self, elapsed_secs: f64) -> f64 {
        match self.pattern {
            OffsetPattern::Constant { offset } => offset,
            OffsetPattern::Sine {
                frequency,
                amplitude,
                offset,
            } => offset + amplitude * (2.0 * std::f64::consts::PI * frequency * elapsed_secs).sin(),
            OffsetPattern::Triangle { period, amplitude } => {
                if period <= 0.0 {
                    return 0.0;
                }
                let t = elapsed_secs.rem_euclid(period);
                let half = period / 2.0;
                if t < half {
                    amplitude * (2.0 * t / half - 1.0)
                } else {
                    amplitude * (1.0 - 2.0 * (t - half) / half)
                }
            }
            OffsetPattern::Square { period, amplitude } => {
                if period <= 0.0 {
                    return amplitude;
                }
                if elapsed_secs.rem_euclid(period) < period / 2.0 {
                    amplitude
                } else {
                    -amplitude
                }
            }
            OffsetPattern::Random { min, max } => min + self.next_random() * (max - min),
        }
    }

    /// Produce one record for the given time since start
    pub fn sample(&mut self, elapsed_secs: f64) -> TelemetryRecord {
        let offset = self.line_offset(elapsed_secs);
        let sensors = sensors_for_offset(offset);
        let estimate = deviation::estimate(&sensors);

        // Hold the last correction while the line is lost
        if estimate.line_detected() {
            self.last_error = estimate.value;
        }
        let error = self.last_error;

        let turn = (TURN_GAIN * error).round() as i64;
        let left = (BASE_SPEED - turn).clamp(0, MAX_SPEED) as u32;
        let right = (BASE_SPEED + turn).clamp(0, MAX_SPEED) as u32;

        self.battery = (self.battery - 0.01).max(0.0);

        TelemetryRecord::new()
            .with_sensors(sensors)
            .with_motor(left, right)
            .with_control(ControlState {
                error: Some(error),
                turn: Some(turn),
                base_speed: Some(BASE_SPEED),
            })
            .with_status(RobotStatus::Running)
            .with_battery(self.battery)
    }

    /// Xorshift step, uniform in [0, 1]
    fn next_random(&mut self) -> f64 {
        let mut s = self.seed;
        s ^= s << 13;
        s ^= s >> 7;
        s ^= s << 17;
        self.seed = s;
        (s as f64) / (u64::MAX as f64)
    }
}

/// Sensor reading for a line at `offset` (positive = left of center)
pub fn sensors_for_offset(offset: f64) -> SensorArray {
    let position = -offset;
    let mut values = [BACKGROUND; SENSOR_CHANNELS];
    for (value, weight) in values.iter_mut().zip(CHANNEL_WEIGHTS) {
        if (weight as f64 - position).abs() <= LINE_HALF_WIDTH {
            *value = LINE_DETECTED;
        }
    }
    // Every value is 0 or 1
    SensorArray::new(values).unwrap_or(SensorArray::ALL_BACKGROUND)
}

/// Append a synthetic record to `store` every `settings.interval()`
///
/// Runs until the task is aborted.
pub async fn run(store: Arc<TelemetryStore>, settings: SimulatorSettings) {
    let mut simulator = RobotSimulator::new(settings.pattern);
    let mut ticker = tokio::time::interval(settings.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let start = Instant::now();

    tracing::info!(
        "Simulator started: {:?} every {:?}",
        settings.pattern,
        settings.interval()
    );

    loop {
        ticker.tick().await;
        let record = simulator
            .sample(start.elapsed().as_secs_f64())
            .with_timestamp(chrono::Utc::now().timestamp_millis());
        store.append(record);
    }
}
