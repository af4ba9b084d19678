//! Sensor-weighted lateral deviation estimate
//!
//! Each channel carries a symmetric weight, leftmost `-7` to rightmost `+7`.
//! The estimate is the negated mean weight of the channels that see the
//! line, so a line under the left edge yields a positive value and a line
//! under the right edge a negative one.

use crate::types::{SensorArray, TelemetryRecord, SENSOR_CHANNELS};
use serde::Serialize;

/// Per-channel weights, index 0 = leftmost channel
pub const CHANNEL_WEIGHTS: [i32; SENSOR_CHANNELS] = [-7, -5, -3, -1, 1, 3, 5, 7];

/// Result of one deviation estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DeviationEstimate {
    /// Signed lateral deviation, 0 when no channel sees the line
    pub value: f64,
    /// Sum of the weights of the active channels
    pub weighted_sum: i32,
    /// Number of channels that see the line
    pub active_count: usize,
}

impl DeviationEstimate {
    /// Estimate for a reading where no channel sees the line
    pub const NONE: DeviationEstimate = DeviationEstimate {
        value: 0.0,
        weighted_sum: 0,
        active_count: 0,
    };

    /// Whether at least one channel saw the line
    ///
    /// An all-black reading and an empty reading both estimate to `0`; this
    /// is what tells them apart.
    pub fn line_detected(&self) -> bool {
        self.active_count > 0
    }
}

/// Estimate the deviation of a sensor reading
pub fn estimate(sensors: &SensorArray) -> DeviationEstimate {
    let (weighted_sum, active_count) = CHANNEL_WEIGHTS
        .iter()
        .enumerate()
        .filter(|(channel, _)| sensors.is_detected(*channel))
        .fold((0i32, 0usize), |(sum, count), (_, weight)| {
            (sum + weight, count + 1)
        });

    if active_count == 0 {
        return DeviationEstimate::NONE;
    }

    DeviationEstimate {
        value: -(weighted_sum as f64 / active_count as f64),
        weighted_sum,
        active_count,
    }
}

/// Estimate from a record, `None` when the record has no sensor reading
pub fn estimate_record(record: &TelemetryRecord) -> Option<DeviationEstimate> {
    record.sensors.as_ref().map(estimate)
}

/// The steering error to render for a record
///
/// A producer-supplied `control.error` wins over the recomputed estimate.
pub fn effective_error(record: &TelemetryRecord) -> f64 {
    record
        .control_error()
        .or_else(|| estimate_record(record).map(|e| e.value))
        .unwrap_or(0.0)
}
