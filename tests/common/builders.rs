//! Test data builders for creating telemetry payloads and records

use linetrace_telemetry::{SensorArray, TelemetryRecord};
use serde_json::{json, Value};

/// Builder for canonical-shape JSON payloads
pub struct PayloadBuilder {
    payload: serde_json::Map<String, Value>,
}

impl PayloadBuilder {
    pub fn new() -> Self {
        Self {
            payload: serde_json::Map::new(),
        }
    }

    pub fn timestamp(mut self, ms: i64) -> Self {
        self.payload.insert("timestamp".into(), json!(ms));
        self
    }

    pub fn sensors(mut self, values: [u8; 8]) -> Self {
        self.payload.insert("sensors".into(), json!(values));
        self
    }

    pub fn motor(mut self, left: u32, right: u32) -> Self {
        self.payload.insert(
            "motor".into(),
            json!({ "left_speed": left, "right_speed": right }),
        );
        self
    }

    pub fn error(mut self, error: f64) -> Self {
        self.payload
            .insert("control".into(), json!({ "error": error }));
        self
    }

    pub fn field(mut self, key: &str, value: Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }

    pub fn build(self) -> Value {
        Value::Object(self.payload)
    }
}

impl Default for PayloadBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for records appended directly to a store
pub struct RecordBuilder {
    record: TelemetryRecord,
}

impl RecordBuilder {
    pub fn new() -> Self {
        Self {
            record: TelemetryRecord::new(),
        }
    }

    pub fn timestamp(mut self, ms: i64) -> Self {
        self.record = self.record.with_timestamp(ms);
        self
    }

    pub fn sensors(mut self, values: [u8; 8]) -> Self {
        self.record = self
            .record
            .with_sensors(SensorArray::new(values).expect("binary sensor values"));
        self
    }

    pub fn motor(mut self, left: u32, right: u32) -> Self {
        self.record = self.record.with_motor(left, right);
        self
    }

    pub fn error(mut self, error: f64) -> Self {
        self.record = self.record.with_control_error(error);
        self
    }

    pub fn build(self) -> TelemetryRecord {
        self.record
    }
}

impl Default for RecordBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_builder() {
        let payload = PayloadBuilder::new()
            .timestamp(10)
            .sensors([1, 1, 1, 0, 0, 1, 1, 1])
            .motor(100, 120)
            .build();

        assert_eq!(payload["timestamp"], 10);
        assert_eq!(payload["motor"]["right_speed"], 120);
    }
}
