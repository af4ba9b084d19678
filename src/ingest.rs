//! Ingestion boundary: wire payloads to canonical records
//!
//! Producers in the field send several historically grown payload shapes.
//! This module maps every accepted shape onto one [`TelemetryRecord`] so the
//! store and the twin math never branch on shape.
//!
//! # Accepted Shapes
//!
//! | Concern | Canonical | Also accepted |
//! |---|---|---|
//! | Sensors | `sensors: [8 x 0/1]` | `sensor_values: [...]`, `sensors: {values, lineDetected}` |
//! | Motors | `motor: {left_speed, right_speed}` | `motors: {left: {speed, direction}, right: {...}}` |
//! | Steering | `control: {error, turn, base_speed}` | top-level `error` number |
//!
//! Every field inside `motor`, `motors` and `control` is optional, so a
//! producer may report one motor side or a control block without `error`.
//! `wifi` is stored verbatim without validation.
//!
//! `timestamp`, `status` and `battery` are read as-is. Any other key
//! is carried along in [`TelemetryRecord::extra`]. A client-supplied
//! `server_timestamp` is dropped; the store assigns its own.
//!
//! A payload that is not a JSON object, or that carries a known key with the
//! wrong shape, is rejected as a whole. Nothing is appended for it.

use crate::error::{Result, TelemetryError};
use crate::types::{
    ControlState, MotorDirection, MotorState, RobotStatus, SensorArray, TelemetryRecord,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Legacy nested motor shape: `{left: {speed, direction}, right: {...}}`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LegacyMotors {
    left: Option<LegacyMotor>,
    right: Option<LegacyMotor>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LegacyMotor {
    speed: Option<u32>,
    direction: Option<MotorDirection>,
}

/// Parse a raw request body into a record
pub fn parse_payload(body: &[u8]) -> Result<TelemetryRecord> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| TelemetryError::InvalidPayload(format!("body is not valid JSON: {}", e)))?;
    normalize(value)
}

/// Normalize a decoded JSON value into a record
pub fn normalize(value: Value) -> Result<TelemetryRecord> {
    let mut map = match value {
        Value::Object(map) => map,
        other => {
            return Err(TelemetryError::InvalidPayload(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            )))
        }
    };

    let timestamp = take_timestamp(&mut map)?;

    let (sensors, line_detected) = match take_present(&mut map, "sensors") {
        Some(value) => parse_sensors("sensors", value)?,
        None => match take_present(&mut map, "sensor_values") {
            Some(value) => parse_sensors("sensor_values", value)?,
            None => (None, None),
        },
    };
    // The alias is redundant once the canonical key has been read
    map.remove("sensor_values");

    let motor = match take_present(&mut map, "motor") {
        Some(value) => Some(decode::<MotorState>("motor", value)?),
        None => match take_present(&mut map, "motors") {
            Some(value) => {
                let legacy: LegacyMotors = decode("motors", value)?;
                let left = legacy.left.unwrap_or_default();
                let right = legacy.right.unwrap_or_default();
                Some(MotorState {
                    left_speed: left.speed,
                    right_speed: right.speed,
                    left_direction: left.direction,
                    right_direction: right.direction,
                })
            }
            None => None,
        },
    };
    map.remove("motors");

    let mut control: Option<ControlState> = take_typed(&mut map, "control")?;
    if control.map_or(true, |c| c.error.is_none()) {
        if let Some(error) = map.get("error").and_then(Value::as_f64) {
            map.remove("error");
            control.get_or_insert_with(ControlState::default).error = Some(error);
        }
    }

    let wifi = take_present(&mut map, "wifi");
    let status: Option<RobotStatus> = take_typed(&mut map, "status")?;
    let battery: Option<f64> = take_typed(&mut map, "battery")?;
    let explicit_line: Option<bool> = take_typed(&mut map, "line_detected")?;

    map.remove("server_timestamp");

    Ok(TelemetryRecord {
        timestamp,
        received_at: None,
        sensors,
        line_detected: line_detected.or(explicit_line),
        motor,
        control,
        wifi,
        status,
        battery,
        extra: map,
    })
}

fn take_present(map: &mut Map<String, Value>, key: &str) -> Option<Value> {
    map.remove(key).filter(|v| !v.is_null())
}

fn take_typed<T: DeserializeOwned>(map: &mut Map<String, Value>, key: &str) -> Result<Option<T>> {
    take_present(map, key)
        .map(|value| decode(key, value))
        .transpose()
}

fn decode<T: DeserializeOwned>(key: &str, value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| TelemetryError::InvalidPayload(format!("field `{}`: {}", key, e)))
}

fn take_timestamp(map: &mut Map<String, Value>) -> Result<Option<i64>> {
    let Some(value) = take_present(map, "timestamp") else {
        return Ok(None);
    };
    if let Some(ms) = value.as_i64() {
        return Ok(Some(ms));
    }
    match value.as_f64() {
        Some(ms) if ms.is_finite() => Ok(Some(ms.trunc() as i64)),
        _ => Err(TelemetryError::InvalidPayload(format!(
            "field `timestamp`: expected milliseconds since epoch, got {}",
            json_kind(&value)
        ))),
    }
}

fn parse_sensors(key: &str, value: Value) -> Result<(Option<SensorArray>, Option<bool>)> {
    match value {
        Value::Array(items) => Ok((Some(parse_sensor_values(key, &items)?), None)),
        Value::Object(mut inner) => {
            let sensors = match take_present(&mut inner, "values") {
                Some(Value::Array(items)) => Some(parse_sensor_values(key, &items)?),
                Some(other) => {
                    return Err(TelemetryError::InvalidPayload(format!(
                        "field `{}.values`: expected an array, got {}",
                        key,
                        json_kind(&other)
                    )))
                }
                None => None,
            };
            let line_detected = take_present(&mut inner, "lineDetected")
                .or_else(|| take_present(&mut inner, "line_detected"))
                .map(|v| decode::<bool>(&format!("{}.lineDetected", key), v))
                .transpose()?;
            Ok((sensors, line_detected))
        }
        other => Err(TelemetryError::InvalidPayload(format!(
            "field `{}`: expected an array or object, got {}",
            key,
            json_kind(&other)
        ))),
    }
}

fn parse_sensor_values(key: &str, items: &[Value]) -> Result<SensorArray> {
    let values = items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            item.as_u64()
                .filter(|v| *v <= 1)
                .map(|v| v as u8)
                .ok_or_else(|| {
                    TelemetryError::InvalidPayload(format!(
                        "field `{}[{}]`: expected 0 or 1, got {}",
                        key, idx, item
                    ))
                })
        })
        .collect::<Result<Vec<u8>>>()?;

    SensorArray::from_slice(&values)
        .map_err(|e| TelemetryError::InvalidPayload(format!("field `{}`: {}", key, e)))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
