//! Operator alerts derived from a single telemetry record

use crate::types::{RobotStatus, TelemetryRecord};
use serde::Serialize;

/// Battery level (percent) below which a warning is raised
pub const LOW_BATTERY_PERCENT: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub severity: AlertSeverity,
    pub title: &'static str,
    pub message: String,
}

impl Alert {
    fn warning(title: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: AlertSeverity::Warning,
            title,
            message: message.into(),
        }
    }

    fn error(title: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: AlertSeverity::Error,
            title,
            message: message.into(),
        }
    }
}

/// Evaluate every alert rule against a record
///
/// Rules only fire on fields the record carries; a record without a status
/// never raises the motor rule.
pub fn evaluate(record: &TelemetryRecord) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if let (Some(RobotStatus::Running), Some(motor)) = (record.status, record.motor) {
        if motor.is_stopped() {
            alerts.push(Alert::warning(
                "Motors stopped",
                "Both motors report zero speed while the robot is running",
            ));
        }
    }

    if let Some(sensors) = record.sensors {
        if sensors.is_saturated() {
            let what = if sensors.detected_count() == 0 {
                "no sensor sees the line"
            } else {
                "every sensor sees the line"
            };
            alerts.push(Alert::warning(
                "Sensor anomaly",
                format!("Sensor array saturated ({}): {}", sensors, what),
            ));
        }
    }

    if record.status == Some(RobotStatus::Error) {
        alerts.push(Alert::error("System error", "The robot reported an error state"));
    }

    if let Some(battery) = record.battery {
        if battery < LOW_BATTERY_PERCENT {
            alerts.push(Alert::warning(
                "Low battery",
                format!("Battery at {:.0}%", battery),
            ));
        }
    }

    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SensorArray;

    fn titles(record: &TelemetryRecord) -> Vec<&'static str> {
        evaluate(record).iter().map(|a| a.title).collect()
    }

    #[test]
    fn test_healthy_record_has_no_alerts() {
        let record = TelemetryRecord::new()
            .with_sensors(SensorArray::new([1, 1, 1, 0, 0, 1, 1, 1]).unwrap())
            .with_motor(180, 180)
            .with_status(RobotStatus::Running)
            .with_battery(90.0);
        assert!(evaluate(&record).is_empty());
        assert!(evaluate(&TelemetryRecord::new()).is_empty());
    }

    #[test]
    fn test_motors_stopped_only_while_running() {
        let running = TelemetryRecord::new()
            .with_motor(0, 0)
            .with_status(RobotStatus::Running);
        assert_eq!(titles(&running), vec!["Motors stopped"]);

        let stopped = TelemetryRecord::new()
            .with_motor(0, 0)
            .with_status(RobotStatus::Stopped);
        assert!(titles(&stopped).is_empty());
    }

    #[test]
    fn test_one_sided_motor_is_not_stopped() {
        let mut record = TelemetryRecord::new().with_status(RobotStatus::Running);
        record.motor = Some(crate::types::MotorState {
            left_speed: Some(0),
            ..Default::default()
        });
        assert!(titles(&record).is_empty());
    }

    #[test]
    fn test_saturated_sensors() {
        let white = TelemetryRecord::new().with_sensors(SensorArray::ALL_BACKGROUND);
        let black = TelemetryRecord::new().with_sensors(SensorArray::ALL_DETECTED);

        let alert = &evaluate(&white)[0];
        assert_eq!(alert.title, "Sensor anomaly");
        assert!(alert.message.contains("11111111"));
        assert!(evaluate(&black)[0].message.contains("every sensor"));
    }

    #[test]
    fn test_error_status_and_low_battery() {
        let record = TelemetryRecord::new()
            .with_status(RobotStatus::Error)
            .with_battery(12.4);
        let alerts = evaluate(&record);

        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].severity, AlertSeverity::Error);
        assert_eq!(alerts[1].title, "Low battery");
        assert_eq!(alerts[1].message, "Battery at 12%");
    }
}
