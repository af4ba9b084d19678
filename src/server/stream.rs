//! Live-push stream of the latest telemetry record
//!
//! A subscriber first receives a `connected` event, then the stream polls a
//! [`LatestSource`] on a fixed interval and pushes whatever it returns:
//!
//! - `Ok(Some(record))` - a `sensor_data` event
//! - `Ok(None)` - nothing
//! - `Err(_)` - an `error` event; polling continues
//!
//! The interval timer is owned by the stream. When the client goes away the
//! response body is dropped together with the stream, which stops polling.

use super::AppState;
use crate::error::Result;
use crate::store::TelemetryStore;
use crate::types::TelemetryRecord;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_stream::{Stream, StreamExt};

/// Anything the stream can poll for the most recent record
#[cfg_attr(test, mockall::automock)]
pub trait LatestSource: Send + Sync {
    fn latest_record(&self) -> Result<Option<TelemetryRecord>>;
}

impl LatestSource for TelemetryStore {
    fn latest_record(&self) -> Result<Option<TelemetryRecord>> {
        Ok(self.latest())
    }
}

/// One event pushed to a subscriber
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Connected {
        message: String,
        timestamp: DateTime<Utc>,
    },
    SensorData {
        data: TelemetryRecord,
        timestamp: DateTime<Utc>,
    },
    Error {
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl StreamEvent {
    pub fn connected() -> Self {
        StreamEvent::Connected {
            message: "Stream connected".to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn sensor_data(data: TelemetryRecord) -> Self {
        StreamEvent::SensorData {
            data,
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        StreamEvent::Error {
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Wire name of the event, as found in its `type` field
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::Connected { .. } => "connected",
            StreamEvent::SensorData { .. } => "sensor_data",
            StreamEvent::Error { .. } => "error",
        }
    }
}

/// Event stream polling `source` every `poll_interval`
pub fn telemetry_events(
    source: Arc<dyn LatestSource>,
    poll_interval: Duration,
) -> impl Stream<Item = StreamEvent> + Send + 'static {
    async_stream::stream! {
        yield StreamEvent::connected();

        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match source.latest_record() {
                Ok(Some(record)) => yield StreamEvent::sensor_data(record),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("Stream poll failed: {}", e);
                    yield StreamEvent::error("Failed to fetch sensor data");
                }
            }
        }
    }
}

fn to_sse(event: &StreamEvent) -> Event {
    Event::default().json_data(event).unwrap_or_else(|e| {
        tracing::error!("Failed to encode {} event: {}", event.kind(), e);
        Event::default().comment("encode error")
    })
}

/// `GET /api/stream`
pub async fn stream_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    tracing::debug!("Stream subscriber connected");
    let source: Arc<dyn LatestSource> = state.store.clone();
    let events = telemetry_events(source, state.config.stream.poll_interval())
        .map(|event| Ok(to_sse(&event)));
    Sse::new(events).keep_alive(KeepAlive::default())
}
