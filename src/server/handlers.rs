//! Ingestion and query handlers
//!
//! Every handler is a thin adapter: parse the request, call one
//! [`TelemetryStore`](crate::store::TelemetryStore) operation, shape the
//! response. "No data" is answered with 404 and never conflated with an
//! empty history array or a malformed request.

use super::{ApiError, AppState};
use crate::alerts::{self, Alert};
use crate::error::TelemetryError;
use crate::ingest;
use crate::store::{AppendReceipt, TelemetryExport, TelemetryStats};
use crate::twin::TwinFrame;
use crate::types::TelemetryRecord;
use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Report a malformed query string in the same JSON shape as a bad body
fn query_error(rejection: QueryRejection) -> ApiError {
    tracing::warn!("Rejected query string: {}", rejection.body_text());
    ApiError(TelemetryError::InvalidPayload(rejection.body_text()))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub count: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct TwinQuery {
    pub progress: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub status: &'static str,
    pub received: bool,
    /// Producer timestamp of the stored record, ms since epoch
    pub timestamp: i64,
}

#[derive(Debug, Serialize)]
pub struct SensorIngestResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SensorResponse {
    pub status: &'static str,
    pub data: TelemetryRecord,
}

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub export: TelemetryExport,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub status: &'static str,
    pub cleared: usize,
}

#[derive(Debug, Serialize)]
pub struct AlertsResponse {
    pub status: &'static str,
    pub count: usize,
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// Normalize and append a request body
fn append_body(state: &AppState, body: &[u8]) -> Result<AppendReceipt, ApiError> {
    let record = ingest::parse_payload(body).map_err(|e| {
        tracing::warn!("Rejected telemetry payload: {}", e);
        e
    })?;

    tracing::debug!(
        "Telemetry received: sensors={} error={:?} motor={:?}/{:?}",
        record
            .sensors
            .map(|s| s.as_binary_string())
            .unwrap_or_else(|| "-".to_string()),
        record.control_error(),
        record.left_speed(),
        record.right_speed(),
    );

    let receipt = state.store.append(record);
    if receipt.evicted {
        tracing::trace!("Store full, evicted oldest record");
    }
    Ok(receipt)
}

/// `POST /api/telemetry`
pub async fn ingest(State(state): State<AppState>, body: Bytes) -> ApiResult<IngestResponse> {
    let receipt = append_body(&state, &body)?;
    Ok(Json(IngestResponse {
        status: "success",
        received: true,
        timestamp: receipt.timestamp,
    }))
}

/// `GET /api/telemetry?count=N`
pub async fn history(
    State(state): State<AppState>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> ApiResult<Vec<TelemetryRecord>> {
    let Query(query) = query.map_err(query_error)?;
    let count = query
        .count
        .unwrap_or(state.config.store.default_history_count);
    Ok(Json(state.store.history(Some(count))))
}

/// `GET /api/telemetry/latest`
pub async fn latest(State(state): State<AppState>) -> ApiResult<TelemetryRecord> {
    state
        .store
        .latest()
        .map(Json)
        .ok_or(ApiError(TelemetryError::NoData))
}

/// `GET /api/telemetry/stats`
pub async fn stats(State(state): State<AppState>) -> ApiResult<TelemetryStats> {
    state
        .store
        .stats()
        .map(Json)
        .ok_or(ApiError(TelemetryError::NoData))
}

/// `GET /api/telemetry/export`
pub async fn export(State(state): State<AppState>) -> Json<ExportResponse> {
    let export = state.store.export();
    tracing::info!("Exporting {} records as {}", export.count, export.filename);
    Json(ExportResponse {
        status: "success",
        export,
    })
}

/// `POST /api/telemetry/clear`
pub async fn clear(State(state): State<AppState>) -> Json<ClearResponse> {
    let cleared = state.store.clear();
    tracing::info!("Cleared {} telemetry records", cleared);
    Json(ClearResponse {
        status: "success",
        cleared,
    })
}

/// `GET /api/telemetry/alerts`
pub async fn alerts(State(state): State<AppState>) -> ApiResult<AlertsResponse> {
    let record = state.store.latest().ok_or(TelemetryError::NoData)?;
    let alerts = alerts::evaluate(&record);
    Ok(Json(AlertsResponse {
        status: "success",
        count: alerts.len(),
        alerts,
    }))
}

/// `POST /api/sensor`, the endpoint older firmware posts to
pub async fn sensor_ingest(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<SensorIngestResponse> {
    let receipt = append_body(&state, &body)?;
    Ok(Json(SensorIngestResponse {
        status: "ok",
        message: "Data received",
        timestamp: receipt.received_at,
    }))
}

/// `GET /api/sensor`
pub async fn sensor_latest(State(state): State<AppState>) -> ApiResult<SensorResponse> {
    let data = state.store.latest().ok_or(TelemetryError::NoData)?;
    Ok(Json(SensorResponse { status: "ok", data }))
}

/// `GET /api/twin?progress=P`
///
/// With `progress` the frame is computed at that point and the shared walker
/// is left alone. Without it the walker takes one step per request.
pub async fn twin(
    State(state): State<AppState>,
    query: Result<Query<TwinQuery>, QueryRejection>,
) -> ApiResult<TwinFrame> {
    let Query(query) = query.map_err(query_error)?;
    let record = state.store.latest().ok_or(TelemetryError::NoData)?;
    let mut twin = state.lock_twin();
    let frame = match query.progress {
        Some(progress) => twin.frame_at(progress, &record),
        None => twin.frame(&record),
    };
    Ok(Json(frame))
}

/// `GET /api/ping`
pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        status: "ok",
        message: "Server is running",
        timestamp: Utc::now(),
    })
}
