//! HTTP surface of the telemetry service
//!
//! Every route lives under `/api`:
//!
//! | Method | Path | Handler |
//! |---|---|---|
//! | POST | `/api/telemetry` | [`handlers::ingest`] |
//! | GET | `/api/telemetry?count=N` | [`handlers::history`] |
//! | GET | `/api/telemetry/latest` | [`handlers::latest`] |
//! | GET | `/api/telemetry/stats` | [`handlers::stats`] |
//! | GET | `/api/telemetry/export` | [`handlers::export`] |
//! | POST | `/api/telemetry/clear` | [`handlers::clear`] |
//! | GET | `/api/telemetry/alerts` | [`handlers::alerts`] |
//! | GET, POST | `/api/sensor` | [`handlers::sensor_latest`], [`handlers::sensor_ingest`] |
//! | GET | `/api/stream` | [`stream::stream_handler`] |
//! | GET | `/api/twin?progress=P` | [`handlers::twin`] |
//! | GET | `/api/ping` | [`handlers::ping`] |
//!
//! Handlers share one [`AppState`]; the store is injected at construction,
//! there is no process-wide global.

pub mod handlers;
pub mod stream;

use crate::config::ServerConfig;
use crate::error::TelemetryError;
use crate::store::TelemetryStore;
use crate::twin::DigitalTwin;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::net::TcpListener;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<TelemetryStore>,
    pub config: Arc<ServerConfig>,
    /// Server-side twin; its walker advances once per `/api/twin` request
    pub twin: Arc<Mutex<DigitalTwin>>,
}

impl AppState {
    pub fn new(store: Arc<TelemetryStore>, config: ServerConfig) -> Self {
        let twin = DigitalTwin::from_settings(&config.twin);
        Self {
            store,
            config: Arc::new(config),
            twin: Arc::new(Mutex::new(twin)),
        }
    }

    /// Lock the shared twin, recovering the guard if a holder panicked
    pub fn lock_twin(&self) -> MutexGuard<'_, DigitalTwin> {
        self.twin.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// State with a fresh store sized from `config`
    pub fn from_config(config: ServerConfig) -> Self {
        let store = Arc::new(TelemetryStore::new(config.store.capacity));
        Self::new(store, config)
    }
}

/// Build the `/api` router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/telemetry",
            get(handlers::history).post(handlers::ingest),
        )
        .route("/api/telemetry/latest", get(handlers::latest))
        .route("/api/telemetry/stats", get(handlers::stats))
        .route("/api/telemetry/export", get(handlers::export))
        .route("/api/telemetry/clear", post(handlers::clear))
        .route("/api/telemetry/alerts", get(handlers::alerts))
        .route(
            "/api/sensor",
            get(handlers::sensor_latest).post(handlers::sensor_ingest),
        )
        .route("/api/stream", get(stream::stream_handler))
        .route("/api/twin", get(handlers::twin))
        .route("/api/ping", get(handlers::ping))
        .with_state(state)
}

/// Serve the router on `listener` until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Error response wrapper mapping [`TelemetryError`] onto HTTP
#[derive(Debug)]
pub struct ApiError(pub TelemetryError);

impl From<TelemetryError> for ApiError {
    fn from(err: TelemetryError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0.root() {
            TelemetryError::InvalidPayload(message) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "status": "error", "message": message })),
            )
                .into_response(),
            TelemetryError::NoData => (
                StatusCode::NOT_FOUND,
                Json(json!({ "status": "no_data", "message": "No data available" })),
            )
                .into_response(),
            _ => {
                tracing::error!("Request failed: {}", self.0);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "status": "error", "message": self.0.to_string() })),
                )
                    .into_response()
            }
        }
    }
}
