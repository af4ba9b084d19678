//! # linetrace-telemetry: Line-Tracer Telemetry Server
//!
//! A telemetry service for a line-tracing robot. The robot POSTs small JSON
//! samples (8-channel optical sensor bar, motor PWM, steering error, wifi
//! info); the service keeps the most recent ones in memory and serves them
//! back as JSON and as a live-push stream. A pure numeric module turns each
//! sample into a frame of a "digital twin" view.
//!
//! ## Architecture
//!
//! - **Ingest**: Every accepted payload shape is normalized into one
//!   [`TelemetryRecord`] at the boundary ([`ingest`])
//! - **Store**: A bounded FIFO ring buffer behind a mutex ([`store`])
//! - **Server**: axum handlers and an SSE stream sharing one injected store
//!   ([`server`])
//! - **Twin**: Deviation estimate, path walker and heading-up camera
//!   ([`twin`])
//! - **Simulator**: A synthetic robot for running without hardware
//!   ([`simulator`])
//!
//! ## Configuration
//!
//! The server reads `server.toml` from `LINETRACE_CONFIG` or the platform
//! config directory under `dev.hxyulin.linetrace-telemetry` (see
//! [`config`]).
//!
//! ## Example
//!
//! ```ignore
//! use linetrace_telemetry::{config::ServerConfig, server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let (config, _) = ServerConfig::from_env();
//!     let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
//!     let state = server::AppState::from_config(config);
//!     server::serve(listener, state, async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//!     Ok(())
//! }
//! ```

pub mod alerts;
pub mod config;
pub mod error;
pub mod ingest;
pub mod server;
pub mod simulator;
pub mod store;
pub mod twin;
pub mod types;

// Re-export commonly used types
pub use config::ServerConfig;
pub use error::{Result, TelemetryError};
pub use server::{router, AppState};
pub use store::{TelemetryStats, TelemetryStore};
pub use twin::{DeviationEstimate, DigitalTwin, PathWalker, TwinFrame};
pub use types::{SensorArray, TelemetryRecord};
