//! Line-Tracer Telemetry Server - Main Entry Point
//!
//! Loads the config, sets up logging, and serves the `/api` routes until
//! Ctrl-C.

use anyhow::Context;
use linetrace_telemetry::{config::ServerConfig, server, simulator};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log file prefix inside `logging.directory`
const LOG_FILE_PREFIX: &str = "linetrace-telemetry.log";

fn init_logging(config: &ServerConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match &config.logging.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    guard
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        // Without a signal handler, run until killed
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (config, config_path) = ServerConfig::from_env();
    let _log_guard = init_logging(&config);

    tracing::info!("Starting line-tracer telemetry server");

    // The subscriber did not exist yet while the config was loaded
    if let Some(path) = &config_path {
        match ServerConfig::load(path) {
            Err(e) => tracing::warn!("Using default config: {}", e),
            Ok(_) if path.exists() => tracing::info!("Loaded config from {:?}", path),
            Ok(_) => tracing::info!("No config at {:?}, using defaults", path),
        }
    }

    let bind = config.server.bind.clone();
    let simulator_settings = config.simulator.clone();
    let state = server::AppState::from_config(config);

    let simulator_task = if simulator_settings.enabled {
        Some(tokio::spawn(simulator::run(
            state.store.clone(),
            simulator_settings,
        )))
    } else {
        None
    };

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;

    tracing::info!(
        "Listening on {} (store capacity {})",
        bind,
        state.store.capacity()
    );

    let result = server::serve(listener, state, shutdown_signal())
        .await
        .context("HTTP server error");

    if let Some(task) = simulator_task {
        task.abort();
    }

    result
}
