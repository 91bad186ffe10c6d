//! Ciudad Feria Gate (feria-gate) - Main entry point
//!
//! Entry/accreditation validation station with an HTTP + SSE control
//! surface for the operator UI.

use anyhow::{Context, Result};
use clap::Parser;
use feria_common::EventBus;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use feria_gate::api::{self, AppContext};
use feria_gate::{GateArgs, GateConfig, EVENT_BUS_CAPACITY};

#[tokio::main]
async fn main() -> Result<()> {
    let args = GateArgs::parse();

    // Config is resolved before logging so the TOML level applies
    let (config, source) = GateConfig::resolve(&args).context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("feria_gate={},tower_http=debug", config.logging.level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Ciudad Feria gate v{} ({}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP")
    );
    match source {
        Some(path) => info!("Configuration: {}", path.display()),
        None => info!("Configuration: built-in defaults"),
    }
    info!(
        backend = %config.backend_url,
        mode = %config.default_mode,
        cameras = config.camera.devices.len(),
        "Gate configured"
    );
    if config.camera.devices.is_empty() {
        warn!("No camera devices configured; scanning will report no camera available");
    }

    let events = EventBus::new(EVENT_BUS_CAPACITY);
    let (session, driver) = feria_gate::spawn_session(&config, events)
        .context("Failed to initialize scan session")?;

    let ctx = AppContext::new(session.clone(), config.backend_url.clone());
    api::run(ctx, config.port, shutdown_signal())
        .await
        .context("Server error")?;

    // The server cancelled the session on shutdown; the driver exits once
    // the last handle is gone
    drop(session);
    if let Err(e) = driver.await {
        warn!("Session driver ended abnormally: {}", e);
    }

    info!("Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
