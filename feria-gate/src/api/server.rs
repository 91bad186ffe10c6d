//! HTTP server setup and routing
//!
//! Control surface for the operator UI, default port 5790.

use axum::{
    routing::{get, post, put},
    Router,
};
use feria_common::EventBus;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::session::SessionHandle;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub session: SessionHandle,
    pub events: EventBus,
    /// Backend base URL, reported by `/health`
    pub backend_url: String,
    /// Cancelled when the server begins shutting down; ends SSE streams
    pub shutdown: CancellationToken,
}

impl AppContext {
    pub fn new(session: SessionHandle, backend_url: impl Into<String>) -> Self {
        let events = session.events().clone();
        Self {
            session,
            events,
            backend_url: backend_url.into(),
            shutdown: CancellationToken::new(),
        }
    }
}

/// Build the router with all routes
pub fn build_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(super::handlers::health))
        // Session control
        .route("/session", get(super::handlers::get_session))
        .route("/session/start", post(super::handlers::start))
        .route("/session/cancel", post(super::handlers::cancel))
        .route("/session/restart", post(super::handlers::restart))
        .route("/session/retry", post(super::handlers::retry))
        .route("/session/done", post(super::handlers::done))
        .route("/session/mode", put(super::handlers::set_mode))
        // Devices
        .route("/cameras", get(super::handlers::list_cameras))
        // SSE event stream
        .route("/events", get(super::sse::event_stream))
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        // Operator UI may be served from another origin
        .layer(CorsLayer::permissive())
}

/// Bind `0.0.0.0:port` and serve until `shutdown` resolves
pub async fn run<F>(ctx: AppContext, port: u16, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Http(format!("Failed to bind to {}: {}", addr, e)))?;

    serve(listener, ctx, shutdown).await
}

/// Serve on an already bound listener until `shutdown` resolves
///
/// On shutdown the session is cancelled (releasing the camera) and open SSE
/// streams are ended, so graceful shutdown does not wait on event
/// subscribers.
pub async fn serve<F>(listener: TcpListener, ctx: AppContext, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let session = ctx.session.clone();
    let closing = ctx.shutdown.clone();
    let app = build_router(ctx);

    let shutdown = async move {
        shutdown.await;
        info!("Shutdown requested, closing scan session");
        if let Err(e) = session.cancel().await {
            warn!("Failed to cancel session on shutdown: {}", e);
        }
        closing.cancel();
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Http(format!("Server error: {}", e)))?;

    info!("HTTP server stopped");
    Ok(())
}
