//! HTTP request handlers
//!
//! Every session endpoint answers with the session snapshot taken right after
//! the command was applied, so the UI never needs a follow-up GET.

use axum::{extract::State, http::StatusCode, Json};
use feria_common::ScanMode;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::api::server::AppContext;
use crate::camera::CameraDevice;
use crate::error::Error;
use crate::session::SessionSnapshot;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
    git_hash: String,
    build_timestamp: String,
    build_profile: String,
    backend_url: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
pub struct ModeRequest {
    mode: ScanMode,
}

#[derive(Debug, Serialize)]
pub struct CameraListResponse {
    devices: Vec<CameraDevice>,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<StatusResponse>)>;

fn api_error(e: Error) -> (StatusCode, Json<StatusResponse>) {
    let code = match &e {
        Error::SessionClosed(_) => StatusCode::SERVICE_UNAVAILABLE,
        Error::Camera(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error!("Request failed: {}", e);
    (
        code,
        Json(StatusResponse {
            status: format!("error: {}", e),
        }),
    )
}

// ============================================================================
// Health Endpoint
// ============================================================================

/// GET /health
pub async fn health(State(ctx): State<AppContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "feria-gate".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: env!("GIT_HASH").to_string(),
        build_timestamp: env!("BUILD_TIMESTAMP").to_string(),
        build_profile: env!("BUILD_PROFILE").to_string(),
        backend_url: ctx.backend_url.clone(),
    })
}

// ============================================================================
// Session Endpoints
// ============================================================================

/// GET /session
pub async fn get_session(State(ctx): State<AppContext>) -> ApiResult<SessionSnapshot> {
    ctx.session.snapshot().await.map(Json).map_err(api_error)
}

/// POST /session/start - open the camera and begin scanning
pub async fn start(State(ctx): State<AppContext>) -> ApiResult<SessionSnapshot> {
    info!("Start requested");
    ctx.session.start().await.map(Json).map_err(api_error)
}

/// POST /session/cancel - close the scanner from any state
pub async fn cancel(State(ctx): State<AppContext>) -> ApiResult<SessionSnapshot> {
    info!("Cancel requested");
    ctx.session.cancel().await.map(Json).map_err(api_error)
}

/// POST /session/restart - scan the next credential
pub async fn restart(State(ctx): State<AppContext>) -> ApiResult<SessionSnapshot> {
    ctx.session.restart().await.map(Json).map_err(api_error)
}

/// POST /session/retry - reacquire the camera after a camera error
pub async fn retry(State(ctx): State<AppContext>) -> ApiResult<SessionSnapshot> {
    ctx.session.retry().await.map(Json).map_err(api_error)
}

/// POST /session/done - dismiss the result
pub async fn done(State(ctx): State<AppContext>) -> ApiResult<SessionSnapshot> {
    ctx.session.done().await.map(Json).map_err(api_error)
}

/// PUT /session/mode - `{"mode": "entrada" | "acreditacion"}`
pub async fn set_mode(
    State(ctx): State<AppContext>,
    Json(req): Json<ModeRequest>,
) -> ApiResult<SessionSnapshot> {
    ctx.session.set_mode(req.mode).await.map(Json).map_err(api_error)
}

// ============================================================================
// Device Endpoints
// ============================================================================

/// GET /cameras
pub async fn list_cameras(State(ctx): State<AppContext>) -> ApiResult<CameraListResponse> {
    let devices = ctx.session.cameras().await.map_err(api_error)?;
    info!("Found {} camera devices", devices.len());
    Ok(Json(CameraListResponse { devices }))
}
