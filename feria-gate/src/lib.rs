//! # Ciudad Feria Gate Library (feria-gate)
//!
//! Entry and accreditation validation station.
//!
//! **Purpose:** Acquire a camera, decode a credential QR code, submit it to
//! the ticketing backend, and turn the answer into pass/fail feedback for the
//! operator, without double scans or leaked camera handles.
//!
//! **Architecture:** One session driver task owns the scan session state
//! machine, which in turn owns the camera manager, scan loop and feedback
//! sink. Operators drive it over the HTTP/SSE control surface.

pub mod api;
pub mod camera;
pub mod config;
pub mod error;
pub mod feedback;
pub mod scan;
pub mod session;
pub mod validation;

pub use config::{GateArgs, GateConfig};
pub use error::{Error, Result};

use feria_common::EventBus;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

use camera::{CameraManager, FrameDirectoryBackend};
use feedback::{FeedbackSink, SilentFeedback, ToneFeedback};
use scan::{QrDecoder, ScanLoop};
use session::{ScanSessionMachine, SessionDriver, SessionHandle};
use validation::ValidationClient;

/// Capacity of the gate event bus
pub const EVENT_BUS_CAPACITY: usize = 256;

/// Wire up the production session from `config` and spawn its driver
pub fn spawn_session(config: &GateConfig, events: EventBus) -> Result<(SessionHandle, JoinHandle<()>)> {
    let backend = Arc::new(FrameDirectoryBackend::new(config.camera.devices.clone()));
    let camera = CameraManager::new(backend);
    let scan_loop = ScanLoop::new(Box::new(QrDecoder), config.scan.loop_config());

    let feedback: Arc<dyn FeedbackSink> = if config.feedback.enabled {
        Arc::new(ToneFeedback::new(config.feedback.volume))
    } else {
        info!("Audio feedback disabled");
        Arc::new(SilentFeedback)
    };

    let validator = Arc::new(ValidationClient::new(
        &config.backend_url,
        config.validation.timeout(),
    )?);
    info!("Validating against {}", validator.endpoint());

    let machine = ScanSessionMachine::new(camera, scan_loop, feedback, events.clone())
        .with_mode(config.default_mode)
        .with_preferred_facing(config.preferred_facing);

    Ok(SessionDriver::spawn(machine, validator, events))
}
