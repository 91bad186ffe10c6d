//! Test helper modules for feria-gate integration tests
//!
//! Provides reusable test infrastructure components:
//! - MockCameraBackend: scripted cameras with open/release counters
//! - FrameScript + MarkerDecoder: frames that "contain" a chosen payload
//! - RecordingFeedback / ScriptedValidator: session collaborators
//! - MockTicketBackend: in-process `/validar-entrada` server
//! - TestGate: machine or running driver wired from the above

#![allow(dead_code)]

pub mod doubles;
pub mod mock_backend;
pub mod mock_camera;

pub use doubles::{
    accepted_outcome, already_used_outcome, RecordingFeedback, ScriptedValidator,
};
pub use mock_backend::MockTicketBackend;
pub use mock_camera::{CameraStats, FrameScript, MarkerDecoder, MockCamera, MockCameraBackend};

use feria_common::{EventBus, SessionState};
use feria_gate::camera::CameraManager;
use feria_gate::scan::{ScanLoop, ScanLoopConfig};
use feria_gate::session::{ScanSessionMachine, SessionDriver, SessionHandle, SessionSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Fast sampling for tests
pub fn test_loop_config() -> ScanLoopConfig {
    ScanLoopConfig {
        fps: 100,
        ..Default::default()
    }
}

/// Everything a session test needs to observe
pub struct TestGate {
    pub camera: Arc<MockCameraBackend>,
    pub script: Arc<FrameScript>,
    pub feedback: Arc<RecordingFeedback>,
    pub events: EventBus,
}

impl TestGate {
    /// Rear and front cameras, both working
    pub fn new() -> Self {
        Self::with_backend(MockCameraBackend::rear_and_front())
    }

    pub fn with_backend(backend: MockCameraBackend) -> Self {
        let script = backend.script();
        Self {
            camera: Arc::new(backend),
            script,
            feedback: Arc::new(RecordingFeedback::default()),
            events: EventBus::new(256),
        }
    }

    pub fn machine(&self) -> ScanSessionMachine {
        ScanSessionMachine::new(
            CameraManager::new(Arc::clone(&self.camera) as Arc<dyn feria_gate::camera::CameraBackend>),
            ScanLoop::new(Box::new(self.camera.decoder()), test_loop_config()),
            Arc::clone(&self.feedback) as Arc<dyn feria_gate::feedback::FeedbackSink>,
            self.events.clone(),
        )
    }

    /// Spawn a driver around a fresh machine
    pub fn spawn(&self, validator: Arc<ScriptedValidator>) -> (SessionHandle, JoinHandle<()>) {
        SessionDriver::spawn(self.machine(), validator, self.events.clone())
    }

    pub fn stats(&self) -> CameraStats {
        self.camera.stats()
    }
}

/// Poll the session until `predicate` holds, failing after two seconds
pub async fn wait_for<F>(session: &SessionHandle, predicate: F) -> SessionSnapshot
where
    F: Fn(&SessionSnapshot) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let snapshot = session.snapshot().await.expect("driver running");
        if predicate(&snapshot) {
            return snapshot;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("Timed out waiting for session, last snapshot: {:?}", snapshot);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Poll until the session reaches `state`
pub async fn wait_for_state(session: &SessionHandle, state: SessionState) -> SessionSnapshot {
    wait_for(session, |s| s.state == state).await
}
