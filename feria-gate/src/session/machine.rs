//! Scan session state machine
//!
//! ```text
//!            start                 detected               response(current)
//!   Idle ────────────▶ Scanning ─────────────▶ Validating ──────────────▶ Result
//!    ▲  ▲                │  ▲                                               │ │
//!    │  │  open failed / │  │ retry / restart                      restart  │ │
//!    │  │  stream lost   ▼  │                                               │ │
//!    │  └─── cancel ── CameraError                    Scanning ◀────────────┘ │
//!    └──────────────────────────────── done ──────────────────────────────────┘
//!              cancel from any state: loop stopped, camera closed, Idle
//! ```
//!
//! The machine is synchronous. It never awaits: camera open/close are
//! immediate, and the validation round trip is handed back to the caller as
//! a [`ValidationTicket`]. Responses carry the ticket number back, so a
//! response for a ticket that is no longer current is discarded.
//!
//! Invariant after every event: the camera is open iff the state is
//! `Scanning`.

use chrono::Utc;
use feria_common::events::CameraErrorKind;
use feria_common::{EventBus, GateEvent, ScanMode, SessionState, ValidationOutcome};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::camera::{CameraDevice, CameraError, CameraManager, Facing};
use crate::feedback::FeedbackSink;
use crate::scan::{ScanLoop, ScanLoopEvent};

/// Everything that can happen to a session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Operator opens the scanner
    Start,
    /// Operator retries after a camera error
    Retry,
    /// Operator asks for a fresh scan ("scan next")
    Restart,
    /// Operator finishes after a result
    Done,
    /// Operator closes the scanner
    Cancel,
    /// The scan loop decoded a payload
    Detected(String),
    /// The camera stream failed while scanning
    CameraFailed(CameraError),
    /// A validation round trip finished
    Response {
        ticket: u64,
        outcome: ValidationOutcome,
    },
    /// Operator changed the mode for subsequent validations
    SetMode(ScanMode),
}

impl SessionEvent {
    fn name(&self) -> &'static str {
        match self {
            SessionEvent::Start => "start",
            SessionEvent::Retry => "retry",
            SessionEvent::Restart => "restart",
            SessionEvent::Done => "done",
            SessionEvent::Cancel => "cancel",
            SessionEvent::Detected(_) => "detected",
            SessionEvent::CameraFailed(_) => "camera_failed",
            SessionEvent::Response { .. } => "response",
            SessionEvent::SetMode(_) => "set_mode",
        }
    }
}

/// A validation the caller must perform and report back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationTicket {
    pub number: u64,
    pub payload: String,
    pub mode: ScanMode,
}

/// The session record
#[derive(Debug, Clone)]
pub struct ScanSession {
    id: Uuid,
    state: SessionState,
    mode: ScanMode,
    last_decoded_payload: Option<String>,
    last_result: Option<ValidationOutcome>,
    camera_error: Option<CameraError>,
}

impl ScanSession {
    fn new(mode: ScanMode) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SessionState::Idle,
            mode,
            last_decoded_payload: None,
            last_result: None,
            camera_error: None,
        }
    }

    /// Forget everything except the mode
    fn reset(&mut self) {
        self.last_decoded_payload = None;
        self.last_result = None;
        self.camera_error = None;
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn mode(&self) -> ScanMode {
        self.mode
    }

    pub fn last_decoded_payload(&self) -> Option<&str> {
        self.last_decoded_payload.as_deref()
    }

    pub fn last_result(&self) -> Option<&ValidationOutcome> {
        self.last_result.as_ref()
    }

    pub fn camera_error(&self) -> Option<&CameraError> {
        self.camera_error.as_ref()
    }
}

/// Camera failure as shown to the operator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraErrorView {
    pub kind: CameraErrorKind,
    pub message: String,
}

/// Point-in-time view of the session for the control surface
///
/// The decoded payload is not included.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub state: SessionState,
    pub mode: ScanMode,
    pub camera_open: bool,
    pub camera_device: Option<CameraDevice>,
    pub camera_error: Option<CameraErrorView>,
    pub last_result: Option<ValidationOutcome>,
    pub pending_ticket: Option<u64>,
}

/// Scan session state machine
pub struct ScanSessionMachine {
    session: ScanSession,
    camera: CameraManager,
    scan_loop: ScanLoop,
    feedback: Arc<dyn FeedbackSink>,
    events: EventBus,
    preferred_facing: Facing,
    next_ticket: u64,
    pending_ticket: Option<u64>,
}

impl ScanSessionMachine {
    pub fn new(
        camera: CameraManager,
        scan_loop: ScanLoop,
        feedback: Arc<dyn FeedbackSink>,
        events: EventBus,
    ) -> Self {
        Self {
            session: ScanSession::new(ScanMode::default()),
            camera,
            scan_loop,
            feedback,
            events,
            preferred_facing: Facing::Environment,
            next_ticket: 1,
            pending_ticket: None,
        }
    }

    /// Initial mode selection
    pub fn with_mode(mut self, mode: ScanMode) -> Self {
        self.session.mode = mode;
        self
    }

    /// First facing tried when opening the camera
    pub fn with_preferred_facing(mut self, facing: Facing) -> Self {
        self.preferred_facing = facing;
        self
    }

    pub fn session(&self) -> &ScanSession {
        &self.session
    }

    pub fn state(&self) -> SessionState {
        self.session.state
    }

    pub fn is_scanning(&self) -> bool {
        self.session.state == SessionState::Scanning
    }

    pub fn camera(&self) -> &CameraManager {
        &self.camera
    }

    pub fn scan_loop(&self) -> &ScanLoop {
        &self.scan_loop
    }

    /// Ticket the machine is waiting for, if any
    pub fn pending_ticket(&self) -> Option<u64> {
        self.pending_ticket
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session.id,
            state: self.session.state,
            mode: self.session.mode,
            camera_open: self.camera.is_open(),
            camera_device: self.camera.active_device().cloned(),
            camera_error: self.session.camera_error.as_ref().map(|e| CameraErrorView {
                kind: e.kind(),
                message: e.to_string(),
            }),
            last_result: self.session.last_result.clone(),
            pending_ticket: self.pending_ticket,
        }
    }

    /// Apply one event
    ///
    /// Returns a ticket when the event started a validation. Events that are
    /// not valid in the current state are ignored.
    pub fn handle(&mut self, event: SessionEvent) -> Option<ValidationTicket> {
        let state = self.session.state;
        let name = event.name();
        let mut ticket = None;

        match (state, event) {
            (_, SessionEvent::Cancel) => self.cancel(),

            (_, SessionEvent::SetMode(mode)) => self.set_mode(mode),

            (SessionState::Idle, SessionEvent::Start) => {
                self.session.id = Uuid::new_v4();
                self.session.reset();
                self.begin_scanning();
            }

            (SessionState::CameraError, SessionEvent::Retry)
            | (SessionState::CameraError, SessionEvent::Restart) => {
                self.session.camera_error = None;
                self.begin_scanning();
            }

            (SessionState::Result, SessionEvent::Restart)
            | (SessionState::Scanning, SessionEvent::Restart) => {
                self.stop_scanning();
                self.session.id = Uuid::new_v4();
                self.session.reset();
                self.begin_scanning();
            }

            (SessionState::Result, SessionEvent::Done) => {
                self.session.reset();
                self.set_state(SessionState::Idle);
            }

            (SessionState::Scanning, SessionEvent::Detected(payload)) => {
                ticket = Some(self.begin_validation(payload));
            }

            (SessionState::Scanning, SessionEvent::CameraFailed(error)) => {
                self.stop_scanning();
                self.fail_camera(error);
            }

            (SessionState::Validating, SessionEvent::Response { ticket, outcome })
                if self.pending_ticket == Some(ticket) =>
            {
                self.complete_validation(outcome);
            }

            (_, SessionEvent::Response { ticket, .. }) => {
                debug!(ticket, state = %state, "Discarding stale validation response");
                self.events.emit_lossy(GateEvent::ValidationDiscarded {
                    ticket,
                    timestamp: Utc::now(),
                });
            }

            (state, _) => {
                debug!(event = name, state = %state, "Event ignored in current state");
            }
        }

        self.check_invariants();
        ticket
    }

    /// Wait for the scan loop's next detection or stream failure
    ///
    /// Never resolves unless the session is scanning.
    pub async fn next_scan_event(&mut self) -> SessionEvent {
        match self.scan_loop.next_detection(&mut self.camera).await {
            ScanLoopEvent::Detected(payload) => SessionEvent::Detected(payload),
            ScanLoopEvent::StreamFailed(error) => SessionEvent::CameraFailed(error),
        }
    }

    /// Run one scan attempt synchronously against the open camera
    pub fn sample_once(&mut self) -> Option<SessionEvent> {
        let handle = self.camera.handle_mut()?;
        match self.scan_loop.sample(handle)? {
            ScanLoopEvent::Detected(payload) => Some(SessionEvent::Detected(payload)),
            ScanLoopEvent::StreamFailed(error) => Some(SessionEvent::CameraFailed(error)),
        }
    }

    fn begin_scanning(&mut self) {
        match self.camera.open(self.preferred_facing) {
            Ok(handle) => {
                let device = handle.device().clone();
                self.session.camera_error = None;
                self.scan_loop.start();
                self.set_state(SessionState::Scanning);
                self.events.emit_lossy(GateEvent::CameraOpened {
                    session_id: self.session.id,
                    device_id: device.id,
                    device_label: device.label,
                    timestamp: Utc::now(),
                });
            }
            Err(error) => self.fail_camera(error),
        }
    }

    /// Stop the loop and release the camera; both are idempotent
    fn stop_scanning(&mut self) {
        self.scan_loop.stop();
        if self.camera.close() {
            self.events.emit_lossy(GateEvent::CameraClosed {
                session_id: self.session.id,
                timestamp: Utc::now(),
            });
        }
    }

    fn fail_camera(&mut self, error: CameraError) {
        warn!(session_id = %self.session.id, "Camera unavailable: {}", error);
        self.events.emit_lossy(GateEvent::CameraFailed {
            session_id: self.session.id,
            kind: error.kind(),
            message: error.to_string(),
            timestamp: Utc::now(),
        });
        self.session.camera_error = Some(error);
        self.set_state(SessionState::CameraError);
    }

    fn begin_validation(&mut self, payload: String) -> ValidationTicket {
        self.stop_scanning();

        let number = self.next_ticket;
        self.next_ticket += 1;
        self.pending_ticket = Some(number);
        self.session.last_decoded_payload = Some(payload.clone());

        info!(session_id = %self.session.id, ticket = number, mode = %self.session.mode, "Credential submitted for validation");
        self.events.emit_lossy(GateEvent::CodeDetected {
            session_id: self.session.id,
            mode: self.session.mode,
            timestamp: Utc::now(),
        });
        self.set_state(SessionState::Validating);

        ValidationTicket {
            number,
            payload,
            mode: self.session.mode,
        }
    }

    fn complete_validation(&mut self, outcome: ValidationOutcome) {
        self.pending_ticket = None;
        self.feedback.play(&outcome);

        info!(
            session_id = %self.session.id,
            valid = outcome.valid(),
            alert = outcome.alert(),
            "Validation result ready"
        );
        self.events.emit_lossy(GateEvent::ValidationCompleted {
            session_id: self.session.id,
            outcome: outcome.clone(),
            timestamp: Utc::now(),
        });
        self.session.last_result = Some(outcome);
        self.set_state(SessionState::Result);
    }

    fn cancel(&mut self) {
        self.stop_scanning();
        if let Some(ticket) = self.pending_ticket.take() {
            debug!(ticket, "Cancelled while validating, response will be discarded");
        }
        self.session.reset();
        self.set_state(SessionState::Idle);
    }

    fn set_mode(&mut self, mode: ScanMode) {
        if self.session.mode == mode {
            return;
        }
        info!(from = %self.session.mode, to = %mode, "Scan mode changed");
        self.session.mode = mode;
        self.events.emit_lossy(GateEvent::ModeChanged {
            mode,
            timestamp: Utc::now(),
        });
    }

    fn set_state(&mut self, state: SessionState) {
        if self.session.state == state {
            return;
        }
        debug!(session_id = %self.session.id, from = %self.session.state, to = %state, "Session state changed");
        self.session.state = state;
        self.events.emit_lossy(GateEvent::SessionStateChanged {
            session_id: self.session.id,
            state,
            mode: self.session.mode,
            timestamp: Utc::now(),
        });
    }

    fn check_invariants(&self) {
        debug_assert_eq!(
            self.camera.is_open(),
            self.session.state == SessionState::Scanning,
            "camera open must match Scanning state (state={})",
            self.session.state
        );
        debug_assert!(!self.scan_loop.is_running() || self.is_scanning());
        debug_assert_eq!(
            self.pending_ticket.is_some(),
            self.session.state == SessionState::Validating
        );
    }
}
