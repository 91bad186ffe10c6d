//! Event types for the gate event system
//!
//! The scan session publishes every observable change as a `GateEvent` on a
//! broadcast `EventBus`. The operator UI consumes them over SSE.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::api::types::ScanMode;
use crate::outcome::ValidationOutcome;

/// Scan session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Initial and resting state between attempts
    Idle,
    /// Camera open, scan loop sampling frames
    Scanning,
    /// Camera closed, one validation request in flight
    Validating,
    /// Outcome available
    Result,
    /// Camera acquisition cascade exhausted or stream lost
    CameraError,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionState::Idle => "idle",
            SessionState::Scanning => "scanning",
            SessionState::Validating => "validating",
            SessionState::Result => "result",
            SessionState::CameraError => "camera_error",
        };
        f.write_str(s)
    }
}

/// Kind of camera acquisition failure surfaced to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraErrorKind {
    PermissionDenied,
    NoCameraAvailable,
    DeviceBusy,
}

/// Gate event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GateEvent {
    /// Session moved to a new state
    SessionStateChanged {
        session_id: Uuid,
        state: SessionState,
        mode: ScanMode,
        timestamp: DateTime<Utc>,
    },

    /// Mode selection changed
    ModeChanged {
        mode: ScanMode,
        timestamp: DateTime<Utc>,
    },

    /// Camera stream opened for a session
    CameraOpened {
        session_id: Uuid,
        device_id: String,
        device_label: String,
        timestamp: DateTime<Utc>,
    },

    /// Camera stream released
    CameraClosed {
        session_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// Camera could not be acquired, or the stream failed while scanning
    CameraFailed {
        session_id: Uuid,
        kind: CameraErrorKind,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// A credential code was decoded and submitted
    ///
    /// The payload itself is not broadcast.
    CodeDetected {
        session_id: Uuid,
        mode: ScanMode,
        timestamp: DateTime<Utc>,
    },

    /// Validation finished and the session entered `Result`
    ValidationCompleted {
        session_id: Uuid,
        outcome: ValidationOutcome,
        timestamp: DateTime<Utc>,
    },

    /// A response arrived for a ticket the session no longer waits for
    ValidationDiscarded {
        ticket: u64,
        timestamp: DateTime<Utc>,
    },
}

impl GateEvent {
    /// Event name used for the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            GateEvent::SessionStateChanged { .. } => "SessionStateChanged",
            GateEvent::ModeChanged { .. } => "ModeChanged",
            GateEvent::CameraOpened { .. } => "CameraOpened",
            GateEvent::CameraClosed { .. } => "CameraClosed",
            GateEvent::CameraFailed { .. } => "CameraFailed",
            GateEvent::CodeDetected { .. } => "CodeDetected",
            GateEvent::ValidationCompleted { .. } => "ValidationCompleted",
            GateEvent::ValidationDiscarded { .. } => "ValidationDiscarded",
        }
    }
}

/// One-to-many event broadcaster
///
/// Thin wrapper over `tokio::sync::broadcast`. Slow subscribers lag and lose
/// the oldest events instead of blocking the session.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<GateEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<GateEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: GateEvent) -> Result<usize, broadcast::error::SendError<GateEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: GateEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("capacity", &self.capacity)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
