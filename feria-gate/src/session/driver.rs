//! Session driver task
//!
//! Single tokio task that owns the [`ScanSessionMachine`] and serialises
//! everything that can happen to it:
//!
//! - operator commands from [`SessionHandle`]s (mpsc, with a snapshot reply)
//! - the scan loop's next detection, polled only while scanning
//! - the one in-flight validation request
//!
//! A new validation ticket replaces (drops) any previous in-flight request,
//! so at most one request is outstanding. A request whose ticket was
//! cancelled keeps running until it resolves or is replaced; its response is
//! then fed to the machine, which discards it.

use feria_common::{EventBus, GateEvent, ScanMode, ValidationOutcome};
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::machine::{ScanSessionMachine, SessionEvent, SessionSnapshot, ValidationTicket};
use crate::camera::{CameraDevice, CameraError};
use crate::error::{Error, Result};
use crate::validation::Validator;

const COMMAND_CAPACITY: usize = 32;

/// Operator action on the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorAction {
    Start,
    Cancel,
    Restart,
    Retry,
    Done,
    SetMode(ScanMode),
}

impl From<OperatorAction> for SessionEvent {
    fn from(action: OperatorAction) -> Self {
        match action {
            OperatorAction::Start => SessionEvent::Start,
            OperatorAction::Cancel => SessionEvent::Cancel,
            OperatorAction::Restart => SessionEvent::Restart,
            OperatorAction::Retry => SessionEvent::Retry,
            OperatorAction::Done => SessionEvent::Done,
            OperatorAction::SetMode(mode) => SessionEvent::SetMode(mode),
        }
    }
}

enum SessionCommand {
    Apply(OperatorAction, oneshot::Sender<SessionSnapshot>),
    Snapshot(oneshot::Sender<SessionSnapshot>),
    Cameras(oneshot::Sender<std::result::Result<Vec<CameraDevice>, CameraError>>),
}

type InFlight = BoxFuture<'static, (u64, ValidationOutcome)>;

/// Owns the state machine and runs the session event loop
pub struct SessionDriver {
    machine: ScanSessionMachine,
    validator: Arc<dyn Validator>,
    commands: mpsc::Receiver<SessionCommand>,
    in_flight: Option<InFlight>,
}

impl SessionDriver {
    /// Create a driver and the first handle to it
    ///
    /// `events` must be the bus the machine publishes on.
    pub fn new(
        machine: ScanSessionMachine,
        validator: Arc<dyn Validator>,
        events: EventBus,
    ) -> (Self, SessionHandle) {
        let (tx, rx) = mpsc::channel(COMMAND_CAPACITY);
        let driver = Self {
            machine,
            validator,
            commands: rx,
            in_flight: None,
        };
        (driver, SessionHandle { tx, events })
    }

    /// Spawn the driver on the current tokio runtime
    pub fn spawn(
        machine: ScanSessionMachine,
        validator: Arc<dyn Validator>,
        events: EventBus,
    ) -> (SessionHandle, JoinHandle<()>) {
        let (driver, handle) = Self::new(machine, validator, events);
        let task = tokio::spawn(driver.run());
        (handle, task)
    }

    /// Run until every [`SessionHandle`] is dropped
    ///
    /// On exit the session is cancelled, which releases the camera.
    pub async fn run(mut self) {
        info!("Session driver started");

        loop {
            let scanning = self.machine.is_scanning();
            let validating = self.in_flight.is_some();

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.on_command(command),
                    None => break,
                },

                event = self.machine.next_scan_event(), if scanning => {
                    self.dispatch(event);
                }

                (ticket, outcome) = next_response(&mut self.in_flight), if validating => {
                    self.in_flight = None;
                    self.dispatch(SessionEvent::Response { ticket, outcome });
                }
            }
        }

        self.machine.handle(SessionEvent::Cancel);
        info!("Session driver stopped");
    }

    fn on_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Apply(action, reply) => {
                debug!(action = ?action, "Operator action");
                self.dispatch(action.into());
                let _ = reply.send(self.machine.snapshot());
            }
            SessionCommand::Snapshot(reply) => {
                let _ = reply.send(self.machine.snapshot());
            }
            SessionCommand::Cameras(reply) => {
                let _ = reply.send(self.machine.camera().devices());
            }
        }
    }

    fn dispatch(&mut self, event: SessionEvent) {
        if let Some(ticket) = self.machine.handle(event) {
            if self.in_flight.is_some() {
                debug!(ticket = ticket.number, "Dropping superseded validation request");
            }
            self.in_flight = Some(self.validate(ticket));
        }
    }

    fn validate(&self, ticket: ValidationTicket) -> InFlight {
        let validator = Arc::clone(&self.validator);
        Box::pin(async move {
            let outcome = validator.validate(&ticket.payload, ticket.mode).await;
            (ticket.number, outcome)
        })
    }
}

async fn next_response(in_flight: &mut Option<InFlight>) -> (u64, ValidationOutcome) {
    match in_flight.as_mut() {
        Some(request) => request.await,
        None => std::future::pending().await,
    }
}

/// Cloneable front door to a running [`SessionDriver`]
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCommand>,
    events: EventBus,
}

impl SessionHandle {
    async fn apply(&self, action: OperatorAction) -> Result<SessionSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Apply(action, reply)).await?;
        rx.await
            .map_err(|_| Error::SessionClosed("driver dropped the reply".to_string()))
    }

    async fn send(&self, command: SessionCommand) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| Error::SessionClosed("driver is not running".to_string()))
    }

    pub async fn start(&self) -> Result<SessionSnapshot> {
        self.apply(OperatorAction::Start).await
    }

    /// Cancel the session; the camera is released before this returns
    pub async fn cancel(&self) -> Result<SessionSnapshot> {
        self.apply(OperatorAction::Cancel).await
    }

    pub async fn restart(&self) -> Result<SessionSnapshot> {
        self.apply(OperatorAction::Restart).await
    }

    pub async fn retry(&self) -> Result<SessionSnapshot> {
        self.apply(OperatorAction::Retry).await
    }

    pub async fn done(&self) -> Result<SessionSnapshot> {
        self.apply(OperatorAction::Done).await
    }

    pub async fn set_mode(&self, mode: ScanMode) -> Result<SessionSnapshot> {
        self.apply(OperatorAction::SetMode(mode)).await
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Snapshot(reply)).await?;
        rx.await
            .map_err(|_| Error::SessionClosed("driver dropped the reply".to_string()))
    }

    /// Enumerate camera devices through the session's camera manager
    pub async fn cameras(&self) -> Result<Vec<CameraDevice>> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Cameras(reply)).await?;
        let devices = rx
            .await
            .map_err(|_| Error::SessionClosed("driver dropped the reply".to_string()))?;
        Ok(devices?)
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<GateEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }
}
