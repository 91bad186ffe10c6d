//! Scan session orchestration
//!
//! - [`machine`]: the synchronous state machine that owns the camera, scan
//!   loop and feedback sink and decides every transition
//! - [`driver`]: the tokio task that feeds operator commands, detections and
//!   validation completions into the machine, one at a time

pub mod driver;
pub mod machine;

pub use driver::{OperatorAction, SessionDriver, SessionHandle};
pub use machine::{
    ScanSession, ScanSessionMachine, SessionEvent, SessionSnapshot, ValidationTicket,
};
