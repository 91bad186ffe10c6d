//! # Ciudad Feria Common Library
//!
//! Shared code for the entry/accreditation gate:
//! - Backend wire types (`/validar-entrada` request and response)
//! - Validation outcome value objects
//! - Event types (`GateEvent`) and the broadcast `EventBus`
//! - SSE streaming of gate events
//! - TOML configuration helpers

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod outcome;
pub mod sse;

pub use api::types::ScanMode;
pub use error::{Error, Result};
pub use events::{EventBus, GateEvent, SessionState};
pub use outcome::{RejectionKind, TicketSummary, ValidationOutcome};
