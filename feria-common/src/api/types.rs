//! Wire types for the ticketing backend
//!
//! The backend speaks Spanish field names; these types keep the wire names
//! via serde renames so the rest of the gate can use English identifiers.
//!
//! # Endpoint
//!
//! ```text
//! POST /validar-entrada
//! { "qr_payload": "<opaque>", "accion": "entrada" | "acreditacion" }
//!
//! 200 { "valido": bool, "mensaje": str, "entrada"?: {...}, "tipo_alerta"?: bool, "fecha_uso"?: str }
//! 4xx/5xx { "detail": str }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::Error;

// ========================================
// Scan Mode
// ========================================

/// Action the operator selected before scanning
///
/// Maps to the backend's `accion` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ScanMode {
    /// Consumer event ticket check-in
    #[default]
    #[serde(rename = "entrada")]
    EntryCheckIn,

    /// Staff/press accreditation check-in
    #[serde(rename = "acreditacion")]
    AccreditationCheckIn,
}

impl ScanMode {
    /// Wire value sent as `accion`
    pub fn as_wire(&self) -> &'static str {
        match self {
            ScanMode::EntryCheckIn => "entrada",
            ScanMode::AccreditationCheckIn => "acreditacion",
        }
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

impl FromStr for ScanMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "entrada" | "entry" => Ok(ScanMode::EntryCheckIn),
            "acreditacion" | "acreditación" | "accreditation" => {
                Ok(ScanMode::AccreditationCheckIn)
            }
            other => Err(Error::InvalidInput(format!("unknown scan mode '{}'", other))),
        }
    }
}

// ========================================
// Validation Request/Response
// ========================================

/// Body of `POST /validar-entrada`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRequest {
    /// Decoded QR payload, sent unmodified
    pub qr_payload: String,

    /// Operator-selected action
    pub accion: ScanMode,
}

/// Successful response of `POST /validar-entrada`
///
/// The server is authoritative on every field. `valido: false` with a 200
/// status is an ordinary rejection (for example an already-used ticket).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub valido: bool,

    #[serde(default)]
    pub mensaje: String,

    /// Ticket/accreditation fields echoed by the server
    #[serde(default)]
    pub entrada: Option<TicketDetails>,

    /// Escalate the rejection beyond an ordinary "invalid"
    #[serde(default)]
    pub tipo_alerta: Option<bool>,

    /// When the credential was first used (already-used rejections)
    #[serde(default)]
    pub fecha_uso: Option<String>,
}

/// Identifying fields of a ticket as echoed by the backend
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TicketDetails {
    #[serde(default)]
    pub nombre_evento: Option<String>,

    #[serde(default)]
    pub nombre_comprador: Option<String>,

    #[serde(default)]
    pub email_comprador: Option<String>,

    /// Any other field the server chose to include
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// FastAPI-style error body (`{"detail": ...}`)
///
/// `detail` is usually a string but validation errors (422) carry a list,
/// so it is kept as a raw JSON value.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub detail: Value,
}

impl ErrorDetail {
    /// The human-readable detail, if the server sent a non-empty string
    pub fn message(&self) -> Option<&str> {
        self.detail
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}
