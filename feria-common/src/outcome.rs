//! Validation outcome value objects
//!
//! A `ValidationOutcome` is what the gate shows and sounds after a scan. It is
//! either built from the backend's authoritative response or synthesized
//! locally when the round trip fails. Outcomes are immutable: a new scan
//! produces a new outcome that replaces the previous one.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api::types::{TicketDetails, ValidationResponse};

/// Message used when a failure carries no usable detail
pub const GENERIC_FAILURE_MESSAGE: &str = "Error al validar la entrada";

/// Why a credential was not accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    /// Transport failure, timeout, 5xx or unreadable response
    NetworkFailure,
    /// Corrupt, forged or unknown credential
    InvalidCredential,
    /// Credential was already validated once
    AlreadyUsedCredential,
    /// Credential belongs to a different event
    WrongEventCredential,
}

/// Subset of ticket/accreditation fields shown to the operator
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TicketSummary {
    pub event_name: Option<String>,
    pub holder_name: Option<String>,
    pub holder_email: Option<String>,

    /// Fields beyond the three above, as echoed by the server
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl From<TicketDetails> for TicketSummary {
    fn from(details: TicketDetails) -> Self {
        Self {
            event_name: details.nombre_evento,
            holder_name: details.nombre_comprador,
            holder_email: details.email_comprador,
            extra: details.extra,
        }
    }
}

/// Result of one validation round trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    valid: bool,
    message: String,
    ticket: Option<TicketSummary>,
    alert: bool,
    used_at: Option<String>,
    rejection: Option<RejectionKind>,
}

impl ValidationOutcome {
    /// Build an outcome from a successful (2xx) backend response
    pub fn from_response(response: ValidationResponse) -> Self {
        let alert = response.tipo_alerta.unwrap_or(false);
        let ticket = response.entrada.map(TicketSummary::from);

        if response.valido {
            return Self {
                valid: true,
                message: response.mensaje,
                ticket,
                alert,
                used_at: response.fecha_uso,
                rejection: None,
            };
        }

        let rejection = classify_rejection(&response.mensaje, response.fecha_uso.is_some());
        Self {
            valid: false,
            message: non_empty_or_generic(response.mensaje),
            ticket,
            alert,
            used_at: response.fecha_uso,
            rejection: Some(rejection),
        }
    }

    /// Synthesize a failed outcome locally (transport or HTTP failure)
    ///
    /// An empty message is replaced by [`GENERIC_FAILURE_MESSAGE`].
    pub fn failure(kind: RejectionKind, message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: non_empty_or_generic(message.into()),
            ticket: None,
            alert: false,
            used_at: None,
            rejection: Some(kind),
        }
    }

    pub fn valid(&self) -> bool {
        self.valid
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn ticket(&self) -> Option<&TicketSummary> {
        self.ticket.as_ref()
    }

    /// Whether the rejection warrants an escalated cue
    pub fn alert(&self) -> bool {
        self.alert
    }

    pub fn used_at(&self) -> Option<&str> {
        self.used_at.as_deref()
    }

    /// `None` iff the credential was accepted
    pub fn rejection(&self) -> Option<RejectionKind> {
        self.rejection
    }
}

fn non_empty_or_generic(message: String) -> String {
    if message.trim().is_empty() {
        GENERIC_FAILURE_MESSAGE.to_string()
    } else {
        message
    }
}

/// Classify a server-side rejection (`valido: false` with a 2xx status)
///
/// The backend does not send a machine-readable reason, so this keys on the
/// `fecha_uso` echo and on the message wording.
fn classify_rejection(message: &str, has_used_at: bool) -> RejectionKind {
    let lower = message.to_lowercase();

    if has_used_at || lower.contains("utilizada") || lower.contains("already used") {
        RejectionKind::AlreadyUsedCredential
    } else if lower.contains("evento") || lower.contains("wrong event") {
        RejectionKind::WrongEventCredential
    } else {
        RejectionKind::InvalidCredential
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(body: Value) -> ValidationResponse {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_valid_response_keeps_ticket() {
        let outcome = ValidationOutcome::from_response(response(json!({
            "valido": true,
            "mensaje": "Entrada válida",
            "entrada": {
                "nombre_evento": "Feria Taurina",
                "nombre_comprador": "Luis Gómez",
                "email_comprador": "luis@example.com"
            }
        })));

        assert!(outcome.valid());
        assert_eq!(outcome.message(), "Entrada válida");
        assert_eq!(outcome.rejection(), None);
        assert!(!outcome.alert());

        let ticket = outcome.ticket().unwrap();
        assert_eq!(ticket.event_name.as_deref(), Some("Feria Taurina"));
        assert_eq!(ticket.holder_name.as_deref(), Some("Luis Gómez"));
        assert_eq!(ticket.holder_email.as_deref(), Some("luis@example.com"));
    }

    #[test]
    fn test_already_used_with_alert() {
        let outcome = ValidationOutcome::from_response(response(json!({
            "valido": false,
            "mensaje": "Esta entrada ya fue utilizada",
            "tipo_alerta": true
        })));

        assert!(!outcome.valid());
        assert!(outcome.alert());
        assert_eq!(outcome.rejection(), Some(RejectionKind::AlreadyUsedCredential));
    }

    #[test]
    fn test_used_at_implies_already_used() {
        let outcome = ValidationOutcome::from_response(response(json!({
            "valido": false,
            "mensaje": "Rechazada",
            "fecha_uso": "2026-01-20T21:04:00+00:00"
        })));

        assert_eq!(outcome.rejection(), Some(RejectionKind::AlreadyUsedCredential));
        assert_eq!(outcome.used_at(), Some("2026-01-20T21:04:00+00:00"));
    }

    #[test]
    fn test_wrong_event_classification() {
        let outcome = ValidationOutcome::from_response(response(json!({
            "valido": false,
            "mensaje": "La entrada pertenece a otro evento",
            "tipo_alerta": true
        })));

        assert_eq!(outcome.rejection(), Some(RejectionKind::WrongEventCredential));
    }

    #[test]
    fn test_server_rejection_with_empty_message_gets_generic() {
        let outcome = ValidationOutcome::from_response(response(json!({"valido": false})));

        assert_eq!(outcome.message(), GENERIC_FAILURE_MESSAGE);
        assert_eq!(outcome.rejection(), Some(RejectionKind::InvalidCredential));
    }

    #[test]
    fn test_local_failure_never_has_empty_message() {
        let outcome = ValidationOutcome::failure(RejectionKind::NetworkFailure, "   ");
        assert!(!outcome.valid());
        assert_eq!(outcome.message(), GENERIC_FAILURE_MESSAGE);
        assert!(outcome.ticket().is_none());

        let outcome = ValidationOutcome::failure(RejectionKind::InvalidCredential, "Entrada no encontrada");
        assert_eq!(outcome.message(), "Entrada no encontrada");
    }

    #[test]
    fn test_outcome_serializes_for_events() {
        let outcome = ValidationOutcome::failure(RejectionKind::NetworkFailure, "timeout");
        let value = serde_json::to_value(&outcome).unwrap();

        assert_eq!(value["valid"], false);
        assert_eq!(value["rejection"], "network_failure");
        assert_eq!(value["message"], "timeout");
    }
}
