//! Feedback and validator doubles

use async_trait::async_trait;
use feria_common::api::types::{TicketDetails, ValidationResponse};
use feria_common::{RejectionKind, ScanMode, ValidationOutcome};
use feria_gate::feedback::{FeedbackCue, FeedbackSink};
use feria_gate::validation::Validator;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::Semaphore;

/// Feedback sink that remembers every cue
#[derive(Default)]
pub struct RecordingFeedback {
    played: Mutex<Vec<ValidationOutcome>>,
}

impl RecordingFeedback {
    pub fn count(&self) -> usize {
        self.played.lock().unwrap().len()
    }

    pub fn cues(&self) -> Vec<FeedbackCue> {
        self.played
            .lock()
            .unwrap()
            .iter()
            .map(FeedbackCue::for_outcome)
            .collect()
    }

    pub fn last(&self) -> Option<ValidationOutcome> {
        self.played.lock().unwrap().last().cloned()
    }
}

impl FeedbackSink for RecordingFeedback {
    fn play(&self, outcome: &ValidationOutcome) {
        self.played.lock().unwrap().push(outcome.clone());
    }
}

/// Validator answering from a queue
///
/// With [`hold`](Self::hold), each call waits for one [`release`](Self::release).
/// An empty queue answers with a network failure.
pub struct ScriptedValidator {
    responses: Mutex<VecDeque<ValidationOutcome>>,
    calls: Mutex<Vec<(String, ScanMode)>>,
    gate: Option<Semaphore>,
}

impl ScriptedValidator {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// Calls block until released
    pub fn hold() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new()
        }
    }

    pub fn respond_with(self, outcome: ValidationOutcome) -> Self {
        self.push(outcome);
        self
    }

    pub fn push(&self, outcome: ValidationOutcome) {
        self.responses.lock().unwrap().push_back(outcome);
    }

    /// Let one held call finish
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub fn calls(&self) -> Vec<(String, ScanMode)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Validator for ScriptedValidator {
    async fn validate(&self, payload: &str, mode: ScanMode) -> ValidationOutcome {
        self.calls.lock().unwrap().push((payload.to_string(), mode));

        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        let next = self.responses.lock().unwrap().pop_front();
        next.unwrap_or_else(|| {
            ValidationOutcome::failure(RejectionKind::NetworkFailure, "sin respuesta")
        })
    }
}

/// `{valido: true, mensaje: "Entrada válida", entrada: {...}}`
pub fn accepted_outcome() -> ValidationOutcome {
    ValidationOutcome::from_response(ValidationResponse {
        valido: true,
        mensaje: "Entrada válida".to_string(),
        entrada: Some(TicketDetails {
            nombre_evento: Some("Feria de Sevilla".to_string()),
            nombre_comprador: Some("Ana Pérez".to_string()),
            email_comprador: Some("ana@example.org".to_string()),
            ..Default::default()
        }),
        tipo_alerta: None,
        fecha_uso: None,
    })
}

/// `{valido: false, mensaje: "Esta entrada ya fue utilizada", tipo_alerta: true}`
pub fn already_used_outcome() -> ValidationOutcome {
    ValidationOutcome::from_response(ValidationResponse {
        valido: false,
        mensaje: "Esta entrada ya fue utilizada".to_string(),
        entrada: None,
        tipo_alerta: Some(true),
        fecha_uso: None,
    })
}
