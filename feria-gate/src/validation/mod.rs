//! Validation client
//!
//! Submits a decoded credential payload to the ticketing backend and turns
//! whatever comes back into a [`ValidationOutcome`]. Every call is a fresh
//! request; the backend is the only authority on whether a credential is
//! valid or already used.
//!
//! **Outcome mapping:**
//! - 2xx with a parseable body: built from the body
//! - 4xx: `InvalidCredential`, message from `detail` or the generic message
//! - 5xx and other statuses: `NetworkFailure`, same message rule
//! - transport error, timeout, unparseable 2xx body: `NetworkFailure`

use async_trait::async_trait;
use feria_common::api::types::{ErrorDetail, ValidationRequest, ValidationResponse};
use feria_common::outcome::GENERIC_FAILURE_MESSAGE;
use feria_common::{RejectionKind, ScanMode, ValidationOutcome};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Path of the validation endpoint under the backend base URL
pub const VALIDATE_PATH: &str = "validar-entrada";

const USER_AGENT: &str = concat!("feria-gate/", env!("CARGO_PKG_VERSION"));

const TIMEOUT_MESSAGE: &str = "Tiempo de espera agotado al validar la entrada";
const CONNECT_MESSAGE: &str = "No se pudo conectar con el servidor de validación";

/// Anything that can validate a credential payload
///
/// Implementations must not fail: every problem becomes a failed outcome.
#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(&self, payload: &str, mode: ScanMode) -> ValidationOutcome;
}

/// HTTP validation client for `POST {backend}/validar-entrada`
#[derive(Debug, Clone)]
pub struct ValidationClient {
    http_client: reqwest::Client,
    endpoint: String,
}

impl ValidationClient {
    /// Create a client for `backend_url`
    ///
    /// `timeout` bounds the whole round trip; `None` waits indefinitely.
    pub fn new(backend_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| Error::HttpClient(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: endpoint_for(backend_url),
        })
    }

    /// Full URL requests are posted to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn endpoint_for(backend_url: &str) -> String {
    format!("{}/{}", backend_url.trim_end_matches('/'), VALIDATE_PATH)
}

fn transport_failure(error: &reqwest::Error) -> ValidationOutcome {
    let message = if error.is_timeout() {
        TIMEOUT_MESSAGE
    } else if error.is_connect() {
        CONNECT_MESSAGE
    } else {
        GENERIC_FAILURE_MESSAGE
    };
    ValidationOutcome::failure(RejectionKind::NetworkFailure, message)
}

#[async_trait]
impl Validator for ValidationClient {
    async fn validate(&self, payload: &str, mode: ScanMode) -> ValidationOutcome {
        let request = ValidationRequest {
            qr_payload: payload.to_string(),
            accion: mode,
        };

        debug!(endpoint = %self.endpoint, mode = %mode, "Submitting credential for validation");

        let response = match self
            .http_client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(endpoint = %self.endpoint, "Validation request failed: {}", e);
                return transport_failure(&e);
            }
        };

        let status = response.status();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                warn!(status = %status, "Failed to read validation response: {}", e);
                return transport_failure(&e);
            }
        };

        if status.is_success() {
            return match serde_json::from_slice::<ValidationResponse>(&body) {
                Ok(parsed) => {
                    let outcome = ValidationOutcome::from_response(parsed);
                    info!(
                        valid = outcome.valid(),
                        alert = outcome.alert(),
                        rejection = ?outcome.rejection(),
                        "Validation completed"
                    );
                    outcome
                }
                Err(e) => {
                    warn!(status = %status, "Unparseable validation response: {}", e);
                    ValidationOutcome::failure(RejectionKind::NetworkFailure, GENERIC_FAILURE_MESSAGE)
                }
            };
        }

        let detail = serde_json::from_slice::<ErrorDetail>(&body)
            .ok()
            .and_then(|d| d.message().map(str::to_string))
            .unwrap_or_default();

        let kind = if status.is_client_error() {
            RejectionKind::InvalidCredential
        } else {
            RejectionKind::NetworkFailure
        };

        warn!(status = %status, kind = ?kind, detail = %detail, "Validation rejected by backend");
        ValidationOutcome::failure(kind, detail)
    }
}
