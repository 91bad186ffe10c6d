//! In-process ticketing backend
//!
//! Serves `POST /api/validar-entrada` on an ephemeral loopback port with a
//! canned status and body, recording every request body.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Clone)]
enum Body {
    Json(Value),
    Text(String),
}

#[derive(Clone)]
struct Canned {
    status: StatusCode,
    body: Body,
    delay: Duration,
    requests: Arc<Mutex<Vec<Value>>>,
}

async fn validar_entrada(State(canned): State<Canned>, Json(request): Json<Value>) -> Response {
    canned.requests.lock().unwrap().push(request);
    if !canned.delay.is_zero() {
        tokio::time::sleep(canned.delay).await;
    }
    match canned.body {
        Body::Json(value) => (canned.status, Json(value)).into_response(),
        Body::Text(text) => {
            (canned.status, [(header::CONTENT_TYPE, "text/html")], text).into_response()
        }
    }
}

/// Running mock backend; stops when dropped
pub struct MockTicketBackend {
    pub base_url: String,
    requests: Arc<Mutex<Vec<Value>>>,
    task: JoinHandle<()>,
}

impl MockTicketBackend {
    /// Answer every request with `status` and JSON `body`
    pub async fn start(status: StatusCode, body: Value) -> Self {
        Self::start_with(status, Body::Json(body), Duration::ZERO).await
    }

    /// Answer with a non-JSON body
    pub async fn start_text(status: StatusCode, text: &str) -> Self {
        Self::start_with(status, Body::Text(text.to_string()), Duration::ZERO).await
    }

    /// Answer after `delay`
    pub async fn start_delayed(status: StatusCode, body: Value, delay: Duration) -> Self {
        Self::start_with(status, Body::Json(body), delay).await
    }

    async fn start_with(status: StatusCode, body: Body, delay: Duration) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let canned = Canned {
            status,
            body,
            delay,
            requests: Arc::clone(&requests),
        };

        let app = Router::new()
            .route("/api/validar-entrada", post(validar_entrada))
            .with_state(canned);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}/api", addr),
            requests,
            task,
        }
    }

    /// Request bodies received so far
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for MockTicketBackend {
    fn drop(&mut self) {
        self.task.abort();
    }
}
