//! Server-Sent Events (SSE) utilities
//!
//! Streams `GateEvent`s from an `EventBus` to HTTP clients.

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::events::{EventBus, GateEvent};

/// Convert a gate event into an SSE frame
///
/// Returns `None` if the event cannot be serialized.
pub fn to_sse_event(event: &GateEvent) -> Option<Event> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Event::default().event(event.event_type()).data(json)),
        Err(e) => {
            warn!("Failed to serialize event: {}", e);
            None
        }
    }
}

/// Create an SSE stream of all events emitted on `bus` after subscription
///
/// The first frame is a `ConnectionStatus: connected` marker so the UI can
/// show connection state before any session activity. Lagged subscribers skip
/// the events they missed. The stream ends when `shutdown` is cancelled.
pub fn event_stream(
    bus: &EventBus,
    service_name: &'static str,
    shutdown: CancellationToken,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected to {} events", service_name);

    let rx = bus.subscribe();
    let connected = futures::stream::once(async {
        Ok(Event::default().event("ConnectionStatus").data("connected"))
    });

    let events = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(event) => {
                debug!("Broadcasting SSE event: {}", event.event_type());
                to_sse_event(&event).map(Ok)
            }
            Err(e) => {
                // Lagged: the receiver skipped ahead, keep streaming
                warn!("SSE stream error: {:?}", e);
                None
            }
        }
    });

    let stream = connected
        .chain(events)
        .take_until(async move { shutdown.cancelled().await });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::ScanMode;

    #[test]
    fn test_to_sse_event() {
        let event = GateEvent::ModeChanged {
            mode: ScanMode::AccreditationCheckIn,
            timestamp: chrono::Utc::now(),
        };
        assert!(to_sse_event(&event).is_some());
    }

    #[tokio::test]
    async fn test_stream_ends_on_shutdown() {
        use axum::response::IntoResponse;

        let bus = EventBus::new(8);
        let shutdown = CancellationToken::new();
        let body = event_stream(&bus, "test", shutdown.clone())
            .into_response()
            .into_body();

        let trigger = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let bytes = tokio::time::timeout(
            Duration::from_secs(2),
            axum::body::to_bytes(body, usize::MAX),
        )
        .await
        .expect("stream ends after shutdown")
        .unwrap();

        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("event: ConnectionStatus"));
        assert_eq!(bus.subscriber_count(), 0);
    }
}
