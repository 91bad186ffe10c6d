//! Server-Sent Events endpoint

use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;

use crate::api::server::AppContext;

/// GET /events - stream of session events, closed on server shutdown
pub async fn event_stream(
    State(ctx): State<AppContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    feria_common::sse::event_stream(&ctx.events, "feria-gate", ctx.shutdown.clone())
}
