//! Server-Sent Events support

use crate::realtime::ActivityEvent;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Convert a session's broadcast stream to an SSE stream, starting with an
/// `init` event.
pub fn sse_stream(
    session_id: String,
    broadcast_rx: tokio::sync::broadcast::Receiver<ActivityEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let init = futures::stream::once(async move {
        Ok(activity_event_to_axum(&ActivityEvent::Init { session_id }))
    });

    let broadcasts = BroadcastStream::new(broadcast_rx).filter_map(|result| match result {
        Ok(event) => Some(Ok(activity_event_to_axum(&event))),
        Err(_) => None, // Skip lagged messages
    });

    let combined = init.chain(broadcasts);

    Sse::new(combined).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn activity_event_to_axum(event: &ActivityEvent) -> Event {
    let event_type = match event {
        ActivityEvent::Init { .. } => "init",
        ActivityEvent::Activity { .. } => "activity",
        ActivityEvent::Reply { .. } => "reply",
        ActivityEvent::Limit { .. } => "limit",
    };
    let data = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());

    Event::default().event(event_type).data(data)
}
