//! Server-Sent Events support

use crate::runtime::SessionEvent;
use crate::state_machine::Session;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Convert broadcast stream to SSE stream
pub fn sse_stream(
    initial: Session,
    broadcast_rx: tokio::sync::broadcast::Receiver<SessionEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Create stream that starts with the current snapshot then broadcasts
    let init = futures::stream::once(async move {
        Ok(to_sse("init", json!({ "type": "init", "session": initial })))
    });

    let broadcasts = BroadcastStream::new(broadcast_rx).filter_map(|result| match result {
        Ok(event) => Some(Ok(session_event_to_sse(event))),
        Err(_) => None, // Skip lagged messages; every snapshot is complete
    });

    Sse::new(init.chain(broadcasts)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn session_event_to_sse(event: SessionEvent) -> Event {
    match event {
        SessionEvent::Snapshot { session } => to_sse(
            "snapshot",
            json!({ "type": "snapshot", "session": session }),
        ),
        SessionEvent::Error { message } => {
            to_sse("error", json!({ "type": "error", "message": message }))
        }
    }
}

fn to_sse(event_type: &str, data: serde_json::Value) -> Event {
    Event::default().event(event_type).data(data.to_string())
}
