//! Server-Sent Events (SSE) handler.
//!
//! Subscribes to the [`rp_core::events::EventBus`], replays recent events for
//! late joiners, and sends keepalive heartbeats.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use std::convert::Infallible;
use std::time::Duration;

use crate::context::AppContext;

/// Number of buffered events replayed to a new subscriber.
const REPLAY_EVENTS: usize = 200;

/// GET /api/events -- SSE stream of form events.
pub async fn events_handler(
    State(ctx): State<AppContext>,
) -> Sse<impl futures_core::Stream<Item = Result<Event, Infallible>>> {
    // Subscribe before reading the buffer so nothing falls in between.
    let mut rx = ctx.event_bus.subscribe();
    let recent = ctx.event_bus.recent_events(REPLAY_EVENTS);
    let replayed: Vec<uuid::Uuid> = recent.iter().map(|e| e.id).collect();

    let stream = async_stream::stream! {
        for event in recent.into_iter().rev() {
            if let Ok(data) = serde_json::to_string(&event) {
                yield Ok(Event::default().id(event.id.to_string()).data(data));
            }
        }

        let mut heartbeat = tokio::time::interval(Duration::from_secs(15));

        loop {
            tokio::select! {
                result = rx.recv() => {
                    match result {
                        Ok(event) => {
                            if replayed.contains(&event.id) {
                                continue;
                            }
                            if let Ok(data) = serde_json::to_string(&event) {
                                yield Ok(Event::default().id(event.id.to_string()).data(data));
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            tracing::debug!("SSE client lagged by {n} events");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                            break;
                        }
                    }
                }
                _ = heartbeat.tick() => {
                    yield Ok(Event::default()
                        .event("heartbeat")
                        .data(r#"{"type":"heartbeat"}"#));
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}
