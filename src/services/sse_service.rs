use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError};

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::{
    dto::sse::{Handshake, ServerEvent},
    error::ServiceError,
    services::session_service,
    state::{RoomHandle, SharedState, SseHub},
};

/// Subscribe to a room's SSE stream. The room must be live; watchers enter
/// the room before they can follow it.
pub fn subscribe_room(
    state: &SharedState,
    room: &str,
) -> Result<(broadcast::Receiver<ServerEvent>, Arc<RoomHandle>), ServiceError> {
    let handle = session_service::live_room_for(state, room)?;
    let receiver = handle.events().subscribe();
    Ok((receiver, handle))
}

/// Convert a broadcast receiver into an SSE response, forwarding events and
/// cleaning up once the client disconnects.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<ServerEvent>,
    room_key: String,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    // forwarder task: reads from broadcast and pushes into mpsc
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            let mut event = Event::default().data(payload.data);
                            if let Some(name) = payload.event {
                                event = event.event(name);
                            }

                            if tx.send(Ok(event)).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(_)) => {
                            // Skip lagged messages but keep the stream alive.
                            continue;
                        }
                    }
                }
            }
        }

        tracing::info!(room = %room_key, "SSE stream disconnected");
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Send the connection handshake onto a room's stream so the new subscriber
/// sees it as its first event.
pub fn broadcast_handshake(hub: &SseHub, state: &SharedState, room: &str) {
    if let Ok(event) = ServerEvent::json(
        Some("info".to_string()),
        &Handshake {
            room: room.to_string(),
            message: format!("subscribed to room `{room}`"),
            degraded: state.is_degraded(),
        },
    ) {
        hub.broadcast(event);
    }
}
