use serde::Serialize;
use tracing::warn;

use crate::{
    dto::{
        session::SessionView,
        sse::{MatchResolvedEvent, RoomResetEvent, ServerEvent},
    },
    state::SseHub,
    state::session::MatchRecord,
};

const EVENT_SESSION: &str = "session";
const EVENT_MATCH_RESOLVED: &str = "match.resolved";
const EVENT_ROOM_RESET: &str = "room.reset";

/// Broadcast the full session snapshot to a room's subscribers.
pub fn broadcast_session(hub: &SseHub, view: &SessionView) {
    send_event(hub, EVENT_SESSION, view);
}

/// Broadcast that a match just resolved, with its celebration line.
pub fn broadcast_match_resolved(hub: &SseHub, record: &MatchRecord) {
    let payload = MatchResolvedEvent::new(
        record.sequence_number,
        &record.winner,
        &record.loser,
        record.winner_points,
        record.score(),
    );
    send_event(hub, EVENT_MATCH_RESOLVED, &payload);
}

/// Broadcast that the room was wiped and its watchers should leave.
pub fn broadcast_room_reset(hub: &SseHub, room: &str) {
    let payload = RoomResetEvent {
        room: room.to_string(),
    };
    send_event(hub, EVENT_ROOM_RESET, &payload);
}

fn send_event(hub: &SseHub, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => hub.broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize SSE payload"),
    }
}
