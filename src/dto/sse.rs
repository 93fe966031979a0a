use serde::Serialize;
use utoipa::ToSchema;

#[derive(Clone, Debug)]
/// Dispatched payload carried across a room's SSE channel.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Room the subscription is scoped to.
    pub room: String,
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether the backend is running without a storage backend connection.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a match reaches its threshold and is resolved.
pub struct MatchResolvedEvent {
    /// Position of the resolved match in play order, starting at 1.
    pub sequence_number: u32,
    /// Winning team.
    pub winner: String,
    /// Losing team.
    pub loser: String,
    /// Final score, winner first, e.g. `"210 a 85"`.
    pub score: String,
    /// Celebration line ready for display.
    pub message: String,
}

impl MatchResolvedEvent {
    /// Build the event for a resolved match, including its celebration line.
    pub fn new(sequence_number: u32, winner: &str, loser: &str, winner_points: u32, score: String) -> Self {
        Self {
            sequence_number,
            winner: winner.to_string(),
            loser: loser.to_string(),
            score,
            message: format!("¡{winner} ganó la partida con {winner_points} puntos!"),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a room is wiped back to its initial phase.
pub struct RoomResetEvent {
    /// Room that was reset.
    pub room: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_event_serialises_payload() {
        let event = ServerEvent::json("room.reset".to_string(), &RoomResetEvent {
            room: "Mesa".to_string(),
        })
        .unwrap();

        assert_eq!(event.event.as_deref(), Some("room.reset"));
        assert_eq!(event.data, r#"{"room":"Mesa"}"#);
    }

    #[test]
    fn test_match_resolved_event_formats_celebration() {
        let event = MatchResolvedEvent::new(3, "Rojos", "Azules", 210, "210 a 85".to_string());

        assert_eq!(event.message, "¡Rojos ganó la partida con 210 puntos!");
        assert_eq!(event.score, "210 a 85");
    }
}
