use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Lifecycle phase recorded in a snapshot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SessionPhaseEntity {
    /// Waiting for a room identifier.
    RoomEntry,
    /// Choosing the game mode.
    ModeSelection,
    /// Choosing roster size and target score.
    Configuration,
    /// Collecting team names.
    RosterRegistration,
    /// Ordering the starting table and queue.
    SeatingOrder,
    /// Live play.
    MatchInProgress,
}

/// Game mode recorded in a snapshot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum GameModeEntity {
    /// Winner stays, loser queues.
    RoundRobin,
    /// Two teams, continuous rematches.
    FixedDuel,
}

/// Standings counters persisted per team.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamStandingEntity {
    /// Matches won so far.
    pub wins: u32,
    /// Points accumulated across all resolved matches.
    pub points: u32,
}

/// One hand of the in-progress match, as persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HandEntity {
    /// Side the hand was credited to.
    pub winner: String,
    /// Points awarded.
    pub points: u32,
}

/// One resolved match in the persisted history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecordEntity {
    /// Position in the history, starting at 1.
    pub sequence_number: u32,
    /// Winning team name.
    pub winner: String,
    /// Losing team name.
    pub loser: String,
    /// Final score rendered as `"<winner points> a <loser points>"`.
    pub score: String,
}

/// Full snapshot of a room's scoring session persisted by the storage layer.
///
/// One blob exists per room. Field names and value formats are part of the
/// stored contract; changing them invalidates every snapshot on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionEntity {
    /// Phase the session was in when saved.
    pub phase: SessionPhaseEntity,
    /// Chosen game mode, absent until mode selection completes.
    pub mode: Option<GameModeEntity>,
    /// Configured number of teams.
    pub roster_size: usize,
    /// Registered team names in registration order.
    pub team_names: Vec<String>,
    /// Standings keyed by team name, in registration order.
    pub standings: IndexMap<String, TeamStandingEntity>,
    /// The two teams currently seated, if a match is under way.
    pub active_table: Option<(String, String)>,
    /// Teams waiting for the table, head plays next.
    pub waiting_queue: Vec<String>,
    /// Resolved matches, oldest first.
    pub match_history: Vec<MatchRecordEntity>,
    /// Hands of the unresolved match, oldest first.
    pub current_hands: Vec<HandEntity>,
    /// Points needed to win a match.
    pub threshold: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_entity() -> SessionEntity {
        let mut standings = IndexMap::new();
        standings.insert("Rojos".to_string(), TeamStandingEntity { wins: 1, points: 210 });
        standings.insert("Azules".to_string(), TeamStandingEntity { wins: 0, points: 0 });
        standings.insert("Verdes".to_string(), TeamStandingEntity { wins: 0, points: 0 });

        SessionEntity {
            phase: SessionPhaseEntity::MatchInProgress,
            mode: Some(GameModeEntity::RoundRobin),
            roster_size: 3,
            team_names: vec![
                "Rojos".to_string(),
                "Azules".to_string(),
                "Verdes".to_string(),
            ],
            standings,
            active_table: Some(("Rojos".to_string(), "Verdes".to_string())),
            waiting_queue: vec!["Azules".to_string()],
            match_history: vec![MatchRecordEntity {
                sequence_number: 1,
                winner: "Rojos".to_string(),
                loser: "Azules".to_string(),
                score: "210 a 0".to_string(),
            }],
            current_hands: vec![HandEntity {
                winner: "Verdes".to_string(),
                points: 40,
            }],
            threshold: 200,
        }
    }

    #[test]
    fn snapshot_serializes_with_stable_field_names() {
        let value = serde_json::to_value(sample_entity()).unwrap();

        assert_eq!(
            value,
            json!({
                "phase": "match-in-progress",
                "mode": "round-robin",
                "rosterSize": 3,
                "teamNames": ["Rojos", "Azules", "Verdes"],
                "standings": {
                    "Rojos": { "wins": 1, "points": 210 },
                    "Azules": { "wins": 0, "points": 0 },
                    "Verdes": { "wins": 0, "points": 0 },
                },
                "activeTable": ["Rojos", "Verdes"],
                "waitingQueue": ["Azules"],
                "matchHistory": [{
                    "sequenceNumber": 1,
                    "winner": "Rojos",
                    "loser": "Azules",
                    "score": "210 a 0",
                }],
                "currentHands": [{ "winner": "Verdes", "points": 40 }],
                "threshold": 200,
            })
        );
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let entity = sample_entity();
        let encoded = serde_json::to_string(&entity).unwrap();
        let decoded: SessionEntity = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, entity);
    }

    #[test]
    fn standings_keep_registration_order() {
        let encoded = serde_json::to_string(&sample_entity()).unwrap();
        let decoded: SessionEntity = serde_json::from_str(&encoded).unwrap();
        let keys: Vec<&String> = decoded.standings.keys().collect();
        assert_eq!(keys, ["Rojos", "Azules", "Verdes"]);
    }

    #[test]
    fn unknown_phase_fails_to_decode() {
        let mut value = serde_json::to_value(sample_entity()).unwrap();
        value["phase"] = json!("intermission");
        assert!(serde_json::from_value::<SessionEntity>(value).is_err());
    }
}
