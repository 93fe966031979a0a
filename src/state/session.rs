use std::collections::{HashSet, VecDeque};
use std::time::SystemTime;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::dao::models::{
    GameModeEntity, HandEntity, MatchRecordEntity, SessionEntity, SessionPhaseEntity,
    TeamStandingEntity,
};
use crate::state::ledger::{HandLedger, MAX_HAND_POINTS};
use crate::state::state_machine::{SessionPhase, SessionStateMachine};

/// Roster size a fresh session starts from before configuration.
pub const DEFAULT_ROSTER_SIZE: usize = 4;
/// Target score a fresh session starts from before configuration.
pub const DEFAULT_THRESHOLD: u32 = 200;

/// How matches are scheduled across the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum GameMode {
    /// Winner stays at the table, loser joins the waiting queue.
    RoundRobin,
    /// Exactly two teams playing continuous rematches.
    FixedDuel,
}

/// Standings counters for one team.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeamStats {
    /// Matches won so far.
    pub wins: u32,
    /// Points accumulated across all resolved matches.
    pub points: u32,
}

/// One resolved match, immutable once appended to the history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    /// Position in the history, starting at 1.
    pub sequence_number: u32,
    /// Winning team name.
    pub winner: String,
    /// Losing team name.
    pub loser: String,
    /// Final score of the winning side.
    pub winner_points: u32,
    /// Final score of the losing side.
    pub loser_points: u32,
}

impl MatchRecord {
    /// Render the final score the way it is persisted and exported,
    /// e.g. `"210 a 0"`.
    pub fn score(&self) -> String {
        format!("{} a {}", self.winner_points, self.loser_points)
    }
}

/// Aggregated state for one room's scoring session.
///
/// All mutation goes through the service layer, which holds the room's write
/// lock for the whole validate, mutate, persist, broadcast cycle. The session
/// itself is plain data plus the phase machine.
#[derive(Debug, Clone)]
pub struct Session {
    /// Room name as the scorekeeper typed it. Not persisted; the storage key
    /// is derived separately.
    pub room_id: String,
    /// Phase machine guarding the setup flow.
    pub machine: SessionStateMachine,
    /// Chosen game mode, `None` until mode selection completes.
    pub mode: Option<GameMode>,
    /// Configured number of teams.
    pub roster_size: usize,
    /// Points needed to win a match.
    pub threshold: u32,
    /// Registered team names in registration order.
    pub team_names: Vec<String>,
    /// Standings keyed by team name, kept in registration order.
    pub standings: IndexMap<String, TeamStats>,
    /// The two teams currently seated, if a match is under way.
    pub active_table: Option<(String, String)>,
    /// Teams waiting for the table, head plays next.
    pub waiting_queue: VecDeque<String>,
    /// Hands of the unresolved match.
    pub ledger: HandLedger,
    /// Resolved matches, oldest first.
    pub history: Vec<MatchRecord>,
    /// Last mutation time, surfaced in views but never persisted.
    pub updated_at: SystemTime,
}

impl Session {
    /// Create a fresh session for `room_id`, sitting at room entry with the
    /// default configuration.
    pub fn new(room_id: String) -> Self {
        Self {
            room_id,
            machine: SessionStateMachine::new(),
            mode: None,
            roster_size: DEFAULT_ROSTER_SIZE,
            threshold: DEFAULT_THRESHOLD,
            team_names: Vec::new(),
            standings: IndexMap::new(),
            active_table: None,
            waiting_queue: VecDeque::new(),
            ledger: HandLedger::new(),
            history: Vec::new(),
            updated_at: SystemTime::now(),
        }
    }

    /// Current phase of the session.
    pub fn phase(&self) -> SessionPhase {
        self.machine.phase()
    }

    /// Record that the session just changed.
    pub fn touch(&mut self) {
        self.updated_at = SystemTime::now();
    }

    /// Standings ordered for display: most wins first, cumulative points as
    /// the tie breaker, registration order after that.
    pub fn ranked_standings(&self) -> Vec<(&String, &TeamStats)> {
        let mut rows: Vec<(&String, &TeamStats)> = self.standings.iter().collect();
        rows.sort_by(|(_, a), (_, b)| {
            b.wins.cmp(&a.wins).then_with(|| b.points.cmp(&a.points))
        });
        rows
    }
}

/// Reasons a persisted snapshot cannot be turned back into a live session.
///
/// Any of these discards the snapshot: the caller logs the reason and starts
/// the room fresh.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotDecodeError {
    /// History record carries an unexpected sequence number.
    #[error("history record {index} has sequence number {found}, expected {expected}")]
    SequenceGap {
        /// Zero-based position in the stored history.
        index: usize,
        /// Sequence number found in the record.
        found: u32,
        /// Sequence number the position requires.
        expected: u32,
    },
    /// A history score string is not of the form `"<wins> a <losses>"`.
    #[error("malformed score string {0:?}")]
    MalformedScore(String),
    /// Standings and the registered team list disagree.
    #[error("standings do not match the registered roster")]
    RosterMismatch,
    /// Table and queue together do not seat the full roster exactly once.
    #[error("active table and waiting queue do not partition the roster")]
    SeatingMismatch,
    /// A recorded hand names a team that is not at the table.
    #[error("recorded hand credits {0:?}, which is not at the table")]
    UnknownHandWinner(String),
    /// A recorded hand scores outside the accepted range.
    #[error("recorded hand {index} scores {points} points, outside 1..=500")]
    HandPointsOutOfRange {
        /// Zero-based position in the stored hands.
        index: usize,
        /// Points found in the record.
        points: u32,
    },
    /// The phase requires a chosen mode but none was stored.
    #[error("no game mode stored for phase {0:?}")]
    MissingMode(SessionPhase),
    /// A match is in progress but no table is seated.
    #[error("no active table stored while hands or live play exist")]
    MissingTable,
    /// The stored threshold can never be reached.
    #[error("threshold must be positive")]
    ZeroThreshold,
}

impl From<SessionPhase> for SessionPhaseEntity {
    fn from(value: SessionPhase) -> Self {
        match value {
            SessionPhase::RoomEntry => SessionPhaseEntity::RoomEntry,
            SessionPhase::ModeSelection => SessionPhaseEntity::ModeSelection,
            SessionPhase::Configuration => SessionPhaseEntity::Configuration,
            SessionPhase::RosterRegistration => SessionPhaseEntity::RosterRegistration,
            SessionPhase::SeatingOrder => SessionPhaseEntity::SeatingOrder,
            SessionPhase::MatchInProgress => SessionPhaseEntity::MatchInProgress,
        }
    }
}

impl From<SessionPhaseEntity> for SessionPhase {
    fn from(value: SessionPhaseEntity) -> Self {
        match value {
            SessionPhaseEntity::RoomEntry => SessionPhase::RoomEntry,
            SessionPhaseEntity::ModeSelection => SessionPhase::ModeSelection,
            SessionPhaseEntity::Configuration => SessionPhase::Configuration,
            SessionPhaseEntity::RosterRegistration => SessionPhase::RosterRegistration,
            SessionPhaseEntity::SeatingOrder => SessionPhase::SeatingOrder,
            SessionPhaseEntity::MatchInProgress => SessionPhase::MatchInProgress,
        }
    }
}

impl From<GameMode> for GameModeEntity {
    fn from(value: GameMode) -> Self {
        match value {
            GameMode::RoundRobin => GameModeEntity::RoundRobin,
            GameMode::FixedDuel => GameModeEntity::FixedDuel,
        }
    }
}

impl From<GameModeEntity> for GameMode {
    fn from(value: GameModeEntity) -> Self {
        match value {
            GameModeEntity::RoundRobin => GameMode::RoundRobin,
            GameModeEntity::FixedDuel => GameMode::FixedDuel,
        }
    }
}

impl From<&Session> for SessionEntity {
    fn from(session: &Session) -> Self {
        Self {
            phase: session.phase().into(),
            mode: session.mode.map(Into::into),
            roster_size: session.roster_size,
            team_names: session.team_names.clone(),
            standings: session
                .standings
                .iter()
                .map(|(name, stats)| {
                    (
                        name.clone(),
                        TeamStandingEntity {
                            wins: stats.wins,
                            points: stats.points,
                        },
                    )
                })
                .collect(),
            active_table: session.active_table.clone(),
            waiting_queue: session.waiting_queue.iter().cloned().collect(),
            match_history: session
                .history
                .iter()
                .map(|record| MatchRecordEntity {
                    sequence_number: record.sequence_number,
                    winner: record.winner.clone(),
                    loser: record.loser.clone(),
                    score: record.score(),
                })
                .collect(),
            current_hands: session
                .ledger
                .hands()
                .iter()
                .map(|hand| HandEntity {
                    winner: hand.winner.clone(),
                    points: hand.points,
                })
                .collect(),
            threshold: session.threshold,
        }
    }
}

impl TryFrom<(String, SessionEntity)> for Session {
    type Error = SnapshotDecodeError;

    /// Rebuild a live session from a snapshot, checking the invariants the
    /// serialization format cannot express. A snapshot that fails here is
    /// treated as corrupt and discarded by the caller.
    fn try_from((room_id, entity): (String, SessionEntity)) -> Result<Self, Self::Error> {
        let phase: SessionPhase = entity.phase.into();
        let mode = entity.mode.map(GameMode::from);

        if entity.threshold == 0 {
            return Err(SnapshotDecodeError::ZeroThreshold);
        }

        let mode_required = matches!(
            phase,
            SessionPhase::Configuration
                | SessionPhase::RosterRegistration
                | SessionPhase::SeatingOrder
                | SessionPhase::MatchInProgress
        );
        if mode_required && mode.is_none() {
            return Err(SnapshotDecodeError::MissingMode(phase));
        }

        if entity.standings.len() != entity.team_names.len()
            || entity
                .team_names
                .iter()
                .any(|name| !entity.standings.contains_key(name))
        {
            return Err(SnapshotDecodeError::RosterMismatch);
        }

        let history = entity
            .match_history
            .iter()
            .enumerate()
            .map(|(index, record)| {
                let expected = index as u32 + 1;
                if record.sequence_number != expected {
                    return Err(SnapshotDecodeError::SequenceGap {
                        index,
                        found: record.sequence_number,
                        expected,
                    });
                }
                let (winner_points, loser_points) = parse_score(&record.score)
                    .ok_or_else(|| SnapshotDecodeError::MalformedScore(record.score.clone()))?;
                Ok(MatchRecord {
                    sequence_number: record.sequence_number,
                    winner: record.winner.clone(),
                    loser: record.loser.clone(),
                    winner_points,
                    loser_points,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if phase == SessionPhase::MatchInProgress && entity.active_table.is_none() {
            return Err(SnapshotDecodeError::MissingTable);
        }
        if !entity.current_hands.is_empty() && entity.active_table.is_none() {
            return Err(SnapshotDecodeError::MissingTable);
        }

        if let Some((side_a, side_b)) = &entity.active_table {
            let mut seated: HashSet<&String> = HashSet::new();
            seated.insert(side_a);
            seated.insert(side_b);
            let mut placed = seated.len() == 2;
            for queued in &entity.waiting_queue {
                placed &= seated.insert(queued);
            }
            let partitions_roster = placed
                && seated.len() == entity.team_names.len()
                && entity.team_names.iter().all(|name| seated.contains(name));
            match mode {
                Some(GameMode::RoundRobin) if !partitions_roster => {
                    return Err(SnapshotDecodeError::SeatingMismatch);
                }
                Some(GameMode::FixedDuel)
                    if !entity.waiting_queue.is_empty() || !partitions_roster =>
                {
                    return Err(SnapshotDecodeError::SeatingMismatch);
                }
                _ => {}
            }

            for (index, hand) in entity.current_hands.iter().enumerate() {
                if hand.points == 0 || hand.points > MAX_HAND_POINTS {
                    return Err(SnapshotDecodeError::HandPointsOutOfRange {
                        index,
                        points: hand.points,
                    });
                }
                if hand.winner != *side_a && hand.winner != *side_b {
                    return Err(SnapshotDecodeError::UnknownHandWinner(hand.winner.clone()));
                }
            }
        }

        Ok(Session {
            room_id,
            machine: SessionStateMachine::restore(phase),
            mode,
            roster_size: entity.roster_size,
            threshold: entity.threshold,
            team_names: entity.team_names,
            standings: entity
                .standings
                .into_iter()
                .map(|(name, stats)| {
                    (
                        name,
                        TeamStats {
                            wins: stats.wins,
                            points: stats.points,
                        },
                    )
                })
                .collect(),
            active_table: entity.active_table,
            waiting_queue: entity.waiting_queue.into(),
            ledger: HandLedger::restore(
                entity
                    .current_hands
                    .into_iter()
                    .map(|hand| crate::state::ledger::HandRecord {
                        winner: hand.winner,
                        points: hand.points,
                    })
                    .collect(),
            ),
            history,
            updated_at: SystemTime::now(),
        })
    }
}

/// Parse a persisted score string of the form `"210 a 85"`.
fn parse_score(score: &str) -> Option<(u32, u32)> {
    let (winner, loser) = score.split_once(" a ")?;
    Some((winner.parse().ok()?, loser.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live_session() -> Session {
        let mut session = Session::new("Mesa Grande".to_string());
        session.machine = SessionStateMachine::restore(SessionPhase::MatchInProgress);
        session.mode = Some(GameMode::RoundRobin);
        session.roster_size = 3;
        session.threshold = 150;
        session.team_names = vec![
            "Rojos".to_string(),
            "Azules".to_string(),
            "Verdes".to_string(),
        ];
        session.standings = [
            ("Rojos".to_string(), TeamStats { wins: 1, points: 152 }),
            ("Azules".to_string(), TeamStats { wins: 0, points: 90 }),
            ("Verdes".to_string(), TeamStats { wins: 0, points: 0 }),
        ]
        .into_iter()
        .collect();
        session.active_table = Some(("Rojos".to_string(), "Verdes".to_string()));
        session.waiting_queue = VecDeque::from(["Azules".to_string()]);
        session
            .ledger
            .add_hand("Verdes".to_string(), 40)
            .unwrap();
        session.history = vec![MatchRecord {
            sequence_number: 1,
            winner: "Rojos".to_string(),
            loser: "Azules".to_string(),
            winner_points: 152,
            loser_points: 90,
        }];
        session
    }

    #[test]
    fn fresh_session_uses_defaults() {
        let session = Session::new("Mesa".to_string());
        assert_eq!(session.phase(), SessionPhase::RoomEntry);
        assert_eq!(session.roster_size, DEFAULT_ROSTER_SIZE);
        assert_eq!(session.threshold, DEFAULT_THRESHOLD);
        assert!(session.mode.is_none());
        assert!(session.team_names.is_empty());
    }

    #[test]
    fn score_renders_winner_first() {
        let record = MatchRecord {
            sequence_number: 3,
            winner: "Azules".to_string(),
            loser: "Rojos".to_string(),
            winner_points: 210,
            loser_points: 0,
        };
        assert_eq!(record.score(), "210 a 0");
    }

    #[test]
    fn ranked_standings_sort_by_wins_then_points() {
        let mut session = live_session();
        session
            .standings
            .insert("Negros".to_string(), TeamStats { wins: 1, points: 200 });
        session.team_names.push("Negros".to_string());

        let ranked: Vec<&str> = session
            .ranked_standings()
            .into_iter()
            .map(|(name, _)| name.as_str())
            .collect();

        assert_eq!(ranked, ["Negros", "Rojos", "Azules", "Verdes"]);
    }

    #[test]
    fn ranked_standings_keep_registration_order_on_full_tie() {
        let session = {
            let mut s = Session::new("Mesa".to_string());
            s.standings = [
                ("B".to_string(), TeamStats::default()),
                ("A".to_string(), TeamStats::default()),
            ]
            .into_iter()
            .collect();
            s
        };

        let ranked: Vec<&str> = session
            .ranked_standings()
            .into_iter()
            .map(|(name, _)| name.as_str())
            .collect();

        assert_eq!(ranked, ["B", "A"]);
    }

    #[test]
    fn session_round_trips_through_entity() {
        let session = live_session();
        let entity = SessionEntity::from(&session);
        let restored = Session::try_from(("Mesa Grande".to_string(), entity)).unwrap();

        assert_eq!(restored.phase(), SessionPhase::MatchInProgress);
        assert_eq!(restored.mode, Some(GameMode::RoundRobin));
        assert_eq!(restored.roster_size, 3);
        assert_eq!(restored.threshold, 150);
        assert_eq!(restored.team_names, session.team_names);
        assert_eq!(restored.standings, session.standings);
        assert_eq!(restored.active_table, session.active_table);
        assert_eq!(restored.waiting_queue, session.waiting_queue);
        assert_eq!(restored.ledger, session.ledger);
        assert_eq!(restored.history, session.history);
    }

    #[test]
    fn malformed_score_is_rejected() {
        let mut entity = SessionEntity::from(&live_session());
        entity.match_history[0].score = "210-0".to_string();

        let err = Session::try_from(("Mesa".to_string(), entity)).unwrap_err();
        assert_eq!(
            err,
            SnapshotDecodeError::MalformedScore("210-0".to_string())
        );
    }

    #[test]
    fn sequence_gap_is_rejected() {
        let mut entity = SessionEntity::from(&live_session());
        entity.match_history[0].sequence_number = 7;

        let err = Session::try_from(("Mesa".to_string(), entity)).unwrap_err();
        assert_eq!(
            err,
            SnapshotDecodeError::SequenceGap {
                index: 0,
                found: 7,
                expected: 1
            }
        );
    }

    #[test]
    fn live_phase_requires_a_table() {
        let mut entity = SessionEntity::from(&live_session());
        entity.current_hands.clear();
        entity.active_table = None;

        let err = Session::try_from(("Mesa".to_string(), entity)).unwrap_err();
        assert_eq!(err, SnapshotDecodeError::MissingTable);
    }

    #[test]
    fn seating_must_partition_the_roster() {
        let mut entity = SessionEntity::from(&live_session());
        // Azules vanishes from the queue: roster no longer fully seated.
        entity.waiting_queue.clear();

        let err = Session::try_from(("Mesa".to_string(), entity)).unwrap_err();
        assert_eq!(err, SnapshotDecodeError::SeatingMismatch);
    }

    #[test]
    fn hand_winner_must_be_seated() {
        let mut entity = SessionEntity::from(&live_session());
        entity.current_hands[0].winner = "Azules".to_string();

        let err = Session::try_from(("Mesa".to_string(), entity)).unwrap_err();
        assert_eq!(
            err,
            SnapshotDecodeError::UnknownHandWinner("Azules".to_string())
        );
    }

    #[test]
    fn hand_points_must_stay_in_range() {
        let mut entity = SessionEntity::from(&live_session());
        entity.current_hands[0].points = 0;

        let err = Session::try_from(("Mesa".to_string(), entity)).unwrap_err();
        assert_eq!(
            err,
            SnapshotDecodeError::HandPointsOutOfRange { index: 0, points: 0 }
        );

        let mut entity = SessionEntity::from(&live_session());
        entity.current_hands[0].points = u32::MAX;

        let err = Session::try_from(("Mesa".to_string(), entity)).unwrap_err();
        assert_eq!(
            err,
            SnapshotDecodeError::HandPointsOutOfRange {
                index: 0,
                points: u32::MAX
            }
        );
    }

    #[test]
    fn mode_is_required_once_configuration_starts() {
        let mut entity = SessionEntity::from(&live_session());
        entity.mode = None;

        let err = Session::try_from(("Mesa".to_string(), entity)).unwrap_err();
        assert_eq!(
            err,
            SnapshotDecodeError::MissingMode(SessionPhase::MatchInProgress)
        );
    }

    #[test]
    fn standings_must_cover_every_registered_team() {
        let mut entity = SessionEntity::from(&live_session());
        entity.standings.shift_remove("Verdes");

        let err = Session::try_from(("Mesa".to_string(), entity)).unwrap_err();
        assert_eq!(err, SnapshotDecodeError::RosterMismatch);
    }
}
