use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::dto::{format_system_time, validation::validate_team_name};
use crate::state::session::{GameMode, Session};
use crate::state::state_machine::SessionPhase;

/// Payload selecting the game mode.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SelectModePayload {
    /// Scheduling mode for the tournament.
    pub mode: GameMode,
}

/// Payload fixing the roster size and the target score.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ConfigurePayload {
    /// Number of teams that will play.
    #[validate(range(min = 2, max = 20))]
    pub roster_size: usize,
    /// Points a side needs to win a match.
    #[validate(range(min = 50, max = 500))]
    pub threshold: u32,
}

/// Payload carrying every team name, in registration order.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterTeamsPayload {
    /// Display names, one per team.
    pub teams: Vec<String>,
}

impl Validate for RegisterTeamsPayload {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        for name in &self.teams {
            if let Err(e) = validate_team_name(name) {
                errors.add("teams", e);
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Payload seating the first table and ordering the waiting queue.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SetSeatingPayload {
    /// First seated team.
    #[validate(length(min = 1))]
    pub side_a: String,
    /// Second seated team.
    #[validate(length(min = 1))]
    pub side_b: String,
    /// Every remaining team, in the order they will enter the table.
    pub queue: Vec<String>,
}

/// Payload recording or correcting one hand.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct HandPayload {
    /// Side the hand is credited to; must be seated at the table.
    #[validate(length(min = 1))]
    pub winner: String,
    /// Points scored, between 1 and 500.
    #[validate(range(min = 1, max = 500))]
    pub points: u32,
}

/// Acknowledgement returned by commands that do not yield a session view.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    /// Short machine-readable outcome, e.g. `"reset"`.
    pub status: String,
}

/// One row of the ranked standings table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct StandingRow {
    /// Display position, starting at 1.
    pub rank: usize,
    /// Team name.
    pub team: String,
    /// Matches won.
    pub wins: u32,
    /// Cumulative points across resolved matches.
    pub points: u32,
}

/// One hand of the current match with its per-side attribution.
///
/// `side_a_points`/`side_b_points` mirror the two scoreboard columns: the
/// full hand value lands on the winning side and the other column shows zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct HandRow {
    /// Zero-based position in the ledger, used to edit or delete the hand.
    pub index: usize,
    /// Side the hand was credited to.
    pub winner: String,
    /// Points scored.
    pub points: u32,
    /// Points shown in the first side's column.
    pub side_a_points: u32,
    /// Points shown in the second side's column.
    pub side_b_points: u32,
}

/// The active table with its running totals and hand list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TableView {
    /// First seated team.
    pub side_a: String,
    /// Second seated team.
    pub side_b: String,
    /// Running total of the first side.
    pub total_a: u32,
    /// Running total of the second side.
    pub total_b: u32,
    /// Hands played so far in this match, oldest first.
    pub hands: Vec<HandRow>,
}

/// One resolved match as shown in the history table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct MatchRecordView {
    /// Position in play order, starting at 1.
    pub sequence_number: u32,
    /// Winning team.
    pub winner: String,
    /// Losing team.
    pub loser: String,
    /// Final score, winner first, e.g. `"210 a 85"`.
    pub score: String,
}

/// Full snapshot of a room rendered for clients.
///
/// Every mutating command returns (and broadcasts) one of these; the
/// presentation layer re-renders from it without tracking deltas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SessionView {
    /// Room name as entered, before storage-key sanitization.
    pub room: String,
    /// Phase the session is currently in.
    pub phase: SessionPhase,
    /// Chosen game mode, absent until mode selection completes.
    pub mode: Option<GameMode>,
    /// Configured number of teams.
    pub roster_size: usize,
    /// Points a side needs to win a match.
    pub threshold: u32,
    /// Registered team names in registration order.
    pub teams: Vec<String>,
    /// Standings sorted by wins, then cumulative points.
    pub standings: Vec<StandingRow>,
    /// The table currently playing, if a match is under way.
    pub table: Option<TableView>,
    /// Teams waiting for the table, head plays next.
    pub waiting_queue: Vec<String>,
    /// Resolved matches, newest first.
    pub history: Vec<MatchRecordView>,
    /// RFC 3339 timestamp of the last mutation.
    pub updated_at: String,
}

impl From<&Session> for SessionView {
    fn from(session: &Session) -> Self {
        let standings = session
            .ranked_standings()
            .into_iter()
            .enumerate()
            .map(|(position, (team, stats))| StandingRow {
                rank: position + 1,
                team: team.clone(),
                wins: stats.wins,
                points: stats.points,
            })
            .collect();

        let table = session.active_table.as_ref().map(|(side_a, side_b)| {
            let (total_a, total_b) = session.ledger.totals(side_a);
            let hands = session
                .ledger
                .hands()
                .iter()
                .enumerate()
                .map(|(index, hand)| {
                    let won_by_a = hand.winner == *side_a;
                    HandRow {
                        index,
                        winner: hand.winner.clone(),
                        points: hand.points,
                        side_a_points: if won_by_a { hand.points } else { 0 },
                        side_b_points: if won_by_a { 0 } else { hand.points },
                    }
                })
                .collect();

            TableView {
                side_a: side_a.clone(),
                side_b: side_b.clone(),
                total_a,
                total_b,
                hands,
            }
        });

        let history = session
            .history
            .iter()
            .rev()
            .map(|record| MatchRecordView {
                sequence_number: record.sequence_number,
                winner: record.winner.clone(),
                loser: record.loser.clone(),
                score: record.score(),
            })
            .collect();

        Self {
            room: session.room_id.clone(),
            phase: session.phase(),
            mode: session.mode,
            roster_size: session.roster_size,
            threshold: session.threshold,
            teams: session.team_names.clone(),
            standings,
            table,
            waiting_queue: session.waiting_queue.iter().cloned().collect(),
            history,
            updated_at: format_system_time(session.updated_at),
        }
    }
}
