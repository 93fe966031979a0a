use thiserror::Error;

use crate::state::rotation::{self, EmptyQueue};
use crate::state::session::{MatchRecord, Session};

/// Outcome of a resolved match, handed back so callers can notify clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResolution {
    /// The history record that was just appended.
    pub record: MatchRecord,
    /// The table seated for the next match.
    pub next_table: (String, String),
}

/// Invariant breaches surfaced while resolving.
///
/// These cannot be produced by a session that went through the normal guards;
/// they exist so the resolver never has to panic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// A table is seated but no mode was ever chosen.
    #[error("no game mode selected for a seated table")]
    MissingMode,
    /// Rotation was asked for with nobody waiting.
    #[error(transparent)]
    Rotation(#[from] EmptyQueue),
}

/// Check the current totals against the threshold and resolve the match if a
/// side has reached it.
///
/// Must be called after every ledger mutation, not only additions: an edit or
/// a deletion can push a total across the threshold just as well. Side A is
/// checked first, so if an edit leaves both sides at or above the threshold in
/// the same evaluation, side A takes the match.
///
/// On a win this credits the standings of both sides, appends the match to
/// the history, clears the ledger and rotates the table. Returns `Ok(None)`
/// when no side has reached the threshold yet, which also makes a repeated
/// call after a resolution a no-op: the cleared ledger totals zero.
pub fn check_and_resolve(session: &mut Session) -> Result<Option<MatchResolution>, ResolveError> {
    let Some((side_a, side_b)) = session.active_table.clone() else {
        return Ok(None);
    };
    let Some(mode) = session.mode else {
        return Err(ResolveError::MissingMode);
    };

    let (total_a, total_b) = session.ledger.totals(&side_a);
    let (winner, loser, winner_points, loser_points) = if total_a >= session.threshold {
        (side_a.clone(), side_b.clone(), total_a, total_b)
    } else if total_b >= session.threshold {
        (side_b.clone(), side_a.clone(), total_b, total_a)
    } else {
        return Ok(None);
    };

    let winner_stats = session.standings.entry(winner.clone()).or_default();
    winner_stats.wins += 1;
    winner_stats.points = winner_stats.points.saturating_add(winner_points);
    let loser_stats = session.standings.entry(loser.clone()).or_default();
    loser_stats.points = loser_stats.points.saturating_add(loser_points);

    let record = MatchRecord {
        sequence_number: session.history.len() as u32 + 1,
        winner: winner.clone(),
        loser: loser.clone(),
        winner_points,
        loser_points,
    };
    session.history.push(record.clone());
    session.ledger.clear();

    let next_table = rotation::next_table(
        mode,
        (side_a, side_b),
        &winner,
        &loser,
        &mut session.waiting_queue,
    )?;
    session.active_table = Some(next_table.clone());

    Ok(Some(MatchResolution { record, next_table }))
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::state::session::{GameMode, TeamStats};
    use crate::state::state_machine::{SessionPhase, SessionStateMachine};

    fn live_session(mode: GameMode, teams: &[&str]) -> Session {
        let mut session = Session::new("Mesa".to_string());
        session.machine = SessionStateMachine::restore(SessionPhase::MatchInProgress);
        session.mode = Some(mode);
        session.roster_size = teams.len();
        session.threshold = 200;
        session.team_names = teams.iter().map(|t| (*t).to_string()).collect();
        session.standings = teams
            .iter()
            .map(|t| ((*t).to_string(), TeamStats::default()))
            .collect();
        session.active_table = Some((teams[0].to_string(), teams[1].to_string()));
        session.waiting_queue = teams[2..].iter().map(|t| (*t).to_string()).collect();
        session
    }

    fn add_hand(session: &mut Session, winner: &str, points: u32) {
        session.ledger.add_hand(winner.to_string(), points).unwrap();
    }

    #[test]
    fn below_threshold_is_a_no_op() {
        let mut session = live_session(GameMode::RoundRobin, &["A", "B", "C"]);
        add_hand(&mut session, "A", 120);
        add_hand(&mut session, "B", 90);

        let outcome = check_and_resolve(&mut session).unwrap();

        assert_eq!(outcome, None);
        assert_eq!(session.ledger.len(), 2);
        assert!(session.history.is_empty());
        assert_eq!(session.standings["A"], TeamStats::default());
    }

    #[test]
    fn side_a_resolution_credits_both_sides() {
        let mut session = live_session(GameMode::RoundRobin, &["A", "B", "C"]);
        add_hand(&mut session, "A", 120);
        add_hand(&mut session, "A", 90);

        let outcome = check_and_resolve(&mut session).unwrap().unwrap();

        assert_eq!(outcome.record.winner, "A");
        assert_eq!(outcome.record.loser, "B");
        assert_eq!(outcome.record.score(), "210 a 0");
        assert_eq!(outcome.record.sequence_number, 1);
        assert_eq!(session.standings["A"], TeamStats { wins: 1, points: 210 });
        assert_eq!(session.standings["B"], TeamStats { wins: 0, points: 0 });
        assert!(session.ledger.is_empty());
        assert_eq!(session.history.len(), 1);
    }

    #[test]
    fn loser_keeps_partial_points() {
        let mut session = live_session(GameMode::RoundRobin, &["A", "B", "C"]);
        add_hand(&mut session, "B", 90);
        add_hand(&mut session, "A", 205);

        let outcome = check_and_resolve(&mut session).unwrap().unwrap();

        assert_eq!(outcome.record.score(), "205 a 90");
        assert_eq!(session.standings["B"], TeamStats { wins: 0, points: 90 });
    }

    #[test]
    fn side_b_win_rotates_against_the_queue_head() {
        let mut session = live_session(GameMode::RoundRobin, &["A", "B", "C", "D"]);
        add_hand(&mut session, "B", 200);

        let outcome = check_and_resolve(&mut session).unwrap().unwrap();

        assert_eq!(outcome.next_table, ("B".to_string(), "C".to_string()));
        assert_eq!(session.active_table, Some(("B".to_string(), "C".to_string())));
        assert_eq!(session.waiting_queue, VecDeque::from(["D".to_string(), "A".to_string()]));
    }

    #[test]
    fn side_a_wins_simultaneous_threshold_crossings() {
        let mut session = live_session(GameMode::RoundRobin, &["A", "B", "C"]);
        // Both sides cross at once, as a stale edit could produce.
        add_hand(&mut session, "A", 200);
        add_hand(&mut session, "B", 230);

        let outcome = check_and_resolve(&mut session).unwrap().unwrap();

        assert_eq!(outcome.record.winner, "A");
        assert_eq!(outcome.record.score(), "200 a 230");
    }

    #[test]
    fn fixed_duel_never_moves_the_table() {
        let mut session = live_session(GameMode::FixedDuel, &["A", "B"]);

        for round in 1u32..=3 {
            add_hand(&mut session, "B", 200);
            let outcome = check_and_resolve(&mut session).unwrap().unwrap();
            assert_eq!(outcome.record.sequence_number, round);
            assert_eq!(outcome.next_table, ("A".to_string(), "B".to_string()));
        }

        assert_eq!(session.standings["B"], TeamStats { wins: 3, points: 600 });
        assert!(session.waiting_queue.is_empty());
    }

    #[test]
    fn cumulative_points_saturate_at_the_ceiling() {
        let mut session = live_session(GameMode::RoundRobin, &["A", "B", "C"]);
        session.standings.insert(
            "A".to_string(),
            TeamStats {
                wins: 9,
                points: u32::MAX - 50,
            },
        );
        add_hand(&mut session, "A", 210);

        check_and_resolve(&mut session).unwrap().unwrap();

        assert_eq!(
            session.standings["A"],
            TeamStats {
                wins: 10,
                points: u32::MAX
            }
        );
    }

    #[test]
    fn resolving_again_after_a_match_is_a_no_op() {
        let mut session = live_session(GameMode::RoundRobin, &["A", "B", "C"]);
        add_hand(&mut session, "A", 210);

        assert!(check_and_resolve(&mut session).unwrap().is_some());
        assert_eq!(check_and_resolve(&mut session).unwrap(), None);
        assert_eq!(session.history.len(), 1);
    }

    #[test]
    fn sequence_numbers_grow_without_gaps() {
        let mut session = live_session(GameMode::RoundRobin, &["A", "B", "C"]);

        add_hand(&mut session, "A", 210);
        check_and_resolve(&mut session).unwrap();
        add_hand(&mut session, "C", 220);
        check_and_resolve(&mut session).unwrap();

        let sequences: Vec<u32> = session
            .history
            .iter()
            .map(|r| r.sequence_number)
            .collect();
        assert_eq!(sequences, [1, 2]);
    }

    #[test]
    fn no_table_means_nothing_to_resolve() {
        let mut session = Session::new("Mesa".to_string());
        assert_eq!(check_and_resolve(&mut session).unwrap(), None);
    }
}
