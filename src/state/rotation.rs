use std::collections::VecDeque;

use thiserror::Error;

use crate::state::session::GameMode;

/// Error raised when a rotation is requested without anyone waiting.
///
/// Round-robin play requires at least three registered teams, so a resolved
/// match always has a challenger queued; hitting this error means the session
/// data broke an invariant upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("waiting queue is empty, cannot seat a challenger")]
pub struct EmptyQueue;

/// Seat the table for the next match after `winner` beat `loser`.
///
/// In round-robin mode the winner keeps the table, the head of the waiting
/// queue sits down as challenger and the loser joins the back of the queue.
/// In fixed-duel mode the same two teams play again and the table is returned
/// untouched.
pub fn next_table(
    mode: GameMode,
    table: (String, String),
    winner: &str,
    loser: &str,
    queue: &mut VecDeque<String>,
) -> Result<(String, String), EmptyQueue> {
    match mode {
        GameMode::FixedDuel => Ok(table),
        GameMode::RoundRobin => {
            let challenger = queue.pop_front().ok_or(EmptyQueue)?;
            queue.push_back(loser.to_string());
            Ok((winner.to_string(), challenger))
        }
    }
}
