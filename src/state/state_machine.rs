use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::state::session::GameMode;

/// Phases a scoring session moves through, in order.
///
/// The sequence is linear with no way back: a reset discards the whole
/// session, and the replacement machine starts over at
/// [`SessionPhase::RoomEntry`]. While a match is in progress the phase stays
/// put: hand mutations and match resolutions are not phase transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum SessionPhase {
    /// No session data yet; waiting for a room identifier.
    RoomEntry,
    /// Room entered; choosing between round-robin and fixed-duel play.
    ModeSelection,
    /// Picking the roster size and the target score.
    Configuration,
    /// Collecting the team names.
    RosterRegistration,
    /// Choosing the two starting teams and ordering the waiting queue
    /// (round-robin only; fixed-duel skips straight to the match).
    SeatingOrder,
    /// Live play. Terminal: matches resolve and rotate without leaving
    /// this phase.
    MatchInProgress,
}

/// Events that can be applied to the session state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A room identifier was provided and no snapshot was found for it.
    Enter,
    /// A game mode was chosen.
    SelectMode(GameMode),
    /// Roster size and target score were accepted.
    Configure,
    /// All team names were registered. `seating_required` is false in
    /// fixed-duel mode, where the table is seated implicitly.
    RegisterRoster {
        /// Whether the session still needs an explicit seating order.
        seating_required: bool,
    },
    /// The starting table and waiting queue were chosen.
    SetSeating,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: SessionPhase,
    /// The event that cannot be applied from this phase.
    pub event: SessionEvent,
}

/// State machine implementing the session flow described above.
///
/// The machine only sequences phases; the guards that look at session data
/// (roster counts, name uniqueness, threshold bounds) are checked by the
/// service layer before the matching event is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStateMachine {
    phase: SessionPhase,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self {
            phase: SessionPhase::RoomEntry,
        }
    }
}

impl SessionStateMachine {
    /// Create a new state machine initialised at room entry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a machine at the phase a snapshot recorded, skipping the
    /// intermediate transitions.
    pub fn restore(phase: SessionPhase) -> Self {
        Self { phase }
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Validate and apply an event, returning the new phase.
    pub fn apply(&mut self, event: SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        let next = self.compute_transition(event)?;
        self.phase = next;
        Ok(next)
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (SessionPhase::RoomEntry, SessionEvent::Enter) => SessionPhase::ModeSelection,
            (SessionPhase::ModeSelection, SessionEvent::SelectMode(_)) => {
                SessionPhase::Configuration
            }
            (SessionPhase::Configuration, SessionEvent::Configure) => {
                SessionPhase::RosterRegistration
            }
            (
                SessionPhase::RosterRegistration,
                SessionEvent::RegisterRoster {
                    seating_required: true,
                },
            ) => SessionPhase::SeatingOrder,
            (
                SessionPhase::RosterRegistration,
                SessionEvent::RegisterRoster {
                    seating_required: false,
                },
            ) => SessionPhase::MatchInProgress,
            (SessionPhase::SeatingOrder, SessionEvent::SetSeating) => {
                SessionPhase::MatchInProgress
            }
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(sm: &mut SessionStateMachine, event: SessionEvent) -> SessionPhase {
        sm.apply(event).unwrap()
    }

    #[test]
    fn initial_state_is_room_entry() {
        let sm = SessionStateMachine::new();
        assert_eq!(sm.phase(), SessionPhase::RoomEntry);
    }

    #[test]
    fn full_happy_path_round_robin() {
        let mut sm = SessionStateMachine::new();

        assert_eq!(
            apply(&mut sm, SessionEvent::Enter),
            SessionPhase::ModeSelection
        );
        assert_eq!(
            apply(&mut sm, SessionEvent::SelectMode(GameMode::RoundRobin)),
            SessionPhase::Configuration
        );
        assert_eq!(
            apply(&mut sm, SessionEvent::Configure),
            SessionPhase::RosterRegistration
        );
        assert_eq!(
            apply(
                &mut sm,
                SessionEvent::RegisterRoster {
                    seating_required: true
                }
            ),
            SessionPhase::SeatingOrder
        );
        assert_eq!(
            apply(&mut sm, SessionEvent::SetSeating),
            SessionPhase::MatchInProgress
        );
    }

    #[test]
    fn fixed_duel_skips_seating() {
        let mut sm = SessionStateMachine::new();
        apply(&mut sm, SessionEvent::Enter);
        apply(&mut sm, SessionEvent::SelectMode(GameMode::FixedDuel));
        apply(&mut sm, SessionEvent::Configure);

        assert_eq!(
            apply(
                &mut sm,
                SessionEvent::RegisterRoster {
                    seating_required: false
                }
            ),
            SessionPhase::MatchInProgress
        );
    }

    #[test]
    fn seating_cannot_be_skipped_in_round_robin() {
        let mut sm = SessionStateMachine::restore(SessionPhase::SeatingOrder);
        let err = sm
            .apply(SessionEvent::RegisterRoster {
                seating_required: true,
            })
            .unwrap_err();
        assert_eq!(err.from, SessionPhase::SeatingOrder);
        // The failed attempt must not move the machine.
        assert_eq!(sm.phase(), SessionPhase::SeatingOrder);
    }

    #[test]
    fn invalid_transition_returns_error() {
        let mut sm = SessionStateMachine::new();
        let err = sm.apply(SessionEvent::SetSeating).unwrap_err();
        assert_eq!(err.from, SessionPhase::RoomEntry);
        assert_eq!(err.event, SessionEvent::SetSeating);
    }

    #[test]
    fn restore_jumps_directly_to_recorded_phase() {
        let sm = SessionStateMachine::restore(SessionPhase::MatchInProgress);
        assert_eq!(sm.phase(), SessionPhase::MatchInProgress);
    }
}
