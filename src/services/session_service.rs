//! Business logic powering the room REST routes. These helpers coordinate
//! snapshot persistence, in-memory state updates, and phase transitions while
//! holding each room's write lock for the whole mutation cycle.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::{
    dao::{
        models::SessionEntity,
        session_store::{SessionStore, room_storage_key},
    },
    dto::session::{
        ActionResponse, ConfigurePayload, HandPayload, RegisterTeamsPayload, SelectModePayload,
        SessionView, SetSeatingPayload,
    },
    error::ServiceError,
    services::sse_events,
    state::{
        RoomHandle, SharedState,
        ledger::LedgerError,
        resolver::{self, MatchResolution},
        session::{GameMode, Session, TeamStats},
        state_machine::{SessionEvent, SessionPhase},
    },
};

/// Outcome of a command closure applied to a draft session.
enum Mutation {
    /// The draft changed and must be persisted and broadcast. Carries the
    /// match resolution when the mutation pushed a side over the threshold.
    Applied(Option<MatchResolution>),
    /// The command referenced nothing, e.g. an out-of-range hand index. The
    /// draft is discarded and the live session stays untouched.
    Ignored,
}

// ---------------------------------------------------------------------------
// Room lifecycle
// ---------------------------------------------------------------------------

/// Enter a room: resume it if live, restore it from its snapshot, or open a
/// fresh session at mode selection.
pub async fn enter_room(state: &SharedState, room: &str) -> Result<SessionView, ServiceError> {
    let room = room.trim().to_string();
    let key = room_key(&room)?;

    if let Some(handle) = state.room(&key) {
        let guard = handle.session().read().await;
        return Ok(SessionView::from(&*guard));
    }

    let store = state.require_session_store().await?;
    let (mut session, fresh) = match load_snapshot(store.as_ref(), &room, &key).await? {
        Some(session) => (session, false),
        None => (Session::new(room), true),
    };
    if session.phase() == SessionPhase::RoomEntry {
        session.machine.apply(SessionEvent::Enter)?;
    }

    let (handle, inserted) = state.room_or_insert(&key, || session);
    if !inserted {
        // Lost the registry race to a concurrent enter; adopt the winner.
        let guard = handle.session().read().await;
        return Ok(SessionView::from(&*guard));
    }

    let guard = handle.session().write().await;
    if fresh {
        store
            .save_session(key, SessionEntity::from(&*guard))
            .await?;
    }
    let view = SessionView::from(&*guard);
    drop(guard);
    sse_events::broadcast_session(handle.events(), &view);
    Ok(view)
}

/// Wipe a room: its snapshot is deleted first, then the live session and its
/// subscribers are dropped. Resetting a room nobody entered is a no-op.
pub async fn reset_room(state: &SharedState, room: &str) -> Result<ActionResponse, ServiceError> {
    let key = room_key(room)?;
    let store = state.require_session_store().await?;
    store.delete_session(key.clone()).await?;

    if let Some(handle) = state.remove_room(&key) {
        let room_name = handle.session().read().await.room_id.clone();
        sse_events::broadcast_room_reset(handle.events(), &room_name);
        debug!(room = %key, "room reset; live session dropped");
    }

    Ok(ActionResponse {
        status: "reset".to_string(),
    })
}

/// Render the current state of a live room.
pub async fn current_view(state: &SharedState, room: &str) -> Result<SessionView, ServiceError> {
    let key = room_key(room)?;
    let handle = live_room(state, &key)?;
    let guard = handle.session().read().await;
    Ok(SessionView::from(&*guard))
}

// ---------------------------------------------------------------------------
// Setup commands
// ---------------------------------------------------------------------------

/// Choose the game mode and advance to configuration.
pub async fn select_mode(
    state: &SharedState,
    room: &str,
    payload: SelectModePayload,
) -> Result<SessionView, ServiceError> {
    mutate_room(state, room, |session| {
        session.machine.apply(SessionEvent::SelectMode(payload.mode))?;
        session.mode = Some(payload.mode);
        if payload.mode == GameMode::FixedDuel {
            session.roster_size = 2;
        }
        Ok(Mutation::Applied(None))
    })
    .await
}

/// Fix the roster size and target score and advance to roster registration.
pub async fn configure(
    state: &SharedState,
    room: &str,
    payload: ConfigurePayload,
) -> Result<SessionView, ServiceError> {
    mutate_room(state, room, |session| {
        session.machine.apply(SessionEvent::Configure)?;
        let mode = require_mode(session)?;
        match mode {
            GameMode::RoundRobin if payload.roster_size < 3 => {
                return Err(ServiceError::InvalidInput(
                    "round-robin rotation needs at least 3 teams".into(),
                ));
            }
            GameMode::FixedDuel if payload.roster_size != 2 => {
                return Err(ServiceError::InvalidInput(
                    "fixed-duel seats exactly 2 teams".into(),
                ));
            }
            _ => {}
        }
        session.roster_size = payload.roster_size;
        session.threshold = payload.threshold;
        Ok(Mutation::Applied(None))
    })
    .await
}

/// Register every team name. In fixed-duel mode the table is seated
/// immediately; round-robin continues to the seating step.
pub async fn register_teams(
    state: &SharedState,
    room: &str,
    payload: RegisterTeamsPayload,
) -> Result<SessionView, ServiceError> {
    mutate_room(state, room, |session| {
        let mode = require_mode(session)?;

        let teams: Vec<String> = payload
            .teams
            .iter()
            .map(|name| name.trim().to_string())
            .collect();
        if teams.len() != session.roster_size {
            return Err(ServiceError::InvalidInput(format!(
                "expected {} team names, got {}",
                session.roster_size,
                teams.len()
            )));
        }
        let mut seen = HashSet::new();
        for name in &teams {
            if !seen.insert(name.clone()) {
                return Err(ServiceError::InvalidInput(format!(
                    "duplicate team name `{name}`"
                )));
            }
        }

        let seating_required = matches!(mode, GameMode::RoundRobin);
        session
            .machine
            .apply(SessionEvent::RegisterRoster { seating_required })?;

        session.standings = teams
            .iter()
            .map(|name| (name.clone(), TeamStats::default()))
            .collect();
        session.team_names = teams;
        if mode == GameMode::FixedDuel {
            session.active_table = Some((
                session.team_names[0].clone(),
                session.team_names[1].clone(),
            ));
            session.waiting_queue.clear();
        }
        Ok(Mutation::Applied(None))
    })
    .await
}

/// Seat the first table and order the waiting queue, then start the match.
pub async fn set_seating(
    state: &SharedState,
    room: &str,
    payload: SetSeatingPayload,
) -> Result<SessionView, ServiceError> {
    mutate_room(state, room, |session| {
        let side_a = payload.side_a.trim().to_string();
        let side_b = payload.side_b.trim().to_string();
        let queue: Vec<String> = payload
            .queue
            .iter()
            .map(|name| name.trim().to_string())
            .collect();

        let mut seen = HashSet::new();
        for name in [&side_a, &side_b].into_iter().chain(queue.iter()) {
            if !session.standings.contains_key(name) {
                return Err(ServiceError::InvalidInput(format!(
                    "`{name}` is not a registered team"
                )));
            }
            if !seen.insert(name.clone()) {
                return Err(ServiceError::InvalidInput(format!(
                    "`{name}` appears more than once in the seating"
                )));
            }
        }
        if seen.len() != session.team_names.len() {
            return Err(ServiceError::InvalidInput(format!(
                "seating must place all {} teams, got {}",
                session.team_names.len(),
                seen.len()
            )));
        }

        session.machine.apply(SessionEvent::SetSeating)?;
        session.active_table = Some((side_a, side_b));
        session.waiting_queue = queue.into();
        Ok(Mutation::Applied(None))
    })
    .await
}

// ---------------------------------------------------------------------------
// Hand commands
// ---------------------------------------------------------------------------

/// Record one finished hand for a seated side. Resolves the match when the
/// side's total reaches the threshold.
pub async fn record_hand(
    state: &SharedState,
    room: &str,
    payload: HandPayload,
) -> Result<SessionView, ServiceError> {
    mutate_room(state, room, |session| {
        ensure_phase(session, SessionPhase::MatchInProgress)?;
        let winner = seated_winner(session, &payload.winner)?;
        session
            .ledger
            .add_hand(winner, payload.points)
            .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;
        let resolution = resolver::check_and_resolve(session)?;
        Ok(Mutation::Applied(resolution))
    })
    .await
}

/// Correct a previously recorded hand. An out-of-range index leaves the
/// session untouched; a correction can itself resolve the match.
pub async fn edit_hand(
    state: &SharedState,
    room: &str,
    index: usize,
    payload: HandPayload,
) -> Result<SessionView, ServiceError> {
    mutate_room(state, room, |session| {
        ensure_phase(session, SessionPhase::MatchInProgress)?;
        let winner = seated_winner(session, &payload.winner)?;
        match session.ledger.edit_hand(index, winner, payload.points) {
            Ok(()) => {}
            Err(LedgerError::IndexOutOfRange { .. }) => return Ok(Mutation::Ignored),
            Err(err) => return Err(ServiceError::InvalidInput(err.to_string())),
        }
        let resolution = resolver::check_and_resolve(session)?;
        Ok(Mutation::Applied(resolution))
    })
    .await
}

/// Delete a previously recorded hand. An out-of-range index leaves the
/// session untouched.
pub async fn remove_hand(
    state: &SharedState,
    room: &str,
    index: usize,
) -> Result<SessionView, ServiceError> {
    mutate_room(state, room, |session| {
        ensure_phase(session, SessionPhase::MatchInProgress)?;
        match session.ledger.remove_hand(index) {
            Ok(_) => {}
            Err(LedgerError::IndexOutOfRange { .. }) => return Ok(Mutation::Ignored),
            Err(err) => return Err(ServiceError::InvalidInput(err.to_string())),
        }
        let resolution = resolver::check_and_resolve(session)?;
        Ok(Mutation::Applied(resolution))
    })
    .await
}

// ---------------------------------------------------------------------------
// Shared plumbing
// ---------------------------------------------------------------------------

/// Apply `mutate` to a draft of the room's session, persist the draft, then
/// commit and broadcast it. The live session never holds a state the snapshot
/// store has not accepted.
async fn mutate_room(
    state: &SharedState,
    room: &str,
    mutate: impl FnOnce(&mut Session) -> Result<Mutation, ServiceError>,
) -> Result<SessionView, ServiceError> {
    let key = room_key(room)?;
    let handle = live_room(state, &key)?;
    let store = state.require_session_store().await?;

    let mut guard = handle.session().write().await;
    let mut draft = guard.clone();
    match mutate(&mut draft)? {
        Mutation::Ignored => {
            debug!(room = %key, "command referenced nothing; session left unchanged");
            Ok(SessionView::from(&*guard))
        }
        Mutation::Applied(resolution) => {
            draft.touch();
            store
                .save_session(key, SessionEntity::from(&draft))
                .await?;
            *guard = draft;
            let view = SessionView::from(&*guard);
            drop(guard);
            sse_events::broadcast_session(handle.events(), &view);
            if let Some(resolution) = resolution {
                sse_events::broadcast_match_resolved(handle.events(), &resolution.record);
            }
            Ok(view)
        }
    }
}

/// Load and validate a stored snapshot. Corrupt or inconsistent snapshots are
/// dropped so the room can start over; only storage outages propagate.
async fn load_snapshot(
    store: &dyn SessionStore,
    room: &str,
    key: &str,
) -> Result<Option<Session>, ServiceError> {
    match store.load_session(key.to_string()).await {
        Ok(Some(entity)) => match Session::try_from((room.to_string(), entity)) {
            Ok(session) => Ok(Some(session)),
            Err(err) => {
                debug!(room = %key, error = %err, "snapshot failed validation; starting fresh");
                Ok(None)
            }
        },
        Ok(None) => Ok(None),
        Err(err) if err.is_corrupt() => {
            debug!(room = %key, error = %err, "snapshot is corrupt; starting fresh");
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

/// Derive the storage key for a room, rejecting names that sanitize away.
fn room_key(room: &str) -> Result<String, ServiceError> {
    let key = room_storage_key(room);
    if key.is_empty() {
        return Err(ServiceError::InvalidInput(
            "room name must contain at least one alphanumeric character".into(),
        ));
    }
    Ok(key)
}

/// Resolve a live room from the user-facing name, for subscribers that sit
/// outside the command flow.
pub(crate) fn live_room_for(
    state: &SharedState,
    room: &str,
) -> Result<Arc<RoomHandle>, ServiceError> {
    let key = room_key(room)?;
    live_room(state, &key)
}

fn live_room(state: &SharedState, room_key: &str) -> Result<Arc<RoomHandle>, ServiceError> {
    state.room(room_key).ok_or_else(|| {
        ServiceError::NotFound(format!(
            "room `{room_key}` has no live session; enter it first"
        ))
    })
}

fn ensure_phase(session: &Session, required: SessionPhase) -> Result<(), ServiceError> {
    let current = session.phase();
    if current != required {
        return Err(ServiceError::InvalidState(format!(
            "operation requires {required:?} phase, current phase {current:?}"
        )));
    }
    Ok(())
}

fn require_mode(session: &Session) -> Result<GameMode, ServiceError> {
    session.mode.ok_or_else(|| {
        ServiceError::InvalidState("no game mode was selected for this session".into())
    })
}

/// Check that `winner` names one of the two seated sides and return it
/// trimmed.
fn seated_winner(session: &Session, winner: &str) -> Result<String, ServiceError> {
    let Some((side_a, side_b)) = session.active_table.as_ref() else {
        return Err(ServiceError::InvalidState(
            "no table is currently seated".into(),
        ));
    };
    let winner = winner.trim();
    if winner == side_a || winner == side_b {
        Ok(winner.to_string())
    } else {
        Err(ServiceError::InvalidInput(format!(
            "`{winner}` is not seated at the table"
        )))
    }
}
