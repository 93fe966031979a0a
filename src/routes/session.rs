use axum::{
    Json, Router,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::{get, post, put},
};
use axum_valid::Valid;

use crate::{
    dto::session::{
        ActionResponse, ConfigurePayload, HandPayload, RegisterTeamsPayload, SelectModePayload,
        SessionView, SetSeatingPayload,
    },
    error::AppError,
    services::{export, session_service},
    state::SharedState,
};

/// Room lifecycle and scoring endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/rooms/{room}", get(room_view))
        .route("/rooms/{room}/enter", post(enter_room))
        .route("/rooms/{room}/mode", post(select_mode))
        .route("/rooms/{room}/config", post(configure))
        .route("/rooms/{room}/teams", post(register_teams))
        .route("/rooms/{room}/seating", post(set_seating))
        .route("/rooms/{room}/hands", post(record_hand))
        .route(
            "/rooms/{room}/hands/{index}",
            put(edit_hand).delete(remove_hand),
        )
        .route("/rooms/{room}/reset", post(reset_room))
        .route("/rooms/{room}/history.csv", get(history_csv))
}

/// Enter a room, resuming the live session or restoring its snapshot.
#[utoipa::path(
    post,
    path = "/rooms/{room}/enter",
    tag = "rooms",
    params(("room" = String, Path, description = "Room name as typed by the scorekeeper")),
    responses(
        (status = 200, description = "Session entered or resumed", body = SessionView),
        (status = 400, description = "Room name sanitizes to nothing"),
        (status = 503, description = "Snapshot store unavailable"),
    )
)]
pub async fn enter_room(
    State(state): State<SharedState>,
    Path(room): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(session_service::enter_room(&state, &room).await?))
}

/// Choose the game mode for a freshly entered room.
#[utoipa::path(
    post,
    path = "/rooms/{room}/mode",
    tag = "rooms",
    params(("room" = String, Path, description = "Room name")),
    request_body = SelectModePayload,
    responses(
        (status = 200, description = "Mode selected", body = SessionView),
        (status = 404, description = "Room has no live session"),
        (status = 409, description = "Session is not in mode selection"),
    )
)]
pub async fn select_mode(
    State(state): State<SharedState>,
    Path(room): Path<String>,
    Valid(Json(payload)): Valid<Json<SelectModePayload>>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(
        session_service::select_mode(&state, &room, payload).await?,
    ))
}

/// Fix the roster size and the target score.
#[utoipa::path(
    post,
    path = "/rooms/{room}/config",
    tag = "rooms",
    params(("room" = String, Path, description = "Room name")),
    request_body = ConfigurePayload,
    responses(
        (status = 200, description = "Configuration stored", body = SessionView),
        (status = 400, description = "Values incompatible with the chosen mode"),
        (status = 409, description = "Session is not in configuration"),
    )
)]
pub async fn configure(
    State(state): State<SharedState>,
    Path(room): Path<String>,
    Valid(Json(payload)): Valid<Json<ConfigurePayload>>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(
        session_service::configure(&state, &room, payload).await?,
    ))
}

/// Register every team name for the session.
#[utoipa::path(
    post,
    path = "/rooms/{room}/teams",
    tag = "rooms",
    params(("room" = String, Path, description = "Room name")),
    request_body = RegisterTeamsPayload,
    responses(
        (status = 200, description = "Roster registered", body = SessionView),
        (status = 400, description = "Wrong count, blank or duplicate names"),
        (status = 409, description = "Session is not in roster registration"),
    )
)]
pub async fn register_teams(
    State(state): State<SharedState>,
    Path(room): Path<String>,
    Valid(Json(payload)): Valid<Json<RegisterTeamsPayload>>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(
        session_service::register_teams(&state, &room, payload).await?,
    ))
}

/// Seat the first table and order the waiting queue.
#[utoipa::path(
    post,
    path = "/rooms/{room}/seating",
    tag = "rooms",
    params(("room" = String, Path, description = "Room name")),
    request_body = SetSeatingPayload,
    responses(
        (status = 200, description = "Match started", body = SessionView),
        (status = 400, description = "Seating does not place every team exactly once"),
        (status = 409, description = "Session is not in seating order"),
    )
)]
pub async fn set_seating(
    State(state): State<SharedState>,
    Path(room): Path<String>,
    Valid(Json(payload)): Valid<Json<SetSeatingPayload>>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(
        session_service::set_seating(&state, &room, payload).await?,
    ))
}

/// Record one finished hand for a seated side.
#[utoipa::path(
    post,
    path = "/rooms/{room}/hands",
    tag = "rooms",
    params(("room" = String, Path, description = "Room name")),
    request_body = HandPayload,
    responses(
        (status = 200, description = "Hand recorded, match resolved when a side reached the threshold", body = SessionView),
        (status = 400, description = "Winner not seated or zero points"),
        (status = 409, description = "No match in progress"),
    )
)]
pub async fn record_hand(
    State(state): State<SharedState>,
    Path(room): Path<String>,
    Valid(Json(payload)): Valid<Json<HandPayload>>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(
        session_service::record_hand(&state, &room, payload).await?,
    ))
}

/// Correct a previously recorded hand.
#[utoipa::path(
    put,
    path = "/rooms/{room}/hands/{index}",
    tag = "rooms",
    params(
        ("room" = String, Path, description = "Room name"),
        ("index" = usize, Path, description = "Zero-based position of the hand"),
    ),
    request_body = HandPayload,
    responses(
        (status = 200, description = "Hand corrected; out-of-range indexes are ignored", body = SessionView),
        (status = 400, description = "Winner not seated or zero points"),
        (status = 409, description = "No match in progress"),
    )
)]
pub async fn edit_hand(
    State(state): State<SharedState>,
    Path((room, index)): Path<(String, usize)>,
    Valid(Json(payload)): Valid<Json<HandPayload>>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(
        session_service::edit_hand(&state, &room, index, payload).await?,
    ))
}

/// Delete a previously recorded hand.
#[utoipa::path(
    delete,
    path = "/rooms/{room}/hands/{index}",
    tag = "rooms",
    params(
        ("room" = String, Path, description = "Room name"),
        ("index" = usize, Path, description = "Zero-based position of the hand"),
    ),
    responses(
        (status = 200, description = "Hand deleted; out-of-range indexes are ignored", body = SessionView),
        (status = 409, description = "No match in progress"),
    )
)]
pub async fn remove_hand(
    State(state): State<SharedState>,
    Path((room, index)): Path<(String, usize)>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(
        session_service::remove_hand(&state, &room, index).await?,
    ))
}

/// Wipe a room's session and snapshot so it can start over.
#[utoipa::path(
    post,
    path = "/rooms/{room}/reset",
    tag = "rooms",
    params(("room" = String, Path, description = "Room name")),
    responses(
        (status = 200, description = "Room wiped", body = ActionResponse),
        (status = 503, description = "Snapshot store unavailable"),
    )
)]
pub async fn reset_room(
    State(state): State<SharedState>,
    Path(room): Path<String>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(session_service::reset_room(&state, &room).await?))
}

/// Pull the current state of a live room.
#[utoipa::path(
    get,
    path = "/rooms/{room}",
    tag = "rooms",
    params(("room" = String, Path, description = "Room name")),
    responses(
        (status = 200, description = "Current session state", body = SessionView),
        (status = 404, description = "Room has no live session"),
    )
)]
pub async fn room_view(
    State(state): State<SharedState>,
    Path(room): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(session_service::current_view(&state, &room).await?))
}

/// Download the room's match history as CSV, newest match first.
#[utoipa::path(
    get,
    path = "/rooms/{room}/history.csv",
    tag = "rooms",
    params(("room" = String, Path, description = "Room name")),
    responses(
        (status = 200, description = "Match history", content_type = "text/csv", body = String),
        (status = 404, description = "Room has no live session"),
    )
)]
pub async fn history_csv(
    State(state): State<SharedState>,
    Path(room): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let csv = export::history_csv(&state, &room).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"historial.csv\"",
            ),
        ],
        csv,
    ))
}
