use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::Sse,
    routing::get,
};
use futures::Stream;
use tracing::info;

use crate::{error::AppError, services::sse_service, state::SharedState};

/// Stream a room's realtime events to a connected scoreboard or scorekeeper.
#[utoipa::path(
    get,
    path = "/rooms/{room}/events",
    tag = "sse",
    params(("room" = String, Path, description = "Room name")),
    responses(
        (status = 200, description = "Room SSE stream", content_type = "text/event-stream", body = String),
        (status = 404, description = "Room has no live session"),
    )
)]
pub async fn room_stream(
    State(state): State<SharedState>,
    Path(room): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    let (receiver, handle) = sse_service::subscribe_room(&state, &room)?;
    info!(room = %handle.room_key(), "new SSE connection");
    sse_service::broadcast_handshake(handle.events(), &state, &room);
    Ok(sse_service::to_sse_stream(
        receiver,
        handle.room_key().to_string(),
    ))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/rooms/{room}/events", get(room_stream))
}
