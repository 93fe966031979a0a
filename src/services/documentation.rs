use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Domino Score Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::session::enter_room,
        crate::routes::session::select_mode,
        crate::routes::session::configure,
        crate::routes::session::register_teams,
        crate::routes::session::set_seating,
        crate::routes::session::record_hand,
        crate::routes::session::edit_hand,
        crate::routes::session::remove_hand,
        crate::routes::session::reset_room,
        crate::routes::session::room_view,
        crate::routes::session::history_csv,
        crate::routes::sse::room_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::session::ActionResponse,
            crate::dto::session::ConfigurePayload,
            crate::dto::session::HandPayload,
            crate::dto::session::HandRow,
            crate::dto::session::MatchRecordView,
            crate::dto::session::RegisterTeamsPayload,
            crate::dto::session::SelectModePayload,
            crate::dto::session::SessionView,
            crate::dto::session::SetSeatingPayload,
            crate::dto::session::StandingRow,
            crate::dto::session::TableView,
            crate::dto::sse::Handshake,
            crate::dto::sse::MatchResolvedEvent,
            crate::dto::sse::RoomResetEvent,
            crate::state::session::GameMode,
            crate::state::state_machine::SessionPhase,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "rooms", description = "Room lifecycle and scoring commands"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
