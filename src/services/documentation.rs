use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI document for the Hot Seat backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sessions::create_session,
        crate::routes::sessions::list_sessions,
        crate::routes::sessions::get_session,
        crate::routes::sessions::delete_session,
        crate::routes::sessions::join_session,
        crate::routes::sessions::find_player,
        crate::routes::sessions::start_game,
        crate::routes::sessions::submit_vote,
        crate::routes::sessions::close_round,
        crate::routes::sessions::advance,
        crate::routes::sessions::restart,
        crate::routes::sessions::get_results,
        crate::routes::sse::session_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::sse::StatusChangedEvent,
            crate::dto::sse::NoticeEvent,
            crate::dto::sse::NoticeLevel,
            crate::dto::sse::SystemStatus,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sessions", description = "Session creation and lookup"),
        (name = "players", description = "Joining and re-identifying players"),
        (name = "game", description = "Gameplay actions and results"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
