use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the polling backend.
#[openapi(
    paths(
        crate::routes::health::index,
        crate::routes::health::healthcheck,
        crate::routes::polls::get_current_poll,
        crate::routes::polls::get_history,
        crate::routes::polls::get_history_entry,
        crate::routes::polls::get_participants,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::IndexResponse,
            crate::dto::poll::PollSnapshot,
            crate::dto::poll::OptionResult,
            crate::dto::poll::HistoryEntrySnapshot,
            crate::dto::poll::ParticipantsResponse,
            crate::dto::ws::ClientMessage,
            crate::dto::ws::ServerMessage,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "polls", description = "Read-only views of the classroom"),
        (name = "classroom", description = "WebSocket channel for teachers and students"),
    )
)]
pub struct ApiDoc;
