use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Foosball Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::ws::ActionMessage,
            crate::dto::ws::MatchStateMessage,
            crate::dto::ws::PlayerView,
            crate::dto::ws::TeamView,
            crate::dto::ws::NoticeMessage,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "match", description = "WebSocket sessions of table clients"),
    )
)]
pub struct ApiDoc;
