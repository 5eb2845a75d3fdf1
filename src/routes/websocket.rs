use axum::{
    Router,
    extract::{Path, State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use validator::Validate;

use crate::{
    dto::ws::RegisterParams, error::AppError, services::websocket_service, state::SharedState,
};

#[utoipa::path(
    get,
    path = "/register/{sub}",
    tag = "match",
    params(RegisterParams),
    responses(
        (status = 101, description = "Switching protocols to WebSocket"),
        (status = 400, description = "Empty or oversized player id")
    )
)]
/// Upgrade the HTTP connection into a match session for player `sub`.
pub async fn ws_handler(
    State(state): State<SharedState>,
    Path(params): Path<RegisterParams>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, AppError> {
    params.validate()?;
    let RegisterParams { sub } = params;
    Ok(ws.on_upgrade(move |socket| websocket_service::handle_socket(state, socket, sub)))
}

/// Configure the WebSocket endpoint.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/register/{sub}", get(ws_handler))
}
