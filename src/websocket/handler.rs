use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::IntoResponse;

use crate::server::GameServer;

use super::connection::handle_socket;

/// Upgrade an HTTP request to a WebSocket session.
pub(super) async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(server): State<GameServer>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, server))
}
