use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;

use crate::protocol::ServerMessage;

/// Serialize one server message and write it as a text frame. A write
/// failure means the peer is gone; callers stop the loop on `Err`.
pub(super) async fn send_text_message(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &ServerMessage,
) -> Result<(), ()> {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(err) => {
            tracing::error!(error = %err, "Failed to serialize server message");
            return Ok(());
        }
    };

    if sender.send(Message::Text(json.into())).await.is_err() {
        tracing::debug!("Failed to send message, connection closed");
        return Err(());
    }

    Ok(())
}
