use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::protocol::{ClientMessage, ConnectionId, ErrorCode, ServerMessage};
use crate::server::connection_manager::OutboundHandle;
use crate::server::GameServer;

use super::sending::send_text_message;

/// Drive one WebSocket session: register the connection, pump outbound
/// messages from the bounded queue, parse and dispatch inbound frames, and
/// propagate disconnect semantics on the way out.
pub(super) async fn handle_socket(socket: WebSocket, server: GameServer) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Arc<ServerMessage>>(server.config().outbound_queue_size);
    let kill = CancellationToken::new();
    let conn_id: ConnectionId = Uuid::new_v4();

    server
        .connections()
        .register(OutboundHandle::new(conn_id, tx, kill.clone()));
    tracing::info!(connection_id = %conn_id, "WebSocket connection established");

    // Outbound: drain the queue into the socket. On kill (force-close,
    // queue overflow, shutdown) flush what is already queued, then close.
    let send_kill = kill.clone();
    let send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                message = rx.recv() => {
                    match message {
                        Some(message) => {
                            if send_text_message(&mut sender, &message).await.is_err() {
                                return;
                            }
                        }
                        None => return,
                    }
                }
                () = send_kill.cancelled() => {
                    while let Ok(message) = rx.try_recv() {
                        if send_text_message(&mut sender, &message).await.is_err() {
                            return;
                        }
                    }
                    let _ = sender.close().await;
                    return;
                }
            }
        }
    });

    // Inbound: one frame at a time, in arrival order.
    let recv_server = server.clone();
    let recv_kill = kill.clone();
    let shutdown = server.shutdown_token();
    let max_message_size = server.config().max_message_size;
    let receive_task = tokio::spawn(async move {
        loop {
            let message = tokio::select! {
                message = receiver.next() => message,
                () = recv_kill.cancelled() => return,
                () = shutdown.cancelled() => return,
            };
            let Some(message) = message else {
                return;
            };
            let message = match message {
                Ok(message) => message,
                Err(err) => {
                    tracing::warn!(connection_id = %conn_id, error = %err, "WebSocket error");
                    return;
                }
            };

            match message {
                Message::Text(text) => {
                    if text.len() > max_message_size {
                        tracing::warn!(
                            connection_id = %conn_id,
                            size = text.len(),
                            max = max_message_size,
                            "Inbound frame exceeds size limit"
                        );
                        recv_server.send_error_to_conn(
                            conn_id,
                            format!(
                                "Message too large ({} bytes, max {max_message_size} bytes)",
                                text.len()
                            ),
                            ErrorCode::MessageTooLarge,
                        );
                        continue;
                    }
                    // Shape-first: nothing mutates unless the frame decodes
                    // into a known message with well-typed fields.
                    match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(client_message) => {
                            recv_server.handle_client_message(conn_id, client_message).await;
                        }
                        Err(err) => {
                            tracing::warn!(
                                connection_id = %conn_id,
                                error = %err,
                                "Rejected malformed client frame"
                            );
                            recv_server.send_error_to_conn(
                                conn_id,
                                format!("Invalid message: {err}"),
                                ErrorCode::InvalidMessage,
                            );
                        }
                    }
                }
                Message::Binary(_) => {
                    tracing::warn!(connection_id = %conn_id, "Dropping unsupported binary frame");
                    recv_server.send_error_to_conn(
                        conn_id,
                        "Binary frames are not supported",
                        ErrorCode::InvalidMessage,
                    );
                }
                Message::Close(_) => {
                    tracing::info!(connection_id = %conn_id, "WebSocket connection closed");
                    return;
                }
                // Ping/pong are handled by the transport.
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = send_task => {}
        _ = receive_task => {}
    }
    // Unblock whichever task is still running.
    kill.cancel();

    server.handle_socket_closed(conn_id).await;
}
