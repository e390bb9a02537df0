//! Shared plumbing for the in-process service tests: a server with fast
//! timers, test connections, and message-stream assertions.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use super::GameServer;
use crate::config::ServerConfig;
use crate::protocol::{ClientMessage, ConnectionId, PlayerId, ServerMessage};

/// Server tuned for tests: zero-length countdown, one-second selection
/// phase and grace period, test mode on.
pub(crate) fn test_server() -> GameServer {
    GameServer::with_defaults(test_config())
}

pub(crate) fn test_config() -> ServerConfig {
    ServerConfig {
        countdown_secs: 0,
        selection_phase_secs: 1,
        reconnect_grace_secs: 1,
        tick_interval_ms: 50,
        solo_start_delay_ms: 10,
        forced_word_log_path: std::env::temp_dir()
            .join(format!("forced-words-{}.ndjson", uuid::Uuid::new_v4()))
            .to_string_lossy()
            .into_owned(),
        test_mode: true,
        ..ServerConfig::default()
    }
}

pub(crate) type TestRx = mpsc::Receiver<Arc<ServerMessage>>;

/// Receive the next message or panic after a short timeout.
pub(crate) async fn recv_msg(rx: &mut TestRx) -> Arc<ServerMessage> {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for message")
        .expect("connection channel closed")
}

/// Drain messages until one satisfies `pred`, or panic on timeout.
pub(crate) async fn recv_until<F>(rx: &mut TestRx, mut pred: F) -> Arc<ServerMessage>
where
    F: FnMut(&ServerMessage) -> bool,
{
    loop {
        let message = recv_msg(rx).await;
        if pred(&message) {
            return message;
        }
    }
}

/// Create a room through the full message path; returns the host's
/// connection, its receiver, the issued player id and the room code.
pub(crate) async fn create_room(
    server: &GameServer,
    name: &str,
    test_word: Option<&str>,
) -> (ConnectionId, TestRx, PlayerId, String) {
    let (conn, mut rx) = server.connect_test_client();
    server
        .handle_client_message(
            conn,
            ClientMessage::CreateRoom {
                player_name: name.to_string(),
                player_email: None,
                test_word: test_word.map(str::to_string),
            },
        )
        .await;
    let message = recv_msg(&mut rx).await;
    match message.as_ref() {
        ServerMessage::RoomCreated {
            room_code,
            player_id,
        } => (conn, rx, *player_id, room_code.clone()),
        other => panic!("expected roomCreated, got {other:?}"),
    }
}

/// Join an existing room; returns the guest's connection, receiver and id.
pub(crate) async fn join_room(
    server: &GameServer,
    code: &str,
    name: &str,
) -> (ConnectionId, TestRx, PlayerId) {
    let (conn, mut rx) = server.connect_test_client();
    server
        .handle_client_message(
            conn,
            ClientMessage::JoinRoom {
                room_code: code.to_string(),
                player_name: name.to_string(),
                player_email: None,
            },
        )
        .await;
    let message = recv_msg(&mut rx).await;
    match message.as_ref() {
        ServerMessage::RoomJoined(payload) => (conn, rx, payload.player_id),
        other => panic!("expected roomJoined, got {other:?}"),
    }
}

/// Ready up, start the game, and wait until both clients see gameStarted.
pub(crate) async fn start_two_player_game(
    server: &GameServer,
    host_conn: ConnectionId,
    host_rx: &mut TestRx,
    guest_conn: ConnectionId,
    guest_rx: &mut TestRx,
) {
    server
        .handle_client_message(guest_conn, ClientMessage::SetReady { ready: true })
        .await;
    server
        .handle_client_message(host_conn, ClientMessage::StartGame)
        .await;
    recv_until(host_rx, |m| matches!(m, ServerMessage::GameStarted { .. })).await;
    recv_until(guest_rx, |m| matches!(m, ServerMessage::GameStarted { .. })).await;
}
