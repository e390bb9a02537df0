use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;

use super::GameServer;
use crate::protocol::messages::{RejoinGamePayload, RejoinSelectingPayload};
use crate::protocol::{validation, ConnectionId, GameEndedPayload, PlayerId, ServerMessage};
use crate::room::timers::ScheduledTask;
use crate::room::{ConnectionStatus, RoomState};

impl GameServer {
    /// Transport-level close. The player is not removed: they are marked
    /// disconnected, their seat is held for the grace period, and the room
    /// is told so clients can render the cue. Game progress is untouched.
    pub async fn handle_socket_closed(&self, conn_id: ConnectionId) {
        self.lobby.remove(&conn_id);
        let Some(player_id) = self.connections().remove(conn_id) else {
            tracing::debug!(connection_id = %conn_id, "Unbound connection closed");
            return;
        };
        let Some((code, room_arc)) = self.room_of_player(player_id) else {
            return;
        };
        let mut room = room_arc.lock().await;

        {
            let Some(player) = room.players.get_mut(&player_id) else {
                return;
            };
            // A replaced connection closes after the new one took over;
            // only the current connection's close means a disconnect.
            match &player.connection {
                Some(current) if current.id() == conn_id => {}
                _ => return,
            }
            player.connection = None;
            player.status = ConnectionStatus::Disconnected;
            player.disconnected_at = Some(Utc::now());
            if !player.is_host {
                // Keeps the ready-start gate honest while they are away.
                player.ready = false;
            }

            let grace = Duration::from_secs(self.config().reconnect_grace_secs);
            let server = self.clone();
            let arc = room_arc.clone();
            let grace_code = code.clone();
            player.removal_timer = Some(ScheduledTask::spawn(async move {
                tokio::time::sleep(grace).await;
                let mut room = arc.lock().await;
                let Some(player) = room.players.get_mut(&player_id) else {
                    return;
                };
                if player.is_connected() {
                    return;
                }
                if let Some(timer) = player.removal_timer.take() {
                    timer.detach();
                }
                tracing::info!(%player_id, room_code = %grace_code, "Reconnection grace expired");
                server
                    .remove_player_locked(&mut room, &grace_code, player_id)
                    .await;
            }));
        }

        tracing::info!(%player_id, room_code = %code, "Player disconnected, grace period started");
        self.broadcast_room(&room, ServerMessage::PlayerDisconnected { player_id });
        if room.state == RoomState::Waiting {
            self.notify_host_ready_status(&room);
        }
    }

    /// Resume a session from the client's stored `(roomCode, playerId)`.
    /// Accepted while the room exists, the player still holds a seat, and
    /// the grace timer has not fired.
    pub async fn handle_rejoin(
        &self,
        conn_id: ConnectionId,
        room_code: String,
        player_id: PlayerId,
    ) {
        let fail = |reason: &str| ServerMessage::RejoinFailed {
            reason: reason.to_string(),
        };
        if self.connections().player_of(conn_id).is_some() {
            self.send_to_conn(conn_id, fail("This connection is already in a room"));
            return;
        }
        let code = match validation::normalize_room_code(&room_code) {
            Ok(code) => code,
            Err(_) => {
                self.send_to_conn(conn_id, fail("Malformed room code"));
                return;
            }
        };
        let Some(room_arc) = self.room_by_code(&code) else {
            self.send_to_conn(conn_id, fail("Room no longer exists"));
            return;
        };
        let Some(handle) = self.connections().handle_of(conn_id) else {
            return;
        };

        let mut room = room_arc.lock().await;
        let mut was_disconnected = false;
        {
            let Some(player) = room.players.get_mut(&player_id) else {
                self.send_to_conn(conn_id, fail("No such player in this room"));
                return;
            };

            if player.is_connected() {
                // Page refresh: the new connection takes ownership and the
                // old one is told why it is going away.
                if let Some(old) = player.connection.take() {
                    old.send(std::sync::Arc::new(ServerMessage::ReplacedByNewConnection));
                    old.close();
                    self.connections().unbind_player(old.id());
                    tracing::info!(%player_id, room_code = %code, "Connection replaced by new connection");
                }
            } else {
                was_disconnected = true;
                if let Some(timer) = player.removal_timer.take() {
                    timer.cancel();
                }
                player.status = ConnectionStatus::Connected;
                player.disconnected_at = None;
                tracing::info!(%player_id, room_code = %code, "Player reconnected within grace");
            }
            player.connection = Some(handle);
        }
        self.connections().bind_player(conn_id, player_id);
        self.lobby.remove(&conn_id);

        if was_disconnected {
            self.broadcast_room_except(&room, player_id, ServerMessage::PlayerReconnected {
                player_id,
            });
        }

        let resume = match room.state {
            RoomState::Waiting => ServerMessage::RejoinWaiting(Box::new(room.snapshot())),
            RoomState::Selecting => {
                let selection = room.selection.as_ref();
                let target_player_name = selection
                    .and_then(|sel| sel.target_of(player_id))
                    .and_then(|target| room.players.get(&target))
                    .map(|p| p.name.clone())
                    .unwrap_or_default();
                let time_remaining_ms = selection
                    .map(|sel| {
                        sel.deadline
                            .saturating_duration_since(Instant::now())
                            .as_millis() as u64
                    })
                    .unwrap_or(0);
                let submitted_word = selection
                    .and_then(|sel| sel.submitted_word_of(player_id))
                    .map(str::to_string);
                ServerMessage::RejoinSelecting(Box::new(RejoinSelectingPayload {
                    room: room.snapshot(),
                    target_player_name,
                    time_remaining_ms,
                    submitted_word,
                }))
            }
            RoomState::Playing => {
                let board = room
                    .players
                    .get(&player_id)
                    .map(|p| &p.board);
                ServerMessage::RejoinGame(Box::new(RejoinGamePayload {
                    room: room.snapshot(),
                    guesses: board.map(|b| b.guesses.clone()).unwrap_or_default(),
                    results: board.map(|b| b.results.clone()).unwrap_or_default(),
                    finished: board.map(|b| b.finished).unwrap_or_default(),
                    won: board.map(|b| b.won).unwrap_or_default(),
                    game_elapsed_ms: room.elapsed_ms(),
                    opponents: room.opponent_progress(player_id),
                }))
            }
            RoomState::Finished => {
                let payload = room.last_results.clone().unwrap_or(GameEndedPayload {
                    target_word: None,
                    results: room.build_results(None),
                });
                ServerMessage::RejoinResults(Box::new(payload))
            }
        };
        self.send_to_conn(conn_id, resume);

        if room.state == RoomState::Waiting {
            self.notify_host_ready_status(&room);
        }
    }
}
