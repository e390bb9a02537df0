use std::sync::Arc;

use super::GameServer;
use crate::protocol::{ConnectionId, ErrorCode, PlayerId, ServerMessage};
use crate::room::Room;

impl GameServer {
    /// Unicast to a connection by id.
    pub(crate) fn send_to_conn(&self, conn_id: ConnectionId, message: ServerMessage) {
        if let Some(handle) = self.connections().handle_of(conn_id) {
            handle.send(Arc::new(message));
        } else {
            tracing::debug!(connection_id = %conn_id, "Dropping message for unknown connection");
        }
    }

    pub(crate) fn send_error_to_conn(
        &self,
        conn_id: ConnectionId,
        message: impl Into<String>,
        error_code: ErrorCode,
    ) {
        self.send_to_conn(
            conn_id,
            ServerMessage::Error {
                message: message.into(),
                error_code: Some(error_code),
            },
        );
    }

    /// Unicast to one player through their current connection. A missing
    /// or dead connection is not an error; the player is just unreachable
    /// until they rejoin.
    pub(crate) fn send_to_player(&self, room: &Room, player_id: PlayerId, message: ServerMessage) {
        let Some(player) = room.players.get(&player_id) else {
            return;
        };
        if let Some(connection) = &player.connection {
            connection.send(Arc::new(message));
        }
    }

    /// Broadcast to every connected player of a room. Called under the
    /// room's lock with non-blocking sends, which gives every recipient
    /// the same relative message order.
    pub(crate) fn broadcast_room(&self, room: &Room, message: ServerMessage) {
        let message = Arc::new(message);
        for player in room.players.values() {
            if let Some(connection) = &player.connection {
                connection.send(Arc::clone(&message));
            }
        }
    }

    pub(crate) fn broadcast_room_except(
        &self,
        room: &Room,
        except: PlayerId,
        message: ServerMessage,
    ) {
        let message = Arc::new(message);
        for player in room.players.values() {
            if player.id == except {
                continue;
            }
            if let Some(connection) = &player.connection {
                connection.send(Arc::clone(&message));
            }
        }
    }

    /// Push the "all ready?" summary to the host.
    pub(crate) fn notify_host_ready_status(&self, room: &Room) {
        let status = ServerMessage::AllPlayersReadyStatus {
            all_ready: room.all_ready(),
            ready_count: room.ready_count(),
            player_count: room.player_count(),
        };
        self.send_to_player(room, room.creator, status);
    }
}
