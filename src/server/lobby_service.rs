use std::sync::Arc;

use super::GameServer;
use crate::protocol::{ConnectionId, ErrorCode, RoomListing, ServerMessage};

impl GameServer {
    /// Subscribe a browsing (room-less) connection to public-room
    /// listings. The current list is sent immediately; every change after
    /// that triggers a full-replacement rebroadcast.
    pub async fn handle_subscribe_lobby(&self, conn_id: ConnectionId) {
        if self.connections().player_of(conn_id).is_some() {
            self.send_error_to_conn(
                conn_id,
                "Leave your room before browsing the lobby",
                ErrorCode::AlreadyInRoom,
            );
            return;
        }
        let Some(handle) = self.connections().handle_of(conn_id) else {
            return;
        };
        self.lobby.insert(conn_id, handle);
        let rooms = self.build_listings().await;
        self.send_to_conn(conn_id, ServerMessage::PublicRoomsList { rooms });
    }

    pub fn handle_unsubscribe_lobby(&self, conn_id: ConnectionId) {
        self.lobby.remove(&conn_id);
    }

    /// Rebroadcast the listing to every subscriber. Runs as its own task
    /// so callers holding a room lock never lock the rest of the rooms
    /// from inside it.
    pub(crate) fn schedule_lobby_refresh(&self) {
        if self.lobby.is_empty() {
            return;
        }
        let server = self.clone();
        tokio::spawn(async move {
            let rooms = server.build_listings().await;
            let message = Arc::new(ServerMessage::PublicRoomsList { rooms });
            let mut dead: Vec<ConnectionId> = Vec::new();
            for entry in server.lobby.iter() {
                if !entry.value().send(Arc::clone(&message)) {
                    dead.push(*entry.key());
                }
            }
            for conn_id in dead {
                server.lobby.remove(&conn_id);
            }
        });
    }

    /// Joinable public rooms, in stable (code) order.
    pub(crate) async fn build_listings(&self) -> Vec<RoomListing> {
        let rooms: Vec<_> = self
            .rooms
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        let mut listings = Vec::new();
        for room in rooms {
            let room = room.lock().await;
            if let Some(listing) = room.listing() {
                listings.push(listing);
            }
        }
        listings.sort_by(|a, b| a.room_code.cmp(&b.room_code));
        listings
    }
}
