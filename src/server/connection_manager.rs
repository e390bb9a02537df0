use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

use crate::protocol::{ConnectionId, PlayerId, ServerMessage};

/// Handle to one connection's outbound side.
///
/// Writes are non-blocking: a full queue means the client has stopped
/// draining, so the connection is treated as dead and its kill token is
/// cancelled. The socket task watches that token and closes the stream;
/// grace-period semantics then apply through the normal disconnect path.
#[derive(Clone)]
pub struct OutboundHandle {
    id: ConnectionId,
    tx: mpsc::Sender<Arc<ServerMessage>>,
    kill: CancellationToken,
}

impl OutboundHandle {
    pub fn new(
        id: ConnectionId,
        tx: mpsc::Sender<Arc<ServerMessage>>,
        kill: CancellationToken,
    ) -> Self {
        Self { id, tx, kill }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue a message without blocking. Returns false when the connection
    /// is dead or was just declared dead by overflow.
    pub fn send(&self, message: Arc<ServerMessage>) -> bool {
        match self.tx.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(connection_id = %self.id, "Outbound queue overflow, closing connection");
                self.kill.cancel();
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.kill.cancel();
                false
            }
        }
    }

    /// Force-close the connection (queue drained first by the socket task).
    pub fn close(&self) {
        self.kill.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.kill.is_cancelled()
    }
}

struct ConnectionEntry {
    handle: OutboundHandle,
    player: Option<PlayerId>,
}

/// Registry of live connections and their player bindings.
///
/// A connection binds to at most one player (on create/join/rejoin); a
/// player's current connection is also held on its `Player` inside the
/// room, which is the authoritative edge. This registry answers the
/// reverse lookup on inbound messages and socket close.
#[derive(Clone)]
pub struct ConnectionManager {
    connections: Arc<DashMap<ConnectionId, ConnectionEntry>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(DashMap::new()),
        }
    }

    pub fn register(&self, handle: OutboundHandle) {
        self.connections.insert(
            handle.id(),
            ConnectionEntry {
                handle,
                player: None,
            },
        );
    }

    /// Remove a closed connection, returning the player it was bound to.
    pub fn remove(&self, id: ConnectionId) -> Option<PlayerId> {
        self.connections.remove(&id).and_then(|(_, e)| e.player)
    }

    pub fn handle_of(&self, id: ConnectionId) -> Option<OutboundHandle> {
        self.connections.get(&id).map(|e| e.handle.clone())
    }

    pub fn player_of(&self, id: ConnectionId) -> Option<PlayerId> {
        self.connections.get(&id).and_then(|e| e.player)
    }

    pub fn bind_player(&self, id: ConnectionId, player_id: PlayerId) {
        if let Some(mut entry) = self.connections.get_mut(&id) {
            entry.player = Some(player_id);
        }
    }

    /// Drop the connection->player edge (player left their room; the
    /// connection itself stays usable).
    pub fn unbind_player(&self, id: ConnectionId) {
        if let Some(mut entry) = self.connections.get_mut(&id) {
            entry.player = None;
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn close_all(&self) {
        for entry in self.connections.iter() {
            entry.handle.close();
        }
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_handle(capacity: usize) -> (OutboundHandle, mpsc::Receiver<Arc<ServerMessage>>) {
        let (tx, rx) = mpsc::channel(capacity);
        let handle = OutboundHandle::new(uuid::Uuid::new_v4(), tx, CancellationToken::new());
        (handle, rx)
    }

    #[tokio::test]
    async fn overflow_kills_the_connection() {
        let (handle, _rx) = test_handle(1);
        assert!(handle.send(Arc::new(ServerMessage::ReplacedByNewConnection)));
        // Queue full: declared dead.
        assert!(!handle.send(Arc::new(ServerMessage::ReplacedByNewConnection)));
        assert!(handle.is_closed());
    }

    #[tokio::test]
    async fn binding_round_trip() {
        let manager = ConnectionManager::new();
        let (handle, _rx) = test_handle(4);
        let id = handle.id();
        manager.register(handle);

        assert_eq!(manager.player_of(id), None);
        manager.bind_player(id, PlayerId(9));
        assert_eq!(manager.player_of(id), Some(PlayerId(9)));
        manager.unbind_player(id);
        assert_eq!(manager.player_of(id), None);

        manager.bind_player(id, PlayerId(9));
        assert_eq!(manager.remove(id), Some(PlayerId(9)));
        assert_eq!(manager.connection_count(), 0);
    }
}
