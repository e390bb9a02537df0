use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::game::words::Dictionary;
use crate::persistence::{ForcedWordLog, GameStore, InMemoryGameStore};
use crate::protocol::{room_codes, ConnectionId, PlayerId, ServerMessage};
use crate::room::Room;

pub mod connection_manager;
pub mod game_service;
pub mod lobby_service;
pub mod message_router;
pub mod messaging;
pub mod reconnection_service;
pub mod room_service;
pub mod selection_service;

#[cfg(test)]
mod reconnection_service_tests;
#[cfg(test)]
pub(crate) mod test_support;

use connection_manager::{ConnectionManager, OutboundHandle};

/// The room manager and single source of truth for game state.
///
/// Cheap to clone: every field is a shared handle. Timer tasks and the
/// websocket layer each hold their own clone. All room state lives behind
/// per-room `Mutex`es inside `rooms`; the maps here are only indexes.
#[derive(Clone)]
pub struct GameServer {
    config: Arc<ServerConfig>,
    dictionary: Arc<Dictionary>,
    /// code -> room. Each room's mutex serializes every mutation of that
    /// room, including timer callbacks.
    rooms: Arc<DashMap<String, Arc<Mutex<Room>>>>,
    /// player id -> room code. A player appears in at most one room.
    player_rooms: Arc<DashMap<PlayerId, String>>,
    connections: ConnectionManager,
    /// Lobby subscribers, keyed by connection.
    lobby: Arc<DashMap<ConnectionId, OutboundHandle>>,
    store: Arc<dyn GameStore>,
    forced_words: Arc<ForcedWordLog>,
    next_player_id: Arc<AtomicU64>,
    shutdown: CancellationToken,
}

impl GameServer {
    pub fn new(config: ServerConfig, store: Arc<dyn GameStore>) -> Self {
        let forced_words = Arc::new(ForcedWordLog::new(config.forced_word_log_path.clone().into()));
        Self {
            config: Arc::new(config),
            dictionary: Arc::new(Dictionary::load()),
            rooms: Arc::new(DashMap::new()),
            player_rooms: Arc::new(DashMap::new()),
            connections: ConnectionManager::new(),
            lobby: Arc::new(DashMap::new()),
            store,
            forced_words,
            next_player_id: Arc::new(AtomicU64::new(0)),
            shutdown: CancellationToken::new(),
        }
    }

    /// Server with an in-memory store, as used by tests and the default
    /// deployment.
    pub fn with_defaults(config: ServerConfig) -> Self {
        Self::new(config, Arc::new(InMemoryGameStore::new()))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn store(&self) -> &Arc<dyn GameStore> {
        &self.store
    }

    pub(crate) fn forced_words(&self) -> &Arc<ForcedWordLog> {
        &self.forced_words
    }

    pub(crate) fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub(crate) fn issue_player_id(&self) -> PlayerId {
        PlayerId(self.next_player_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Sample codes until one is unused, within the configured retry
    /// bound. `None` only when the code space is effectively saturated.
    pub(crate) fn generate_unique_room_code(&self) -> Option<String> {
        for _ in 0..self.config.room_code_max_retries {
            let code = room_codes::generate_room_code();
            if !self.rooms.contains_key(&code) {
                return Some(code);
            }
        }
        None
    }

    pub fn room_by_code(&self, code: &str) -> Option<Arc<Mutex<Room>>> {
        self.rooms.get(code).map(|entry| Arc::clone(entry.value()))
    }

    /// The room the player currently belongs to, if any.
    pub fn room_of_player(&self, player_id: PlayerId) -> Option<(String, Arc<Mutex<Room>>)> {
        let code = self.player_rooms.get(&player_id)?.clone();
        let room = self.room_by_code(&code)?;
        Some((code, room))
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Everything still responsive? Used by the health endpoint.
    pub fn is_healthy(&self) -> bool {
        !self.shutdown.is_cancelled()
    }

    /// Best-effort shutdown: let rooms finish their current event, cancel
    /// every timer, close every connection with a normal-close reason.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let codes: Vec<String> = self.rooms.iter().map(|e| e.key().clone()).collect();
        for code in codes {
            if let Some(room) = self.room_by_code(&code) {
                let mut room = room.lock().await;
                room.cancel_game_timers();
                for player in room.players.values_mut() {
                    if let Some(timer) = player.removal_timer.take() {
                        timer.cancel();
                    }
                }
            }
        }
        self.connections.close_all();
        tracing::info!("Server shutdown complete");
    }

    /// Register a synthetic connection for in-process tests; returns the
    /// connection id and the receiving end of its outbound queue.
    pub fn connect_test_client(
        &self,
    ) -> (
        ConnectionId,
        tokio::sync::mpsc::Receiver<Arc<ServerMessage>>,
    ) {
        let (tx, rx) = tokio::sync::mpsc::channel(self.config.outbound_queue_size);
        let handle = OutboundHandle::new(uuid::Uuid::new_v4(), tx, CancellationToken::new());
        let id = handle.id();
        self.connections.register(handle);
        (id, rx)
    }
}
