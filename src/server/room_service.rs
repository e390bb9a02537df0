use std::sync::Arc;

use tokio::sync::Mutex;

use super::GameServer;
use crate::game::words;
use crate::protocol::messages::RoomJoinedPayload;
use crate::protocol::{
    validation, ConnectionId, ErrorCode, GameMode, PlayerId, ServerMessage, Visibility, WordMode,
};
use crate::room::{Player, Room, RoomState};

impl GameServer {
    /// Resolve the player and room behind a connection, or tell the client
    /// they are not in one.
    pub(crate) fn resolve_player_room(
        &self,
        conn_id: ConnectionId,
    ) -> Option<(PlayerId, String, Arc<Mutex<Room>>)> {
        let player_id = self.connections().player_of(conn_id)?;
        let (code, room) = self.room_of_player(player_id)?;
        Some((player_id, code, room))
    }

    fn require_player_room(
        &self,
        conn_id: ConnectionId,
    ) -> Option<(PlayerId, String, Arc<Mutex<Room>>)> {
        let resolved = self.resolve_player_room(conn_id);
        if resolved.is_none() {
            self.send_error_to_conn(conn_id, "Not in a room", ErrorCode::NotInRoom);
        }
        resolved
    }

    /// Shared guard for host-only waiting-room configuration. Returns
    /// false (after replying where appropriate) when the change must not
    /// proceed. Changes during an active countdown are ignored silently:
    /// the start is already committed.
    fn host_can_configure(&self, room: &Room, player_id: PlayerId, conn_id: ConnectionId) -> bool {
        if room.creator != player_id {
            self.send_error_to_conn(conn_id, "Only the host can change settings", ErrorCode::NotHost);
            return false;
        }
        if room.state != RoomState::Waiting {
            self.send_error_to_conn(conn_id, "Game already in progress", ErrorCode::GameInProgress);
            return false;
        }
        if room.countdown_active() {
            tracing::debug!(room_code = %room.code, "Ignoring settings change during countdown");
            return false;
        }
        true
    }

    pub async fn handle_create_room(
        &self,
        conn_id: ConnectionId,
        player_name: String,
        player_email: Option<String>,
        test_word: Option<String>,
    ) {
        if let Err(reason) = validation::validate_player_name(&player_name) {
            self.send_error_to_conn(conn_id, reason, ErrorCode::InvalidInput);
            return;
        }
        if self.connections().player_of(conn_id).is_some() {
            self.send_error_to_conn(conn_id, "Already in a room", ErrorCode::AlreadyInRoom);
            return;
        }
        let Some(handle) = self.connections().handle_of(conn_id) else {
            return;
        };
        let Some(code) = self.generate_unique_room_code() else {
            tracing::error!("Room code space exhausted after bounded retries");
            self.send_error_to_conn(conn_id, "Could not allocate a room code", ErrorCode::InternalError);
            return;
        };

        let player_id = self.issue_player_id();
        let mut host = Player::new(player_id, player_name, player_email, true);
        host.connection = Some(handle);
        let mut room = Room::new(code.clone(), host);
        room.test_word = sanitize_test_word(test_word);

        self.register_room(conn_id, player_id, &code, room);
        tracing::info!(%player_id, room_code = %code, "Room created");
        self.send_to_conn(
            conn_id,
            ServerMessage::RoomCreated {
                room_code: code,
                player_id,
            },
        );
    }

    pub async fn handle_create_daily_challenge(
        &self,
        conn_id: ConnectionId,
        player_name: String,
        player_email: Option<String>,
        daily_number: u32,
        solo: bool,
        test_word: Option<String>,
    ) {
        if let Err(reason) = validation::validate_player_name(&player_name) {
            self.send_error_to_conn(conn_id, reason, ErrorCode::InvalidInput);
            return;
        }
        // Daily challenges are once per account; an account means a
        // verified email.
        let Some(email) = player_email.filter(|e| !e.trim().is_empty()) else {
            self.send_error_to_conn(
                conn_id,
                "Daily challenges require a signed-in account",
                ErrorCode::AuthRequired,
            );
            return;
        };
        let current = words::current_daily_number();
        if daily_number < 1 || daily_number > current {
            self.send_error_to_conn(
                conn_id,
                format!("Daily number must be between 1 and {current}"),
                ErrorCode::DailyOutOfRange,
            );
            return;
        }
        // Fail closed: a storage error must not hand out a second attempt.
        match self.store().has_completed_daily(&email, daily_number).await {
            Ok(false) => {}
            Ok(true) => {
                self.send_error_to_conn(
                    conn_id,
                    format!("Daily challenge #{daily_number} already completed"),
                    ErrorCode::DailyAlreadyCompleted,
                );
                return;
            }
            Err(err) => {
                tracing::error!(error = %err, daily_number, "Daily completion precheck failed");
                self.send_error_to_conn(
                    conn_id,
                    "Could not verify daily challenge status, try again later",
                    ErrorCode::InternalError,
                );
                return;
            }
        }
        if self.connections().player_of(conn_id).is_some() {
            self.send_error_to_conn(conn_id, "Already in a room", ErrorCode::AlreadyInRoom);
            return;
        }
        let Some(handle) = self.connections().handle_of(conn_id) else {
            return;
        };
        let Some(code) = self.generate_unique_room_code() else {
            tracing::error!("Room code space exhausted after bounded retries");
            self.send_error_to_conn(conn_id, "Could not allocate a room code", ErrorCode::InternalError);
            return;
        };

        let player_id = self.issue_player_id();
        let mut host = Player::new(player_id, player_name, Some(email), true);
        host.connection = Some(handle);
        let mut room = Room::new(code.clone(), host);
        room.word_mode = WordMode::Daily;
        // Daily rooms never surface in the lobby.
        room.visibility = Visibility::Private;
        room.daily_number = Some(daily_number);
        room.solo = solo;
        room.test_word = sanitize_test_word(test_word);

        let room_arc = self.register_room(conn_id, player_id, &code, room);
        tracing::info!(%player_id, room_code = %code, daily_number, solo, "Daily challenge room created");
        self.send_to_conn(
            conn_id,
            ServerMessage::RoomCreated {
                room_code: code,
                player_id,
            },
        );

        if solo {
            // Give the client a beat to process roomCreated before the
            // countdown ticks start arriving.
            let server = self.clone();
            let delay = self.config().solo_start_delay_ms;
            tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
                let mut room = room_arc.lock().await;
                if room.can_start() {
                    server.begin_countdown_locked(&mut room, &room_arc);
                }
            });
        }
    }

    fn register_room(
        &self,
        conn_id: ConnectionId,
        player_id: PlayerId,
        code: &str,
        room: Room,
    ) -> Arc<Mutex<Room>> {
        let room_arc = Arc::new(Mutex::new(room));
        self.rooms.insert(code.to_string(), Arc::clone(&room_arc));
        self.player_rooms.insert(player_id, code.to_string());
        self.connections().bind_player(conn_id, player_id);
        // A room member is no longer a lobby browser.
        self.lobby.remove(&conn_id);
        room_arc
    }

    pub async fn handle_join_room(
        &self,
        conn_id: ConnectionId,
        room_code: String,
        player_name: String,
        player_email: Option<String>,
    ) {
        if let Err(reason) = validation::validate_player_name(&player_name) {
            self.send_error_to_conn(conn_id, reason, ErrorCode::InvalidInput);
            return;
        }
        let code = match validation::normalize_room_code(&room_code) {
            Ok(code) => code,
            Err(reason) => {
                self.send_error_to_conn(conn_id, reason, ErrorCode::InvalidInput);
                return;
            }
        };
        if self.connections().player_of(conn_id).is_some() {
            self.send_error_to_conn(conn_id, "Already in a room", ErrorCode::AlreadyInRoom);
            return;
        }
        let Some(room_arc) = self.room_by_code(&code) else {
            self.send_error_to_conn(conn_id, format!("Room {code} not found"), ErrorCode::RoomNotFound);
            return;
        };
        let Some(handle) = self.connections().handle_of(conn_id) else {
            return;
        };

        let mut room = room_arc.lock().await;
        if room.state != RoomState::Waiting || room.countdown_active() {
            self.send_error_to_conn(conn_id, "Game already in progress", ErrorCode::GameInProgress);
            return;
        }
        if room.is_full() {
            self.send_error_to_conn(conn_id, "Room is full", ErrorCode::RoomFull);
            return;
        }
        if room
            .players
            .values()
            .any(|p| p.name.eq_ignore_ascii_case(&player_name))
        {
            self.send_error_to_conn(
                conn_id,
                "That name is already taken in this room",
                ErrorCode::InvalidInput,
            );
            return;
        }

        let player_id = self.issue_player_id();
        let mut player = Player::new(player_id, player_name, player_email, false);
        player.connection = Some(handle);
        let info = player.info();
        room.players.insert(player_id, player);
        self.player_rooms.insert(player_id, code.clone());
        self.connections().bind_player(conn_id, player_id);
        self.lobby.remove(&conn_id);

        tracing::info!(%player_id, room_code = %code, "Player joined room");
        self.send_to_conn(
            conn_id,
            ServerMessage::RoomJoined(Box::new(RoomJoinedPayload {
                player_id,
                room: room.snapshot(),
            })),
        );
        self.broadcast_room_except(&room, player_id, ServerMessage::PlayerJoined { player: info });
        self.notify_host_ready_status(&room);
        drop(room);
        self.schedule_lobby_refresh();
    }

    pub async fn handle_leave_room(&self, conn_id: ConnectionId) {
        let Some((player_id, code, room_arc)) = self.require_player_room(conn_id) else {
            return;
        };
        let mut room = room_arc.lock().await;
        // Confirmation to the leaver; the removal below only reaches the
        // players still in the room.
        self.send_to_conn(conn_id, ServerMessage::PlayerLeft { player_id });
        self.remove_player_locked(&mut room, &code, player_id).await;
    }

    pub async fn handle_set_game_mode(&self, conn_id: ConnectionId, mode: GameMode) {
        let Some((player_id, _code, room_arc)) = self.require_player_room(conn_id) else {
            return;
        };
        let mut room = room_arc.lock().await;
        if !self.host_can_configure(&room, player_id, conn_id) {
            return;
        }
        room.game_mode = mode;
        self.broadcast_room(&room, ServerMessage::GameModeChanged { mode });
        drop(room);
        self.schedule_lobby_refresh();
    }

    pub async fn handle_set_word_mode(&self, conn_id: ConnectionId, mode: WordMode) {
        let Some((player_id, _code, room_arc)) = self.require_player_room(conn_id) else {
            return;
        };
        let mut room = room_arc.lock().await;
        if !self.host_can_configure(&room, player_id, conn_id) {
            return;
        }
        if room.daily_number.is_some() {
            self.send_error_to_conn(
                conn_id,
                "Daily challenge rooms always play the daily word",
                ErrorCode::InvalidInput,
            );
            return;
        }
        room.word_mode = mode;
        self.broadcast_room(&room, ServerMessage::WordModeChanged { mode });
        drop(room);
        self.schedule_lobby_refresh();
    }

    pub async fn handle_set_hard_mode(&self, conn_id: ConnectionId, enabled: bool) {
        let Some((player_id, _code, room_arc)) = self.require_player_room(conn_id) else {
            return;
        };
        let mut room = room_arc.lock().await;
        if !self.host_can_configure(&room, player_id, conn_id) {
            return;
        }
        room.hard_mode = enabled;
        self.broadcast_room(&room, ServerMessage::HardModeChanged { enabled });
    }

    pub async fn handle_set_room_visibility(&self, conn_id: ConnectionId, visibility: Visibility) {
        let Some((player_id, _code, room_arc)) = self.require_player_room(conn_id) else {
            return;
        };
        let mut room = room_arc.lock().await;
        if !self.host_can_configure(&room, player_id, conn_id) {
            return;
        }
        if room.daily_number.is_some() {
            self.send_error_to_conn(
                conn_id,
                "Daily challenge rooms are always private",
                ErrorCode::InvalidInput,
            );
            return;
        }
        room.visibility = visibility;
        self.broadcast_room(&room, ServerMessage::RoomVisibilityChanged { visibility });
        drop(room);
        self.schedule_lobby_refresh();
    }

    /// Remove a player and run every consequence: broadcast, host
    /// reassignment, room destruction, forfeit and finish checks, lobby
    /// refresh. Shared by voluntary leave and grace-timer expiry.
    pub(crate) async fn remove_player_locked(
        &self,
        room: &mut Room,
        code: &str,
        player_id: PlayerId,
    ) {
        let Some(mut departed) = room.players.remove(&player_id) else {
            return;
        };
        if let Some(timer) = departed.removal_timer.take() {
            timer.cancel();
        }
        self.player_rooms.remove(&player_id);
        if let Some(connection) = departed.connection.take() {
            self.connections().unbind_player(connection.id());
        }
        tracing::info!(%player_id, room_code = %code, "Player removed from room");
        self.broadcast_room(room, ServerMessage::PlayerLeft { player_id });

        if room.players.is_empty() {
            self.destroy_room_locked(room, code).await;
            return;
        }

        if room.creator == player_id {
            // Earliest-joined connected player inherits the room.
            let new_host = room
                .players
                .values()
                .find(|p| p.is_connected())
                .map(|p| p.id);
            match new_host {
                Some(id) => {
                    room.creator = id;
                    if let Some(host) = room.players.get_mut(&id) {
                        host.is_host = true;
                        host.ready = true;
                    }
                    tracing::info!(room_code = %code, new_host = %id, "Host reassigned");
                    self.broadcast_room(room, ServerMessage::BecameCreator { player_id: id });
                }
                None => {
                    // No connected player can take over; the room dies.
                    self.destroy_room_locked(room, code).await;
                    return;
                }
            }
        }

        match room.state {
            RoomState::Waiting => {
                // A departure mid-countdown can break the minimum-player
                // gate; the start is no longer valid.
                if room.countdown_active() && !room.solo && room.player_count() < 2 {
                    room.cancel_game_timers();
                    tracing::info!(room_code = %code, "Countdown cancelled, not enough players");
                }
                self.notify_host_ready_status(room);
            }
            RoomState::Selecting => {
                if !self.check_forfeit_locked(room, Some(&departed)).await {
                    self.check_selection_complete_locked(room).await;
                }
            }
            RoomState::Playing => {
                if !self.check_forfeit_locked(room, Some(&departed)).await
                    && room.all_players_finished()
                {
                    self.finish_game_locked(room, None).await;
                }
            }
            RoomState::Finished => {}
        }
        self.schedule_lobby_refresh();
    }

    /// Tear the room down: cancel timers, release every index entry. The
    /// room stays locked throughout; once the map entry is gone no new
    /// handler can reach it.
    pub(crate) async fn destroy_room_locked(&self, room: &mut Room, code: &str) {
        room.cancel_game_timers();
        let player_ids: Vec<PlayerId> = room.players.keys().copied().collect();
        for player_id in player_ids {
            if let Some(mut player) = room.players.remove(&player_id) {
                if let Some(timer) = player.removal_timer.take() {
                    timer.cancel();
                }
                self.player_rooms.remove(&player_id);
                if let Some(connection) = player.connection.take() {
                    self.connections().unbind_player(connection.id());
                }
            }
        }
        self.rooms.remove(code);
        tracing::info!(room_code = %code, "Room destroyed");
        self.schedule_lobby_refresh();
    }
}

/// Keep a test-word seed only when it has the right shape; it is honored
/// later, and only in test mode.
fn sanitize_test_word(test_word: Option<String>) -> Option<String> {
    test_word.and_then(|w| validation::normalize_word(&w).ok())
}
