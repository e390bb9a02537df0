use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::GameServer;
use crate::game::validator::{check_hard_mode, color_guess, competitive_score, is_winning};
use crate::game::words;
use crate::persistence::{DailyCompletion, GameRecord};
use crate::protocol::messages::{GameEndedPayload, PlayerElapsed};
use crate::protocol::{
    validation, ConnectionId, ErrorCode, GameMode, ServerMessage, WordMode, MAX_GUESSES,
    WORD_LENGTH,
};
use crate::room::timers::ScheduledTask;
use crate::room::{Player, Room, RoomState};

impl GameServer {
    pub async fn handle_set_ready(&self, conn_id: ConnectionId, ready: bool) {
        let Some((player_id, _code, room_arc)) = self.resolve_player_room(conn_id) else {
            self.send_error_to_conn(conn_id, "Not in a room", ErrorCode::NotInRoom);
            return;
        };
        let mut room = room_arc.lock().await;
        if room.state != RoomState::Waiting {
            self.send_error_to_conn(
                conn_id,
                "Ready state only applies in the waiting room",
                ErrorCode::InvalidRoomState,
            );
            return;
        }
        if room.countdown_active() {
            tracing::debug!(room_code = %room.code, %player_id, "Ignoring ready toggle during countdown");
            return;
        }
        if room.creator == player_id {
            self.send_error_to_conn(conn_id, "The host is always ready", ErrorCode::InvalidInput);
            return;
        }
        if let Some(player) = room.players.get_mut(&player_id) {
            player.ready = ready;
        }
        self.broadcast_room(&room, ServerMessage::PlayerReadyChanged { player_id, ready });
        self.notify_host_ready_status(&room);
    }

    pub async fn handle_start_game(&self, conn_id: ConnectionId) {
        let Some((player_id, _code, room_arc)) = self.resolve_player_room(conn_id) else {
            self.send_error_to_conn(conn_id, "Not in a room", ErrorCode::NotInRoom);
            return;
        };
        let mut room = room_arc.lock().await;
        if room.creator != player_id {
            self.send_error_to_conn(conn_id, "Only the host can start the game", ErrorCode::NotHost);
            return;
        }
        if room.state != RoomState::Waiting || room.countdown_active() {
            self.send_error_to_conn(conn_id, "Game already in progress", ErrorCode::GameInProgress);
            return;
        }
        if !room.all_ready() {
            self.send_error_to_conn(conn_id, "Not all players are ready", ErrorCode::NotAllReady);
            return;
        }
        if !room.solo && room.player_count() < 2 {
            self.send_error_to_conn(
                conn_id,
                "Need at least two players to start",
                ErrorCode::NotEnoughPlayers,
            );
            return;
        }
        if room.word_mode == WordMode::Sabotage && room.player_count() < 2 {
            // A derangement needs someone else to pick for.
            self.send_error_to_conn(
                conn_id,
                "Sabotage needs at least two players",
                ErrorCode::NotEnoughPlayers,
            );
            return;
        }
        self.begin_countdown_locked(&mut room, &room_arc);
    }

    /// Kick off the 3-2-1 countdown. Ticks broadcast once per second; game
    /// actions stay locked out until the countdown completes and the real
    /// transition runs.
    pub(crate) fn begin_countdown_locked(&self, room: &mut Room, room_arc: &Arc<Mutex<Room>>) {
        room.cancel_game_timers();
        let epoch = room.epoch;
        let secs = self.config().countdown_secs;
        let server = self.clone();
        let arc = Arc::clone(room_arc);
        tracing::info!(room_code = %room.code, "Starting game countdown");
        room.countdown = Some(ScheduledTask::spawn(async move {
            for remaining in (1..=secs).rev() {
                {
                    let room = arc.lock().await;
                    if room.epoch != epoch {
                        return;
                    }
                    server.broadcast_room(
                        &room,
                        ServerMessage::Countdown {
                            value: remaining as u8,
                        },
                    );
                }
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            let mut room = arc.lock().await;
            if room.epoch != epoch {
                return;
            }
            if let Some(task) = room.countdown.take() {
                task.detach();
            }
            server.complete_countdown_locked(&mut room, &arc);
        }));
        self.schedule_lobby_refresh();
    }

    fn complete_countdown_locked(&self, room: &mut Room, room_arc: &Arc<Mutex<Room>>) {
        match room.word_mode {
            WordMode::Sabotage => self.enter_selection_locked(room, room_arc),
            _ => self.start_playing_locked(room, room_arc),
        }
    }

    /// Transition into `Playing`: pick targets, stamp the clock, start the
    /// tick broadcast. Reached from the countdown (daily/random) or from
    /// the end of the selection phase (sabotage).
    pub(crate) fn start_playing_locked(&self, room: &mut Room, room_arc: &Arc<Mutex<Room>>) {
        let seed = room
            .test_word
            .clone()
            .filter(|_| self.config().test_mode);
        if room.word_mode == WordMode::Sabotage {
            if let (Some(seed), Some(selection)) = (&seed, room.selection.as_mut()) {
                for assignment in selection.assignments.values_mut() {
                    assignment.word = seed.clone();
                }
            }
        } else {
            let target = seed.unwrap_or_else(|| match room.word_mode {
                WordMode::Daily => self.dictionary().daily_answer(
                    room.daily_number
                        .unwrap_or_else(words::current_daily_number),
                ),
                _ => self.dictionary().random_answer(),
            });
            room.target_word = Some(target);
        }

        room.state = RoomState::Playing;
        room.started_at = Some(Instant::now());
        room.started_at_wall = Some(Utc::now());
        room.game_id = Some(self.store().allocate_game_id());
        tracing::info!(
            room_code = %room.code,
            game_id = room.game_id.unwrap_or_default(),
            word_mode = ?room.word_mode,
            "Game started"
        );
        self.broadcast_room(
            room,
            ServerMessage::GameStarted {
                game_mode: room.game_mode,
                word_mode: room.word_mode,
                hard_mode: room.hard_mode,
                word_length: WORD_LENGTH,
                max_guesses: MAX_GUESSES,
            },
        );
        self.start_ticker_locked(room, room_arc);
    }

    /// One `timerSync` per second to every connected player while playing.
    fn start_ticker_locked(&self, room: &mut Room, room_arc: &Arc<Mutex<Room>>) {
        let epoch = room.epoch;
        let interval = Duration::from_millis(self.config().tick_interval_ms);
        let server = self.clone();
        let arc = Arc::clone(room_arc);
        room.ticker = Some(ScheduledTask::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let room = arc.lock().await;
                if room.epoch != epoch || room.state != RoomState::Playing {
                    return;
                }
                let game_elapsed_ms = room.elapsed_ms();
                let players = room
                    .players
                    .values()
                    .map(|p| PlayerElapsed {
                        player_id: p.id,
                        elapsed_ms: p.board.finish_time_ms.unwrap_or(game_elapsed_ms),
                    })
                    .collect();
                server.broadcast_room(
                    &room,
                    ServerMessage::TimerSync {
                        game_elapsed_ms,
                        players,
                    },
                );
            }
        }));
    }

    /// The server-authoritative guess pipeline: shape validation,
    /// dictionary check, hard mode, coloring, finish detection.
    pub async fn handle_guess(&self, conn_id: ConnectionId, word: String, forced: bool) {
        let Some((player_id, code, room_arc)) = self.resolve_player_room(conn_id) else {
            self.send_error_to_conn(conn_id, "Not in a room", ErrorCode::NotInRoom);
            return;
        };
        let mut room = room_arc.lock().await;
        if room.state != RoomState::Playing {
            self.send_error_to_conn(conn_id, "No game in progress", ErrorCode::InvalidRoomState);
            return;
        }
        let Some(player) = room.players.get(&player_id) else {
            return;
        };
        if player.board.finished {
            self.send_error_to_conn(conn_id, "You already finished this game", ErrorCode::AlreadyFinished);
            return;
        }

        let word = match validation::normalize_word(&word) {
            Ok(word) => word,
            Err(reason) => {
                self.send_error_to_conn(conn_id, reason, ErrorCode::InvalidWord);
                return;
            }
        };

        if !self.dictionary().is_valid_guess(&word) {
            if forced {
                // User insisted after repeated rejections: admit the word
                // and queue it for dictionary review.
                let log = Arc::clone(self.forced_words());
                let entry_word = word.clone();
                let player_name = player.name.clone();
                let player_email = player.email.clone();
                let room_code = code.clone();
                tracing::info!(%player_id, room_code = %code, word = %word, "Admitting forced guess");
                tokio::spawn(async move {
                    log.append(
                        &entry_word,
                        &player_name,
                        player_email.as_deref(),
                        &room_code,
                    )
                    .await;
                });
            } else {
                self.send_error_to_conn(
                    conn_id,
                    format!("{word} is not in the dictionary"),
                    ErrorCode::WordNotInDictionary,
                );
                return;
            }
        }

        if room.hard_mode && !player.board.guesses.is_empty() {
            if let Err(violation) =
                check_hard_mode(&player.board.guesses, &player.board.results, &word)
            {
                // Rejected without consuming a guess slot.
                self.send_to_conn(
                    conn_id,
                    ServerMessage::HardModeViolation {
                        reason: violation.to_string(),
                    },
                );
                return;
            }
        }

        let Some(target) = room.target_for(player_id).map(str::to_string) else {
            tracing::error!(%player_id, room_code = %code, "Playing room has no target for player");
            self.send_error_to_conn(conn_id, "Internal error", ErrorCode::InternalError);
            return;
        };

        let marks = color_guess(&word, &target);
        let won = is_winning(&marks);
        let elapsed_ms = room.elapsed_ms();
        let game_mode = room.game_mode;

        let (guesses_used, finished, score) = {
            let Some(player) = room.players.get_mut(&player_id) else {
                return;
            };
            player.board.guesses.push(word.clone());
            player.board.results.push(marks);
            let guesses_used = player.board.guesses.len();
            let finished = won || guesses_used >= MAX_GUESSES;
            if finished {
                player.board.finished = true;
                player.board.won = won;
                player.board.finish_time_ms = Some(elapsed_ms);
                if won && game_mode == GameMode::Competitive {
                    player.board.score = competitive_score(guesses_used, elapsed_ms, true);
                }
            }
            let score = (finished && game_mode == GameMode::Competitive)
                .then_some(player.board.score);
            (guesses_used, finished, score)
        };

        self.send_to_player(
            &room,
            player_id,
            ServerMessage::GuessResult {
                word,
                result: marks,
                guesses_used,
                finished,
                won,
                score,
            },
        );
        // Opponents see colors only; the letters stay secret.
        self.broadcast_room_except(
            &room,
            player_id,
            ServerMessage::OpponentGuess {
                player_id,
                result: marks,
                guesses_used,
                finished,
                won,
            },
        );

        if finished && room.all_players_finished() {
            self.finish_game_locked(&mut room, None).await;
        }
    }

    /// End the game: freeze the clock, rank everyone, reveal targets,
    /// hand the record to the persistence adapter.
    pub(crate) async fn finish_game_locked(&self, room: &mut Room, departed: Option<&Player>) {
        room.cancel_game_timers();
        room.state = RoomState::Finished;

        let results = room.build_results(departed);
        let payload = GameEndedPayload {
            target_word: (room.word_mode != WordMode::Sabotage)
                .then(|| room.target_word.clone())
                .flatten(),
            results,
        };

        let record = GameRecord {
            game_id: room.game_id.unwrap_or_default(),
            room_code: room.code.clone(),
            target_word: room.target_word.clone(),
            game_mode: room.game_mode,
            hard_mode: room.hard_mode,
            started_at: room.started_at_wall.unwrap_or_else(Utc::now),
            results: payload.results.clone(),
        };

        room.last_results = Some(payload.clone());
        // Targets are revealed in the payload; outside `Playing` the room
        // itself carries none.
        room.target_word = None;

        tracing::info!(
            room_code = %room.code,
            game_id = record.game_id,
            players = record.results.len(),
            "Game finished"
        );
        self.broadcast_room(room, ServerMessage::GameEnded(Box::new(payload)));

        let store = Arc::clone(self.store());
        let game_id = record.game_id;
        tokio::spawn(async move {
            if let Err(err) = store.record_game(record).await {
                // Best effort: log and discard, never replay.
                tracing::warn!(game_id, error = %err, "Failed to persist game record");
            }
        });

        if let Some(daily_number) = room.daily_number {
            for player in room.players.values() {
                let Some(email) = player.email.clone() else {
                    continue;
                };
                let completion = DailyCompletion {
                    email,
                    daily_number,
                    guesses: player.board.guesses.clone(),
                    guess_count: player.board.guesses.len(),
                    won: player.board.won,
                    solve_time_ms: player.board.finish_time_ms.unwrap_or_default(),
                };
                let store = Arc::clone(self.store());
                tokio::spawn(async move {
                    if let Err(err) = store.record_daily_completion(completion).await {
                        tracing::warn!(daily_number, error = %err, "Failed to persist daily completion");
                    }
                });
            }
        }
    }

    /// Forfeit path: after a removal, a non-solo game with a single
    /// connected player left (and nobody in grace) ends immediately with
    /// that player declared winner. Returns true when the game was ended.
    pub(crate) async fn check_forfeit_locked(
        &self,
        room: &mut Room,
        departed: Option<&Player>,
    ) -> bool {
        if room.solo || !matches!(room.state, RoomState::Playing | RoomState::Selecting) {
            return false;
        }
        // Exactly one player left, and actually reachable. A lone
        // disconnected player keeps their grace window instead.
        if room.player_count() != 1 || room.connected_count() != 1 {
            return false;
        }
        let elapsed_ms = room.elapsed_ms();
        let Some(survivor) = room.players.values_mut().next() else {
            return false;
        };
        tracing::info!(
            room_code = %room.code,
            survivor = %survivor.id,
            "Game forfeited, declaring remaining player winner"
        );
        survivor.board.finished = true;
        survivor.board.won = true;
        survivor.board.finish_time_ms.get_or_insert(elapsed_ms);
        self.finish_game_locked(room, departed).await;
        true
    }

    pub async fn handle_play_again(&self, conn_id: ConnectionId) {
        let Some((player_id, _code, room_arc)) = self.resolve_player_room(conn_id) else {
            self.send_error_to_conn(conn_id, "Not in a room", ErrorCode::NotInRoom);
            return;
        };
        let mut room = room_arc.lock().await;
        if room.creator != player_id {
            self.send_error_to_conn(conn_id, "Only the host can restart", ErrorCode::NotHost);
            return;
        }
        if room.state != RoomState::Finished {
            self.send_error_to_conn(
                conn_id,
                "Play again is only available after a game ends",
                ErrorCode::InvalidRoomState,
            );
            return;
        }
        room.reset_for_next_game();
        tracing::info!(room_code = %room.code, "Room returned to waiting");
        self.broadcast_room(
            &room,
            ServerMessage::ReturnedToLobby(Box::new(room.snapshot())),
        );
        self.notify_host_ready_status(&room);
        drop(room);
        self.schedule_lobby_refresh();
    }
}
