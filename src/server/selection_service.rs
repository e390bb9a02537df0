use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::GameServer;
use crate::game::sabotage::{assign_targets, WordAssignment};
use crate::protocol::{validation, ConnectionId, ErrorCode, PlayerId, ServerMessage};
use crate::room::timers::ScheduledTask;
use crate::room::{Room, RoomState, SelectionState};

impl GameServer {
    /// Enter the sabotage selection phase: derange pickers onto targets,
    /// tell each picker whose word they are choosing, arm the deadline.
    pub(crate) fn enter_selection_locked(&self, room: &mut Room, room_arc: &Arc<Mutex<Room>>) {
        let ids: Vec<PlayerId> = room.players.keys().copied().collect();
        let picks: BTreeMap<PlayerId, PlayerId> = assign_targets(&ids).into_iter().collect();
        let duration = Duration::from_secs(self.config().selection_phase_secs);
        let time_limit_ms = duration.as_millis() as u64;

        room.state = RoomState::Selecting;
        room.selection = Some(SelectionState {
            picks: picks.clone(),
            assignments: BTreeMap::new(),
            deadline: Instant::now() + duration,
            timer: None,
        });
        tracing::info!(room_code = %room.code, players = ids.len(), "Selection phase started");

        for (picker, target) in &picks {
            let Some(target_player) = room.players.get(target) else {
                continue;
            };
            self.send_to_player(
                room,
                *picker,
                ServerMessage::SelectionPhaseStarted {
                    target_player_id: *target,
                    target_player_name: target_player.name.clone(),
                    time_limit_ms,
                },
            );
        }

        let epoch = room.epoch;
        let server = self.clone();
        let arc = Arc::clone(room_arc);
        let timer = ScheduledTask::spawn(async move {
            tokio::time::sleep(duration).await;
            let mut room = arc.lock().await;
            if room.epoch != epoch || room.state != RoomState::Selecting {
                return;
            }
            if let Some(selection) = room.selection.as_mut() {
                if let Some(timer) = selection.timer.take() {
                    timer.detach();
                }
            }
            server.selection_deadline_locked(&mut room, &arc);
        });
        if let Some(selection) = room.selection.as_mut() {
            selection.timer = Some(timer);
        }
        self.schedule_lobby_refresh();
    }

    /// A picker proposes (or replaces) the word for their target. Last
    /// valid submission wins until the deadline; there is no lock action.
    pub async fn handle_submit_word(&self, conn_id: ConnectionId, word: String) {
        let Some((player_id, _code, room_arc)) = self.resolve_player_room(conn_id) else {
            self.send_error_to_conn(conn_id, "Not in a room", ErrorCode::NotInRoom);
            return;
        };
        let mut room = room_arc.lock().await;
        if room.state != RoomState::Selecting {
            self.send_error_to_conn(
                conn_id,
                "No word selection in progress",
                ErrorCode::InvalidRoomState,
            );
            return;
        }

        let word = match validation::normalize_word(&word) {
            Ok(word) => word,
            Err(reason) => {
                self.send_to_conn(
                    conn_id,
                    ServerMessage::WordValidation {
                        word,
                        valid: false,
                        reason: Some(reason),
                    },
                );
                return;
            }
        };
        // Sabotage picks must be answer-eligible, not merely guessable.
        if !self.dictionary().is_answer(&word) {
            self.send_to_conn(
                conn_id,
                ServerMessage::WordValidation {
                    word,
                    valid: false,
                    reason: Some("Word is not in the answer list".to_string()),
                },
            );
            return;
        }

        let picker_name = room
            .players
            .get(&player_id)
            .map(|p| p.name.clone())
            .unwrap_or_default();
        let Some(selection) = room.selection.as_mut() else {
            return;
        };
        let Some(target) = selection.target_of(player_id) else {
            self.send_error_to_conn(conn_id, "No pick assigned to you", ErrorCode::InternalError);
            return;
        };
        selection.assignments.insert(
            target,
            WordAssignment {
                picker: player_id,
                picker_name,
                word: word.clone(),
                submitted_at: Utc::now(),
                forced: false,
            },
        );
        tracing::debug!(%player_id, room_code = %room.code, "Word submitted for sabotage target");

        self.send_to_player(
            &room,
            player_id,
            ServerMessage::WordValidation {
                word: word.clone(),
                valid: true,
                reason: None,
            },
        );
        self.send_to_player(&room, player_id, ServerMessage::WordSubmitted { word });
        self.broadcast_room(
            &room,
            ServerMessage::SelectionProgress {
                submitted: room.selection_submitted_count(),
                total: room.player_count(),
            },
        );

        if room.selection_complete() {
            self.broadcast_room(&room, ServerMessage::AllWordsSubmitted);
            if let Some(selection) = room.selection.as_mut() {
                if let Some(timer) = selection.timer.take() {
                    timer.cancel();
                }
            }
            self.start_playing_locked(&mut room, &room_arc);
        }
    }

    /// Deadline fired: auto-assign a random answer-eligible word to every
    /// player whose picker never submitted, then start the game.
    pub(crate) fn selection_deadline_locked(&self, room: &mut Room, room_arc: &Arc<Mutex<Room>>) {
        let Some(selection) = room.selection.as_ref() else {
            return;
        };
        let missing: Vec<PlayerId> = room
            .players
            .keys()
            .filter(|id| !selection.assignments.contains_key(id))
            .copied()
            .collect();

        let mut auto_assigned: Vec<PlayerId> = Vec::new();
        for target in missing {
            let word = self.dictionary().random_answer();
            let picker = room
                .selection
                .as_ref()
                .and_then(|sel| {
                    sel.picks
                        .iter()
                        .find(|(_, t)| **t == target)
                        .map(|(p, _)| *p)
                })
                .unwrap_or(target);
            let picker_name = room
                .players
                .get(&picker)
                .map(|p| p.name.clone())
                .unwrap_or_default();
            tracing::info!(
                room_code = %room.code,
                %picker,
                %target,
                word = %word,
                "Forced assignment after selection timeout"
            );
            if let Some(selection) = room.selection.as_mut() {
                selection.assignments.insert(
                    target,
                    WordAssignment {
                        picker,
                        picker_name,
                        word,
                        submitted_at: Utc::now(),
                        forced: true,
                    },
                );
            }
            auto_assigned.push(picker);
        }

        self.broadcast_room(room, ServerMessage::SelectionTimeout { auto_assigned });
        self.start_playing_locked(room, room_arc);
    }

    /// Re-check completion after a player removal mid-selection; with the
    /// slow picker gone, everyone left may already be covered.
    pub(crate) async fn check_selection_complete_locked(&self, room: &mut Room) {
        if room.state != RoomState::Selecting || !room.selection_complete() {
            return;
        }
        let Some(room_arc) = self.room_by_code(&room.code) else {
            return;
        };
        self.broadcast_room(room, ServerMessage::AllWordsSubmitted);
        if let Some(selection) = room.selection.as_mut() {
            if let Some(timer) = selection.timer.take() {
                timer.cancel();
            }
        }
        self.start_playing_locked(room, &room_arc);
    }
}
