//! The room: per-game state machine, participants and their boards, and
//! the timer handles the room owns.
//!
//! A room is always wrapped in `Arc<tokio::sync::Mutex<Room>>`; every
//! mutation (inbound message, timer callback, disconnect, rejoin) runs
//! under that lock, which is the per-room serialization the rest of the
//! server relies on. Nothing in this module takes other locks, so lock
//! ordering stays trivial.

pub mod timers;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use crate::game::sabotage::WordAssignment;
use crate::protocol::{
    GameMode, LetterMark, PlayerId, PlayerInfo, PlayerResult, RoomListing, RoomSnapshot,
    RoomStateKind, Visibility, WordMode, MAX_PLAYERS_PER_ROOM, WORD_LENGTH,
};
use crate::server::connection_manager::OutboundHandle;
use timers::ScheduledTask;

/// Room lifecycle state. The start countdown is not a state of its own: it
/// is a transient sub-state of `Waiting` (see [`Room::countdown`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    Waiting,
    Selecting,
    Playing,
    Finished,
}

impl RoomState {
    pub fn kind(self) -> RoomStateKind {
        match self {
            RoomState::Waiting => RoomStateKind::Waiting,
            RoomState::Selecting => RoomStateKind::Selecting,
            RoomState::Playing => RoomStateKind::Playing,
            RoomState::Finished => RoomStateKind::Finished,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

/// A player's game-local state, reset on every return to `waiting`.
#[derive(Debug, Default)]
pub struct PlayerBoard {
    pub guesses: Vec<String>,
    pub results: Vec<[LetterMark; WORD_LENGTH]>,
    pub finished: bool,
    pub won: bool,
    pub finish_time_ms: Option<u64>,
    pub score: u32,
}

impl PlayerBoard {
    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// A participant. Owned exclusively by its room; the connection is held by
/// handle and may be absent during the reconnection grace period.
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub email: Option<String>,
    pub is_host: bool,
    pub ready: bool,
    pub connection: Option<OutboundHandle>,
    pub status: ConnectionStatus,
    pub disconnected_at: Option<DateTime<Utc>>,
    pub removal_timer: Option<ScheduledTask>,
    pub board: PlayerBoard,
}

impl Player {
    pub fn new(id: PlayerId, name: String, email: Option<String>, is_host: bool) -> Self {
        Self {
            id,
            name,
            email,
            // The host is always ready; only guests toggle the flag.
            is_host,
            ready: is_host,
            connection: None,
            status: ConnectionStatus::Connected,
            disconnected_at: None,
            removal_timer: None,
            board: PlayerBoard::default(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    pub fn info(&self) -> PlayerInfo {
        PlayerInfo {
            id: self.id,
            name: self.name.clone(),
            is_host: self.is_host,
            ready: self.ready,
            connected: self.is_connected(),
        }
    }
}

/// Sabotage selection-phase sub-state, present only while `Selecting`.
pub struct SelectionState {
    /// picker -> target; a derangement of the participants.
    pub picks: BTreeMap<PlayerId, PlayerId>,
    /// target -> the word picked for them. Last valid submission wins
    /// until the deadline.
    pub assignments: BTreeMap<PlayerId, WordAssignment>,
    pub deadline: Instant,
    pub timer: Option<ScheduledTask>,
}

impl SelectionState {
    pub fn target_of(&self, picker: PlayerId) -> Option<PlayerId> {
        self.picks.get(&picker).copied()
    }

    /// The word `picker` has submitted so far, if any.
    pub fn submitted_word_of(&self, picker: PlayerId) -> Option<&str> {
        let target = self.picks.get(&picker)?;
        let assignment = self.assignments.get(target)?;
        (assignment.picker == picker && !assignment.forced).then_some(assignment.word.as_str())
    }
}

pub struct Room {
    pub code: String,
    /// Keyed by monotonic player id, so iteration order is join order.
    pub players: BTreeMap<PlayerId, Player>,
    pub state: RoomState,
    pub game_mode: GameMode,
    pub word_mode: WordMode,
    pub hard_mode: bool,
    pub visibility: Visibility,
    pub daily_number: Option<u32>,
    pub solo: bool,
    pub creator: PlayerId,
    /// Shared target for daily/random games. Set on entry to `Playing`,
    /// null in every other state. Sabotage targets live in `selection`.
    pub target_word: Option<String>,
    pub started_at: Option<Instant>,
    pub started_at_wall: Option<DateTime<Utc>>,
    pub countdown: Option<ScheduledTask>,
    pub ticker: Option<ScheduledTask>,
    pub selection: Option<SelectionState>,
    /// Honored only when the process runs in test mode.
    pub test_word: Option<String>,
    /// Issued by the persistence adapter when a game starts.
    pub game_id: Option<u64>,
    /// Scoreboard of the most recent game, kept while `Finished` so late
    /// rejoiners can be shown the results.
    pub last_results: Option<crate::protocol::GameEndedPayload>,
    /// Bumped on every state transition; timer callbacks captured under an
    /// older epoch become no-ops.
    pub epoch: u64,
}

impl Room {
    pub fn new(code: String, host: Player) -> Self {
        let creator = host.id;
        let mut players = BTreeMap::new();
        players.insert(host.id, host);
        Self {
            code,
            players,
            state: RoomState::Waiting,
            game_mode: GameMode::default(),
            word_mode: WordMode::default(),
            hard_mode: false,
            visibility: Visibility::default(),
            daily_number: None,
            solo: false,
            creator,
            target_word: None,
            started_at: None,
            started_at_wall: None,
            countdown: None,
            ticker: None,
            selection: None,
            test_word: None,
            game_id: None,
            last_results: None,
            epoch: 0,
        }
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn connected_count(&self) -> usize {
        self.players.values().filter(|p| p.is_connected()).count()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= MAX_PLAYERS_PER_ROOM
    }

    pub fn countdown_active(&self) -> bool {
        self.countdown.is_some()
    }

    pub fn host(&self) -> Option<&Player> {
        self.players.get(&self.creator)
    }

    pub fn all_ready(&self) -> bool {
        self.players.values().all(|p| p.ready)
    }

    pub fn ready_count(&self) -> usize {
        self.players.values().filter(|p| p.ready).count()
    }

    /// Ready-start gate: all ready, and either solo or at least two players.
    pub fn can_start(&self) -> bool {
        self.state == RoomState::Waiting
            && !self.countdown_active()
            && self.all_ready()
            && (self.solo || self.player_count() >= 2)
    }

    /// The word `player_id` is trying to solve: their sabotage assignment,
    /// or the shared target otherwise.
    pub fn target_for(&self, player_id: PlayerId) -> Option<&str> {
        if self.word_mode == WordMode::Sabotage {
            self.selection
                .as_ref()
                .and_then(|sel| sel.assignments.get(&player_id))
                .map(|a| a.word.as_str())
        } else {
            self.target_word.as_deref()
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started_at
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0)
    }

    pub fn all_players_finished(&self) -> bool {
        !self.players.is_empty() && self.players.values().all(|p| p.board.finished)
    }

    /// Bump the timer epoch and drop every game timer. Removal (grace)
    /// timers are per-player and survive transitions.
    pub fn cancel_game_timers(&mut self) {
        self.epoch += 1;
        if let Some(t) = self.countdown.take() {
            t.cancel();
        }
        if let Some(t) = self.ticker.take() {
            t.cancel();
        }
        if let Some(sel) = self.selection.as_mut() {
            if let Some(t) = sel.timer.take() {
                t.cancel();
            }
        }
    }

    /// Wire-facing description of the room.
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room_code: self.code.clone(),
            state: self.state.kind(),
            players: self.players.values().map(Player::info).collect(),
            host_id: self.creator,
            game_mode: self.game_mode,
            word_mode: self.word_mode,
            hard_mode: self.hard_mode,
            visibility: self.visibility,
            solo: self.solo,
            daily_number: self.daily_number,
        }
    }

    /// Lobby listing, or `None` when the room is not joinable via the
    /// public lobby.
    pub fn listing(&self) -> Option<RoomListing> {
        let joinable = self.visibility == Visibility::Public
            && self.state == RoomState::Waiting
            && !self.countdown_active()
            && !self.is_full()
            && !self.solo;
        if !joinable {
            return None;
        }
        Some(RoomListing {
            room_code: self.code.clone(),
            host_name: self.host().map(|h| h.name.clone()).unwrap_or_default(),
            player_count: self.player_count(),
            capacity: MAX_PLAYERS_PER_ROOM,
            game_mode: self.game_mode,
            word_mode: self.word_mode,
            daily_number: self.daily_number,
        })
    }

    /// Final scoreboard: sorted by `(won desc, guesses asc, time asc)`,
    /// positions assigned from 1. `departed` carries the partial progress
    /// of a player removed on the forfeit path, who must still appear in
    /// the results.
    pub fn build_results(&self, departed: Option<&Player>) -> Vec<PlayerResult> {
        let row = |p: &Player| PlayerResult {
            player_id: p.id,
            name: p.name.clone(),
            guesses_used: p.board.guesses.len(),
            won: p.board.won,
            time_ms: p.board.finish_time_ms.unwrap_or_else(|| self.elapsed_ms()),
            score: p.board.score,
            position: 0,
            target_word: self.target_for(p.id).unwrap_or_default().to_string(),
        };
        let mut results: Vec<PlayerResult> =
            self.players.values().map(row).chain(departed.map(row)).collect();
        results.sort_by(|a, b| {
            b.won
                .cmp(&a.won)
                .then(a.guesses_used.cmp(&b.guesses_used))
                .then(a.time_ms.cmp(&b.time_ms))
        });
        for (i, r) in results.iter_mut().enumerate() {
            r.position = i + 1;
        }
        results
    }

    /// Color-only progress for everyone except `viewer`, for rejoin.
    pub fn opponent_progress(&self, viewer: PlayerId) -> Vec<crate::protocol::OpponentProgress> {
        self.players
            .values()
            .filter(|p| p.id != viewer)
            .map(|p| crate::protocol::OpponentProgress {
                player_id: p.id,
                name: p.name.clone(),
                results: p.board.results.clone(),
                finished: p.board.finished,
                won: p.board.won,
            })
            .collect()
    }

    /// Play-again: back to `waiting` with every board and ready flag reset
    /// and all game-scoped state cleared.
    pub fn reset_for_next_game(&mut self) {
        self.cancel_game_timers();
        self.state = RoomState::Waiting;
        self.target_word = None;
        self.started_at = None;
        self.started_at_wall = None;
        self.selection = None;
        self.game_id = None;
        self.last_results = None;
        for player in self.players.values_mut() {
            player.board.reset();
            player.ready = player.is_host;
        }
    }

    /// Selection phase is complete when every player in the room has a
    /// word assigned to them.
    pub fn selection_complete(&self) -> bool {
        self.selection.as_ref().is_some_and(|sel| {
            self.players
                .keys()
                .all(|id| sel.assignments.contains_key(id))
        })
    }

    pub fn selection_submitted_count(&self) -> usize {
        self.selection
            .as_ref()
            .map(|sel| {
                self.players
                    .keys()
                    .filter(|id| sel.assignments.contains_key(*id))
                    .count()
            })
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_room() -> Room {
        let host = Player::new(PlayerId(1), "Host".into(), None, true);
        Room::new("ABCDEF".to_string(), host)
    }

    fn add_guest(room: &mut Room, id: u64, name: &str) {
        room.players.insert(
            PlayerId(id),
            Player::new(PlayerId(id), name.into(), None, false),
        );
    }

    #[test]
    fn host_is_ready_at_creation() {
        let room = test_room();
        assert!(room.all_ready());
        assert!(!room.can_start(), "two-player minimum applies");
    }

    #[test]
    fn start_gate_requires_everyone_ready() {
        let mut room = test_room();
        add_guest(&mut room, 2, "Guest");
        assert!(!room.can_start());
        room.players.get_mut(&PlayerId(2)).unwrap().ready = true;
        assert!(room.can_start());
    }

    #[test]
    fn solo_rooms_skip_the_minimum() {
        let mut room = test_room();
        room.solo = true;
        assert!(room.can_start());
    }

    #[test]
    fn listing_only_for_public_waiting_rooms() {
        let mut room = test_room();
        assert!(room.listing().is_none(), "private by default");
        room.visibility = Visibility::Public;
        assert!(room.listing().is_some());
        room.state = RoomState::Playing;
        assert!(room.listing().is_none());
        room.state = RoomState::Waiting;
        room.solo = true;
        assert!(room.listing().is_none());
    }

    #[test]
    fn results_sort_and_positions() {
        let mut room = test_room();
        add_guest(&mut room, 2, "Fast");
        add_guest(&mut room, 3, "Slow");
        room.target_word = Some("CRANE".to_string());
        // Host lost; Fast won in 3 at 20s; Slow won in 3 at 30s.
        room.players.get_mut(&PlayerId(1)).unwrap().board.finished = true;
        {
            let b = &mut room.players.get_mut(&PlayerId(2)).unwrap().board;
            b.finished = true;
            b.won = true;
            b.guesses = vec!["A".into(), "B".into(), "CRANE".into()];
            b.finish_time_ms = Some(20_000);
        }
        {
            let b = &mut room.players.get_mut(&PlayerId(3)).unwrap().board;
            b.finished = true;
            b.won = true;
            b.guesses = vec!["A".into(), "B".into(), "CRANE".into()];
            b.finish_time_ms = Some(30_000);
        }
        let results = room.build_results(None);
        assert_eq!(results[0].player_id, PlayerId(2));
        assert_eq!(results[0].position, 1);
        assert_eq!(results[1].player_id, PlayerId(3));
        assert_eq!(results[2].player_id, PlayerId(1));
        assert_eq!(results[2].position, 3);
    }

    #[test]
    fn reset_clears_boards_and_ready_flags() {
        let mut room = test_room();
        add_guest(&mut room, 2, "Guest");
        room.state = RoomState::Finished;
        room.target_word = Some("CRANE".to_string());
        {
            let guest = room.players.get_mut(&PlayerId(2)).unwrap();
            guest.ready = true;
            guest.board.guesses.push("TRACE".to_string());
            guest.board.finished = true;
        }
        room.reset_for_next_game();
        assert_eq!(room.state, RoomState::Waiting);
        assert!(room.target_word.is_none());
        let guest = &room.players[&PlayerId(2)];
        assert!(!guest.ready);
        assert!(guest.board.guesses.is_empty());
        assert!(!guest.board.finished);
        assert!(room.players[&PlayerId(1)].ready, "host stays ready");
    }
}
