use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Guesses and targets are always exactly this many letters.
pub const WORD_LENGTH: usize = 5;
/// A player's game ends after this many guesses.
pub const MAX_GUESSES: usize = 6;
/// Hard cap on room occupancy.
pub const MAX_PLAYERS_PER_ROOM: usize = 4;

/// Stable opaque player identifier, issued monotonically by the room
/// manager. Travels on the wire as a plain integer so clients can persist
/// it in their session record for `rejoin`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Identifier for a transport connection. Distinct from [`PlayerId`]:
/// connections come and go (refresh, network blip) while the player
/// identity persists through the reconnection grace period.
pub type ConnectionId = Uuid;

/// How finished games are scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    #[default]
    Casual,
    Competitive,
}

/// How the target word is chosen at game start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordMode {
    Daily,
    #[default]
    Random,
    /// Each player's target is picked by another player (a derangement).
    Sabotage,
}

/// Whether the room is surfaced in the public lobby listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

/// Room lifecycle state as seen on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStateKind {
    Waiting,
    Selecting,
    Playing,
    Finished,
}

/// Per-position verdict for one guessed letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LetterMark {
    /// Right letter, right position.
    Correct,
    /// Letter occurs in the target at some unconsumed position.
    Present,
    /// Letter does not occur (or all its occurrences are consumed).
    Absent,
}

/// Public view of a player inside a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub name: String,
    pub is_host: bool,
    pub ready: bool,
    pub connected: bool,
}

/// Color-only view of one opponent's board. Letters are withheld to
/// preserve opponent-word secrecy in sabotage and suspense elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpponentProgress {
    pub player_id: PlayerId,
    pub name: String,
    pub results: Vec<[LetterMark; WORD_LENGTH]>,
    pub finished: bool,
    pub won: bool,
}

/// One row of the final scoreboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResult {
    pub player_id: PlayerId,
    pub name: String,
    pub guesses_used: usize,
    pub won: bool,
    pub time_ms: u64,
    pub score: u32,
    pub position: usize,
    /// Revealed target. Differs per player in sabotage; identical to the
    /// room-level target otherwise.
    pub target_word: String,
}

/// One joinable public room as shown to lobby subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomListing {
    pub room_code: String,
    pub host_name: String,
    pub player_count: usize,
    pub capacity: usize,
    pub game_mode: GameMode,
    pub word_mode: WordMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_number: Option<u32>,
}
