use serde::{Deserialize, Serialize};

use super::error_codes::ErrorCode;
use super::types::{
    GameMode, LetterMark, OpponentProgress, PlayerId, PlayerInfo, PlayerResult, RoomListing,
    RoomStateKind, Visibility, WordMode, WORD_LENGTH,
};

/// Message types sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    /// Create a fresh room and become its host.
    CreateRoom {
        player_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player_email: Option<String>,
        /// Target-word override; honored only when the process runs in
        /// test mode.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        test_word: Option<String>,
    },
    /// Create a one-attempt daily-challenge room (requires a verified
    /// email; always private).
    CreateDailyChallenge {
        player_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player_email: Option<String>,
        daily_number: u32,
        #[serde(default)]
        solo: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        test_word: Option<String>,
    },
    /// Join an existing room by code.
    JoinRoom {
        room_code: String,
        player_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player_email: Option<String>,
    },
    /// Leave the current room voluntarily.
    LeaveRoom,
    /// Host only: switch casual/competitive scoring.
    SetGameMode { mode: GameMode },
    /// Host only: switch how the target word is chosen.
    SetWordMode { mode: WordMode },
    /// Host only: toggle hard-mode rule enforcement.
    SetHardMode { enabled: bool },
    /// Host only: toggle public lobby listing.
    SetRoomVisibility { visibility: Visibility },
    /// Toggle the caller's ready flag (non-host; the host is always ready).
    SetReady { ready: bool },
    /// Host only: begin the start countdown.
    StartGame,
    /// Submit a guess. `forced` bypasses the dictionary check after
    /// repeated rejections of the same word (logged for curation).
    Guess {
        word: String,
        #[serde(default)]
        forced: bool,
    },
    /// Sabotage selection phase: pick the word an opponent must solve.
    SubmitWord { word: String },
    /// Host only, finished rooms only: reset everyone back to waiting.
    PlayAgain,
    /// Resume a session after a disconnect, from the client's stored
    /// `(roomCode, playerId)` record.
    Rejoin { room_code: String, player_id: PlayerId },
    /// Receive public-room listings until unsubscribed or joined.
    SubscribeLobby,
    UnsubscribeLobby,
}

/// Full description of a room as sent to (re)joining clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub room_code: String,
    pub state: RoomStateKind,
    pub players: Vec<PlayerInfo>,
    pub host_id: PlayerId,
    pub game_mode: GameMode,
    pub word_mode: WordMode,
    pub hard_mode: bool,
    pub visibility: Visibility,
    pub solo: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_number: Option<u32>,
}

/// Payload for `roomJoined`. Boxed in [`ServerMessage`] to keep the enum
/// small.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomJoinedPayload {
    pub player_id: PlayerId,
    pub room: RoomSnapshot,
}

/// Final scoreboard, also reused verbatim for `rejoinResults`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameEndedPayload {
    /// Shared target for daily/random games; absent for sabotage, where
    /// each [`PlayerResult`] reveals its own target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_word: Option<String>,
    pub results: Vec<PlayerResult>,
}

/// Payload for `rejoinSelecting`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejoinSelectingPayload {
    pub room: RoomSnapshot,
    pub target_player_name: String,
    pub time_remaining_ms: u64,
    /// The rejoiner's last valid submission, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_word: Option<String>,
}

/// Payload for `rejoinGame`: the rejoiner's own full board plus color-only
/// opponent progress and the shared clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejoinGamePayload {
    pub room: RoomSnapshot,
    pub guesses: Vec<String>,
    pub results: Vec<[LetterMark; WORD_LENGTH]>,
    pub finished: bool,
    pub won: bool,
    pub game_elapsed_ms: u64,
    pub opponents: Vec<OpponentProgress>,
}

/// Per-player clock entry inside `timerSync`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerElapsed {
    pub player_id: PlayerId,
    /// Frozen at finish time for finished players, otherwise equal to the
    /// game elapsed.
    pub elapsed_ms: u64,
}

/// Message types sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    RoomCreated {
        room_code: String,
        player_id: PlayerId,
    },
    RoomJoined(Box<RoomJoinedPayload>),
    PlayerJoined {
        player: PlayerInfo,
    },
    PlayerLeft {
        player_id: PlayerId,
    },
    /// Host reassignment after the previous host left.
    BecameCreator {
        player_id: PlayerId,
    },
    GameModeChanged {
        mode: GameMode,
    },
    WordModeChanged {
        mode: WordMode,
    },
    HardModeChanged {
        enabled: bool,
    },
    RoomVisibilityChanged {
        visibility: Visibility,
    },
    PlayerReadyChanged {
        player_id: PlayerId,
        ready: bool,
    },
    /// Ready summary pushed to the host whenever the ready-set changes.
    AllPlayersReadyStatus {
        all_ready: bool,
        ready_count: usize,
        player_count: usize,
    },
    Countdown {
        value: u8,
    },
    GameStarted {
        game_mode: GameMode,
        word_mode: WordMode,
        hard_mode: bool,
        word_length: usize,
        max_guesses: usize,
    },
    TimerSync {
        game_elapsed_ms: u64,
        players: Vec<PlayerElapsed>,
    },
    /// Full result of the caller's own guess.
    GuessResult {
        word: String,
        result: [LetterMark; WORD_LENGTH],
        guesses_used: usize,
        finished: bool,
        won: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        score: Option<u32>,
    },
    /// Color-only echo of someone else's guess.
    OpponentGuess {
        player_id: PlayerId,
        result: [LetterMark; WORD_LENGTH],
        guesses_used: usize,
        finished: bool,
        won: bool,
    },
    HardModeViolation {
        reason: String,
    },
    GameEnded(Box<GameEndedPayload>),
    /// Play-again completed; everyone is back in the waiting room.
    ReturnedToLobby(Box<RoomSnapshot>),
    /// Sabotage: tells each picker whose word they are choosing.
    SelectionPhaseStarted {
        target_player_id: PlayerId,
        target_player_name: String,
        time_limit_ms: u64,
    },
    /// Verdict on a sabotage submission; invalid submissions do not
    /// consume the slot.
    WordValidation {
        word: String,
        valid: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    /// Echo of an accepted sabotage submission.
    WordSubmitted {
        word: String,
    },
    SelectionProgress {
        submitted: usize,
        total: usize,
    },
    AllWordsSubmitted,
    /// The selection deadline fired; listed pickers were auto-assigned.
    SelectionTimeout {
        auto_assigned: Vec<PlayerId>,
    },
    PublicRoomsList {
        rooms: Vec<RoomListing>,
    },
    PlayerDisconnected {
        player_id: PlayerId,
    },
    PlayerReconnected {
        player_id: PlayerId,
    },
    /// Sent on the old connection when the same player binds a new one.
    ReplacedByNewConnection,
    RejoinWaiting(Box<RoomSnapshot>),
    RejoinSelecting(Box<RejoinSelectingPayload>),
    RejoinGame(Box<RejoinGamePayload>),
    RejoinResults(Box<GameEndedPayload>),
    RejoinFailed {
        reason: String,
    },
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        error_code: Option<ErrorCode>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_use_camel_case_discriminators() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"createRoom","data":{"playerName":"Ada"}}"#,
        )
        .unwrap();
        assert!(matches!(
            msg,
            ClientMessage::CreateRoom { ref player_name, .. } if player_name == "Ada"
        ));

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"startGame"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::StartGame));

        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"rejoin","data":{"roomCode":"ABCDEF","playerId":7}}"#,
        )
        .unwrap();
        assert!(matches!(
            msg,
            ClientMessage::Rejoin { player_id: PlayerId(7), .. }
        ));
    }

    #[test]
    fn guess_forced_flag_defaults_to_false() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"guess","data":{"word":"crane"}}"#).unwrap();
        match msg {
            ClientMessage::Guess { word, forced } => {
                assert_eq!(word, "crane");
                assert!(!forced);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn server_message_round_trips_with_data_envelope() {
        let msg = ServerMessage::Countdown { value: 3 };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"countdown","data":{"value":3}}"#);

        let msg = ServerMessage::GuessResult {
            word: "CRANE".to_string(),
            result: [LetterMark::Correct; WORD_LENGTH],
            guesses_used: 1,
            finished: true,
            won: true,
            score: Some(659),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"guessResult""#));
        assert!(json.contains(r#""guessesUsed":1"#));
        let back: ServerMessage = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, ServerMessage::GuessResult { .. }));
    }

    #[test]
    fn malformed_field_types_fail_shape_first() {
        // `ready` must be a boolean.
        let err = serde_json::from_str::<ClientMessage>(
            r#"{"type":"setReady","data":{"ready":"yes"}}"#,
        );
        assert!(err.is_err());
        // Unknown discriminators are rejected.
        let err = serde_json::from_str::<ClientMessage>(r#"{"type":"launchMissiles"}"#);
        assert!(err.is_err());
    }
}
