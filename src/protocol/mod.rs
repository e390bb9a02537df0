//! Wire protocol: message enums, shared wire-facing types, room codes and
//! input validation.
//!
//! Everything in this module is serialization-shaped. Messages are
//! self-describing JSON objects with a `type` discriminator; the tagged
//! serde enums below make dispatch an exhaustive match, so adding a message
//! type is a compile-time obligation for every handler.

pub mod error_codes;
pub mod messages;
pub mod room_codes;
pub mod types;
pub mod validation;

pub use error_codes::ErrorCode;
pub use messages::{
    ClientMessage, GameEndedPayload, RejoinGamePayload, RoomSnapshot, ServerMessage,
};
pub use types::{
    ConnectionId, GameMode, LetterMark, OpponentProgress, PlayerId, PlayerInfo, PlayerResult,
    RoomListing, RoomStateKind, Visibility, WordMode, MAX_GUESSES, MAX_PLAYERS_PER_ROOM,
    WORD_LENGTH,
};
