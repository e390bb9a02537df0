use serde::{Deserialize, Serialize};

/// Machine-readable codes carried on `error`-typed messages so clients can
/// branch without string matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    // Validation
    InvalidMessage,
    InvalidInput,
    InvalidWord,
    // Dictionary
    WordNotInDictionary,
    WordNotEligible,
    // Rule
    RoomNotFound,
    RoomFull,
    AlreadyInRoom,
    NotInRoom,
    NotHost,
    GameInProgress,
    InvalidRoomState,
    NotAllReady,
    NotEnoughPlayers,
    AlreadyFinished,
    HardModeViolation,
    // Policy
    DailyAlreadyCompleted,
    DailyOutOfRange,
    AuthRequired,
    // Reconnection
    RejoinFailed,
    GraceExpired,
    // Transport / internal
    MessageTooLarge,
    InternalError,
}

impl ErrorCode {
    /// Stable wire string for this code, as serialized by serde.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidMessage => "invalidMessage",
            ErrorCode::InvalidInput => "invalidInput",
            ErrorCode::InvalidWord => "invalidWord",
            ErrorCode::WordNotInDictionary => "wordNotInDictionary",
            ErrorCode::WordNotEligible => "wordNotEligible",
            ErrorCode::RoomNotFound => "roomNotFound",
            ErrorCode::RoomFull => "roomFull",
            ErrorCode::AlreadyInRoom => "alreadyInRoom",
            ErrorCode::NotInRoom => "notInRoom",
            ErrorCode::NotHost => "notHost",
            ErrorCode::GameInProgress => "gameInProgress",
            ErrorCode::InvalidRoomState => "invalidRoomState",
            ErrorCode::NotAllReady => "notAllReady",
            ErrorCode::NotEnoughPlayers => "notEnoughPlayers",
            ErrorCode::AlreadyFinished => "alreadyFinished",
            ErrorCode::HardModeViolation => "hardModeViolation",
            ErrorCode::DailyAlreadyCompleted => "dailyAlreadyCompleted",
            ErrorCode::DailyOutOfRange => "dailyOutOfRange",
            ErrorCode::AuthRequired => "authRequired",
            ErrorCode::RejoinFailed => "rejoinFailed",
            ErrorCode::GraceExpired => "graceExpired",
            ErrorCode::MessageTooLarge => "messageTooLarge",
            ErrorCode::InternalError => "internalError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_strings_match_serde_output() {
        for code in [
            ErrorCode::InvalidMessage,
            ErrorCode::WordNotInDictionary,
            ErrorCode::HardModeViolation,
            ErrorCode::DailyAlreadyCompleted,
            ErrorCode::GraceExpired,
        ] {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
    }
}
