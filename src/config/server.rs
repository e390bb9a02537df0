//! Gameplay timing and connection tunables.

use super::defaults::{
    default_countdown_secs, default_forced_word_log_path, default_max_message_size,
    default_outbound_queue_size, default_reconnect_grace_secs, default_room_code_max_retries,
    default_selection_phase_secs, default_solo_start_delay_ms, default_tick_interval_ms,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Length of the pre-game countdown (seconds); one tick per second.
    #[serde(default = "default_countdown_secs")]
    pub countdown_secs: u64,
    /// Sabotage word-selection deadline (seconds).
    #[serde(default = "default_selection_phase_secs")]
    pub selection_phase_secs: u64,
    /// How long a disconnected player keeps their seat (seconds).
    #[serde(default = "default_reconnect_grace_secs")]
    pub reconnect_grace_secs: u64,
    /// Interval between `timerSync` broadcasts while playing (milliseconds).
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Delay before a solo daily-challenge room starts its countdown, so
    /// the client can bind to the room-created response first (milliseconds).
    #[serde(default = "default_solo_start_delay_ms")]
    pub solo_start_delay_ms: u64,
    /// Per-connection outbound queue capacity; overflow closes the
    /// connection.
    #[serde(default = "default_outbound_queue_size")]
    pub outbound_queue_size: usize,
    /// Largest accepted inbound frame (bytes).
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Bound on room-code collision retries.
    #[serde(default = "default_room_code_max_retries")]
    pub room_code_max_retries: usize,
    /// Where user-forced guesses are appended for dictionary review.
    #[serde(default = "default_forced_word_log_path")]
    pub forced_word_log_path: String,
    /// Allows client-supplied test-word seeds to override target-word
    /// selection. Must stay off in production.
    #[serde(default)]
    pub test_mode: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            countdown_secs: default_countdown_secs(),
            selection_phase_secs: default_selection_phase_secs(),
            reconnect_grace_secs: default_reconnect_grace_secs(),
            tick_interval_ms: default_tick_interval_ms(),
            solo_start_delay_ms: default_solo_start_delay_ms(),
            outbound_queue_size: default_outbound_queue_size(),
            max_message_size: default_max_message_size(),
            room_code_max_retries: default_room_code_max_retries(),
            forced_word_log_path: default_forced_word_log_path(),
            test_mode: false,
        }
    }
}
