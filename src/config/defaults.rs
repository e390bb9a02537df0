//! Default value functions referenced from serde attributes.

pub fn default_port() -> u16 {
    4640
}

pub fn default_cors_origins() -> String {
    "*".to_string()
}

pub fn default_countdown_secs() -> u64 {
    3
}

pub fn default_selection_phase_secs() -> u64 {
    30
}

pub fn default_reconnect_grace_secs() -> u64 {
    120
}

pub fn default_tick_interval_ms() -> u64 {
    1_000
}

pub fn default_solo_start_delay_ms() -> u64 {
    150
}

pub fn default_outbound_queue_size() -> usize {
    64
}

pub fn default_max_message_size() -> usize {
    8_192
}

pub fn default_room_code_max_retries() -> usize {
    16
}

pub fn default_forced_word_log_path() -> String {
    "logs/forced-words.ndjson".to_string()
}

pub fn default_log_dir() -> String {
    "logs".to_string()
}

pub fn default_log_filename() -> String {
    "server.log".to_string()
}

pub fn default_rotation() -> String {
    "daily".to_string()
}

pub fn default_enable_file_logging() -> bool {
    false
}

pub fn default_log_format() -> super::logging::LogFormat {
    super::logging::LogFormat::Text
}
