//! Startup validation of loaded configuration.

use super::Config;

/// Reject configurations the server cannot run with. Returns a readable
/// multi-line error listing every problem found.
pub fn validate(config: &Config) -> Result<(), String> {
    let mut problems: Vec<String> = Vec::new();

    if config.server.outbound_queue_size == 0 {
        problems.push("server.outbound_queue_size must be at least 1".to_string());
    }
    if config.server.max_message_size < 64 {
        problems.push("server.max_message_size must be at least 64 bytes".to_string());
    }
    if config.server.tick_interval_ms == 0 {
        problems.push("server.tick_interval_ms must be at least 1".to_string());
    }
    if config.server.room_code_max_retries == 0 {
        problems.push("server.room_code_max_retries must be at least 1".to_string());
    }
    if config.server.reconnect_grace_secs == 0 {
        problems.push("server.reconnect_grace_secs must be at least 1".to_string());
    }
    if config.server.selection_phase_secs == 0 {
        problems.push("server.selection_phase_secs must be at least 1".to_string());
    }
    if config.server.forced_word_log_path.trim().is_empty() {
        problems.push("server.forced_word_log_path must not be empty".to_string());
    }

    if config.server.test_mode {
        // Not an error, but loud: test mode lets clients choose targets.
        eprintln!("WARNING: test_mode is enabled; client test-word seeds will be honored");
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems.join("\n"))
    }
}
