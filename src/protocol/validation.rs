use super::room_codes;

/// Longest accepted display name.
pub const MAX_PLAYER_NAME_LENGTH: usize = 32;

pub fn validate_player_name(name: &str) -> Result<(), String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Player name cannot be empty".to_string());
    }
    if trimmed.len() != name.len() {
        return Err("Player name cannot have leading or trailing whitespace".to_string());
    }
    if name.chars().count() > MAX_PLAYER_NAME_LENGTH {
        return Err(format!(
            "Player name too long (max {MAX_PLAYER_NAME_LENGTH} characters)"
        ));
    }
    for ch in name.chars() {
        if ch == ' ' || ch.is_alphanumeric() || ch == '-' || ch == '_' {
            continue;
        }
        return Err("Player name contains invalid characters".to_string());
    }
    Ok(())
}

/// Normalize and shape-check a room code typed by a user.
pub fn normalize_room_code(code: &str) -> Result<String, String> {
    let normalized = code.trim().to_ascii_uppercase();
    if room_codes::is_well_formed(&normalized) {
        Ok(normalized)
    } else {
        Err(format!(
            "Room code must be {} characters from the code alphabet",
            room_codes::CODE_LENGTH
        ))
    }
}

/// Uppercase-normalize a submitted word and check the five-ASCII-letters
/// shape. Dictionary membership is checked separately by the caller.
pub fn normalize_word(word: &str) -> Result<String, String> {
    let normalized = word.trim().to_ascii_uppercase();
    if normalized.len() != super::types::WORD_LENGTH {
        return Err(format!(
            "Word must be exactly {} letters",
            super::types::WORD_LENGTH
        ));
    }
    if !normalized.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err("Word must contain only letters".to_string());
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_names() {
        assert!(validate_player_name("Ada Lovelace").is_ok());
        assert!(validate_player_name("x_1-2").is_ok());
        assert!(validate_player_name("").is_err());
        assert!(validate_player_name("  padded  ").is_err());
        assert!(validate_player_name("bad!name").is_err());
        assert!(validate_player_name(&"a".repeat(33)).is_err());
    }

    #[test]
    fn room_code_normalization() {
        assert_eq!(normalize_room_code(" abcdef ").unwrap(), "ABCDEF");
        assert!(normalize_room_code("ABC").is_err());
        assert!(normalize_room_code("ABCDE1").is_err());
    }

    #[test]
    fn word_normalization() {
        assert_eq!(normalize_word("crane").unwrap(), "CRANE");
        assert_eq!(normalize_word(" TRACE ").unwrap(), "TRACE");
        assert!(normalize_word("four").is_err());
        assert!(normalize_word("sixers").is_err());
        assert!(normalize_word("cr4ne").is_err());
        // Multibyte input must not slip past the length check.
        assert!(normalize_word("crâne").is_err());
    }
}
