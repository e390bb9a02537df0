use rand::RngExt;

/// Room-code alphabet with the easily-confused characters (`O`/`0`,
/// `I`/`1`) removed, so codes survive being read aloud.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Codes are always this long.
pub const CODE_LENGTH: usize = 6;

/// Generate a room code by uniform sampling from [`CODE_ALPHABET`].
///
/// Collision handling (bounded retries against the live room map) is the
/// caller's job; this function is a pure sampler.
pub fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| {
            let idx = rng.random_range(0..CODE_ALPHABET.len());
            // SAFETY: `idx` is produced by `random_range(0..len)`, so it is
            // always within [0, len).
            #[allow(clippy::indexing_slicing)]
            let ch = CODE_ALPHABET[idx] as char;
            ch
        })
        .collect()
}

/// True when `code` has the exact shape of a generated room code.
pub fn is_well_formed(code: &str) -> bool {
    code.len() == CODE_LENGTH && code.bytes().all(|b| CODE_ALPHABET.contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_are_well_formed() {
        for _ in 0..256 {
            let code = generate_room_code();
            assert!(is_well_formed(&code), "bad code: {code}");
        }
    }

    #[test]
    fn alphabet_excludes_confusable_characters() {
        for banned in [b'O', b'0', b'I', b'1'] {
            assert!(!CODE_ALPHABET.contains(&banned));
        }
        assert_eq!(CODE_ALPHABET.len(), 32);
    }

    #[test]
    fn well_formed_rejects_wrong_shapes() {
        assert!(is_well_formed("ABCDEF"));
        assert!(!is_well_formed("ABCDE"));
        assert!(!is_well_formed("ABCDEFG"));
        assert!(!is_well_formed("ABCDE0"));
        assert!(!is_well_formed("abcdef"));
    }
}
