use thiserror::Error;

use crate::protocol::{LetterMark, MAX_GUESSES, WORD_LENGTH};

/// Color one guess against a target with the classic two-pass algorithm.
///
/// First pass fixes exact matches and consumes those target positions.
/// Second pass hands out `present` from the remaining unconsumed target
/// letters, left to right, so a guessed letter repeated more often than it
/// occurs in the target colors `absent` for the surplus.
///
/// Both inputs must already be normalized to exactly [`WORD_LENGTH`] ASCII
/// uppercase letters.
pub fn color_guess(guess: &str, target: &str) -> [LetterMark; WORD_LENGTH] {
    debug_assert_eq!(guess.len(), WORD_LENGTH);
    debug_assert_eq!(target.len(), WORD_LENGTH);

    let guess = guess.as_bytes();
    let target = target.as_bytes();

    let mut marks = [LetterMark::Absent; WORD_LENGTH];
    let mut consumed = [false; WORD_LENGTH];

    for i in 0..WORD_LENGTH {
        if guess[i] == target[i] {
            marks[i] = LetterMark::Correct;
            consumed[i] = true;
        }
    }

    for i in 0..WORD_LENGTH {
        if marks[i] == LetterMark::Correct {
            continue;
        }
        if let Some(j) = (0..WORD_LENGTH).find(|&j| !consumed[j] && target[j] == guess[i]) {
            marks[i] = LetterMark::Present;
            consumed[j] = true;
        }
    }

    marks
}

/// True when every position colored `correct`.
pub fn is_winning(marks: &[LetterMark; WORD_LENGTH]) -> bool {
    marks.iter().all(|m| *m == LetterMark::Correct)
}

/// A hard-mode rule violation, with the reason phrased for direct display.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HardModeViolation {
    /// A previously green position was not replayed.
    #[error("{} letter must be {letter}", ordinal(*.position + 1))]
    GreenNotReused { position: usize, letter: char },
    /// A previously yellow letter is missing from the guess.
    #[error("guess must contain {letter}")]
    YellowMissing { letter: char },
}

/// Enforce the hard-mode rule against the player's own prior results.
///
/// No extra per-player state is kept; the constraint is derived fresh from
/// `(guesses, results)` each call:
/// 1. every position ever marked `correct` must hold the same letter, and
/// 2. every distinct letter ever marked `present` must appear somewhere.
pub fn check_hard_mode(
    guesses: &[String],
    results: &[[LetterMark; WORD_LENGTH]],
    candidate: &str,
) -> Result<(), HardModeViolation> {
    debug_assert_eq!(guesses.len(), results.len());
    let candidate = candidate.as_bytes();

    let mut required_at: [Option<u8>; WORD_LENGTH] = [None; WORD_LENGTH];
    let mut required_letters: Vec<u8> = Vec::new();

    for (guess, marks) in guesses.iter().zip(results) {
        let bytes = guess.as_bytes();
        for i in 0..WORD_LENGTH {
            match marks[i] {
                LetterMark::Correct => required_at[i] = Some(bytes[i]),
                LetterMark::Present => {
                    if !required_letters.contains(&bytes[i]) {
                        required_letters.push(bytes[i]);
                    }
                }
                LetterMark::Absent => {}
            }
        }
    }

    for (i, required) in required_at.iter().enumerate() {
        if let Some(letter) = required {
            if candidate[i] != *letter {
                return Err(HardModeViolation::GreenNotReused {
                    position: i,
                    letter: *letter as char,
                });
            }
        }
    }

    for letter in required_letters {
        if !candidate.contains(&letter) {
            return Err(HardModeViolation::YellowMissing {
                letter: letter as char,
            });
        }
    }

    Ok(())
}

/// Competitive-mode score for a winning game. Fewer guesses dominate; a
/// solve under a minute earns up to 60 bonus points. Losses score zero.
pub fn competitive_score(guesses_used: usize, solve_time_ms: u64, won: bool) -> u32 {
    if !won {
        return 0;
    }
    debug_assert!((1..=MAX_GUESSES).contains(&guesses_used));
    let guess_points = (MAX_GUESSES + 1 - guesses_used) as u32 * 100;
    let speed_bonus = (60_000u64.saturating_sub(solve_time_ms) / 1_000) as u32;
    guess_points + speed_bonus
}

fn ordinal(n: usize) -> String {
    let suffix = match n {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use LetterMark::{Absent, Correct, Present};

    #[test]
    fn exact_match_is_all_correct() {
        assert_eq!(color_guess("CRANE", "CRANE"), [Correct; WORD_LENGTH]);
    }

    #[test]
    fn disjoint_letters_are_all_absent() {
        assert_eq!(color_guess("GUMBO", "CRANE"), [Absent; WORD_LENGTH]);
    }

    #[test]
    fn trace_against_crane() {
        // R, A, E line up; C is present elsewhere; T is absent.
        assert_eq!(
            color_guess("TRACE", "CRANE"),
            [Absent, Correct, Correct, Present, Correct]
        );
    }

    #[test]
    fn surplus_repeated_letters_color_absent() {
        // Target has one E and it lines up at the end; the two leading Es
        // get nothing.
        assert_eq!(
            color_guess("EERIE", "CRANE"),
            [Absent, Absent, Present, Absent, Correct]
        );
        // Green consumes before yellow: the L in position 3 locks, the
        // leading L still finds the second L of LLAMA.
        assert_eq!(
            color_guess("LABEL", "LLAMA"),
            [Correct, Present, Absent, Absent, Present]
        );
    }

    #[test]
    fn hard_mode_locks_greens() {
        let guesses = vec!["TRACE".to_string()];
        let results = vec![color_guess("TRACE", "CRANE")];
        let err = check_hard_mode(&guesses, &results, "ARISE").unwrap_err();
        assert_eq!(
            err,
            HardModeViolation::GreenNotReused {
                position: 1,
                letter: 'R'
            }
        );
        assert_eq!(err.to_string(), "2nd letter must be R");
    }

    #[test]
    fn hard_mode_requires_yellows() {
        let guesses = vec!["TRACE".to_string()];
        let results = vec![color_guess("TRACE", "CRANE")];
        // BRAKE keeps every green but drops the yellow C.
        let err = check_hard_mode(&guesses, &results, "BRAKE").unwrap_err();
        assert_eq!(err, HardModeViolation::YellowMissing { letter: 'C' });
        assert_eq!(err.to_string(), "guess must contain C");
        // CRANE satisfies both constraints.
        assert!(check_hard_mode(&guesses, &results, "CRANE").is_ok());
    }

    #[test]
    fn hard_mode_aggregates_over_all_prior_guesses() {
        let target = "CRANE";
        let guesses = vec!["TRICE".to_string(), "CHANT".to_string()];
        let results = vec![color_guess("TRICE", target), color_guess("CHANT", target)];
        // C went green at position 0 in the second guess; it must stay.
        let err = check_hard_mode(&guesses, &results, "PRUNE").unwrap_err();
        assert!(matches!(err, HardModeViolation::GreenNotReused { position: 0, .. }));
    }

    #[test]
    fn scores() {
        assert_eq!(competitive_score(1, 1_000, true), 659);
        assert_eq!(competitive_score(6, 59_000, true), 101);
        assert_eq!(competitive_score(3, 120_000, true), 400);
        assert_eq!(competitive_score(6, 1_000, false), 0);
    }

    fn word_strategy() -> impl Strategy<Value = String> {
        proptest::collection::vec(proptest::char::range('A', 'Z'), WORD_LENGTH)
            .prop_map(|chars| chars.into_iter().collect())
    }

    proptest! {
        /// For any letter x, correct+present count equals
        /// min(count(x, guess), count(x, target)).
        #[test]
        fn coloring_conserves_letter_counts(
            guess in word_strategy(),
            target in word_strategy(),
        ) {
            let marks = color_guess(&guess, &target);
            for letter in b'A'..=b'Z' {
                let in_guess = guess.bytes().filter(|b| *b == letter).count();
                let in_target = target.bytes().filter(|b| *b == letter).count();
                let colored = guess
                    .bytes()
                    .zip(marks.iter())
                    .filter(|(b, m)| *b == letter && **m != Absent)
                    .count();
                prop_assert_eq!(colored, in_guess.min(in_target));
            }
        }

        /// An accepted hard-mode guess preserves every green and replays
        /// every yellow letter.
        #[test]
        fn hard_mode_acceptance_is_safe(
            prior in word_strategy(),
            target in word_strategy(),
            candidate in word_strategy(),
        ) {
            let results = vec![color_guess(&prior, &target)];
            let guesses = vec![prior.clone()];
            if check_hard_mode(&guesses, &results, &candidate).is_ok() {
                for i in 0..WORD_LENGTH {
                    if results[0][i] == Correct {
                        prop_assert_eq!(candidate.as_bytes()[i], prior.as_bytes()[i]);
                    }
                    if results[0][i] == Present {
                        prop_assert!(candidate.bytes().any(|b| b == prior.as_bytes()[i]));
                    }
                }
            }
        }
    }
}
