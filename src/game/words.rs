use std::collections::HashSet;

use chrono::{DateTime, TimeZone, Utc};
use rand::RngExt;

/// Curated answer-eligible list. Order is load-bearing: the daily word is a
/// deterministic index into this file.
const ANSWERS_RAW: &str = include_str!("../../data/answers.txt");

/// Words accepted as guesses but never handed out as targets.
const GUESSES_EXTRA_RAW: &str = include_str!("../../data/guesses_extra.txt");

/// First UTC day of the daily challenge; daily number 1.
const DAILY_EPOCH: (i32, u32, u32) = (2024, 1, 1);

/// Immutable word lists, loaded once at boot and shared without locking.
///
/// The guess dictionary is a strict superset of the answer dictionary:
/// anything the server might pick as a target must also be guessable.
pub struct Dictionary {
    answers: Vec<&'static str>,
    answer_set: HashSet<&'static str>,
    guess_set: HashSet<&'static str>,
}

impl Dictionary {
    pub fn load() -> Self {
        let answers: Vec<&'static str> = ANSWERS_RAW
            .lines()
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .collect();
        let answer_set: HashSet<&'static str> = answers.iter().copied().collect();
        let mut guess_set = answer_set.clone();
        guess_set.extend(
            GUESSES_EXTRA_RAW
                .lines()
                .map(str::trim)
                .filter(|w| !w.is_empty()),
        );
        Self {
            answers,
            answer_set,
            guess_set,
        }
    }

    /// Membership in the broad guess dictionary (pipeline step 3).
    pub fn is_valid_guess(&self, word: &str) -> bool {
        self.guess_set.contains(word)
    }

    /// Membership in the answer-eligible list (sabotage submissions and
    /// target selection).
    pub fn is_answer(&self, word: &str) -> bool {
        self.answer_set.contains(word)
    }

    /// Uniform sample from the answer-eligible list.
    pub fn random_answer(&self) -> String {
        let mut rng = rand::rng();
        let idx = rng.random_range(0..self.answers.len());
        // SAFETY: `idx` is produced by `random_range(0..len)`, so it is
        // always within [0, len).
        #[allow(clippy::indexing_slicing)]
        self.answers[idx].to_string()
    }

    /// Deterministic target for daily number `n`: the same index for every
    /// caller in the same UTC day.
    pub fn daily_answer(&self, daily_number: u32) -> String {
        let idx = (daily_number.max(1) as usize - 1) % self.answers.len();
        #[allow(clippy::indexing_slicing)]
        self.answers[idx].to_string()
    }

    pub fn answer_count(&self) -> usize {
        self.answers.len()
    }
}

/// Daily number for `now`: days since the 2024-01-01 UTC epoch, one-based.
pub fn daily_number_at(now: DateTime<Utc>) -> u32 {
    let (y, m, d) = DAILY_EPOCH;
    let epoch = Utc
        .with_ymd_and_hms(y, m, d, 0, 0, 0)
        .single()
        .unwrap_or_else(Utc::now);
    let days = (now - epoch).num_days();
    (days.max(0) as u32) + 1
}

/// Today's daily number.
pub fn current_daily_number() -> u32 {
    daily_number_at(Utc::now())
}
