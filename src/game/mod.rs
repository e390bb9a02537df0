//! Pure game logic: letter coloring, hard-mode enforcement, scoring,
//! dictionaries and the sabotage derangement. No I/O, no locks; everything
//! here is deterministic given its inputs (or an RNG) and is exercised
//! heavily by unit and property tests.

pub mod sabotage;
pub mod validator;
pub mod words;

pub use sabotage::WordAssignment;
pub use validator::{
    check_hard_mode, color_guess, competitive_score, is_winning, HardModeViolation,
};
pub use words::Dictionary;
