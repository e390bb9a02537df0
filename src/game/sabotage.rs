use chrono::{DateTime, Utc};
use rand::RngExt;
use std::collections::HashMap;

use crate::protocol::PlayerId;

/// One picker's chosen word for their target, keyed by the target in the
/// room's selection state.
#[derive(Debug, Clone)]
pub struct WordAssignment {
    pub picker: PlayerId,
    pub picker_name: String,
    pub word: String,
    pub submitted_at: DateTime<Utc>,
    /// Set when the word came from the deadline auto-assign path rather
    /// than the picker.
    pub forced: bool,
}

/// Assign every picker a target such that nobody picks for themselves.
///
/// For two players the unique derangement is the swap. For three or four,
/// uniform permutations are rejection-sampled until fixed-point-free, which
/// is uniform over derangements; the acceptance rate is ~1/e, so the retry
/// bound is never reached in practice. The rotation fallback keeps the
/// function total.
///
/// Callers gate sabotage starts on the two-player minimum; fewer than two
/// players yields an empty assignment (and trips a debug assertion).
pub fn assign_targets(players: &[PlayerId]) -> HashMap<PlayerId, PlayerId> {
    debug_assert!(players.len() >= 2);
    if players.len() < 2 {
        return HashMap::new();
    }
    let mut rng = rand::rng();

    if players.len() == 2 {
        return HashMap::from([(players[0], players[1]), (players[1], players[0])]);
    }

    let mut targets: Vec<PlayerId> = players.to_vec();
    for _ in 0..64 {
        // Fisher-Yates.
        for i in (1..targets.len()).rev() {
            let j = rng.random_range(0..=i);
            targets.swap(i, j);
        }
        if players.iter().zip(&targets).all(|(p, t)| p != t) {
            return players.iter().copied().zip(targets).collect();
        }
    }

    // Rotation by one is always a derangement.
    players
        .iter()
        .enumerate()
        .map(|(i, p)| (*p, players[(i + 1) % players.len()]))
        .collect()
}
