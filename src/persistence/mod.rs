//! Persistence: a best-effort write-through sink for finished games and
//! daily-challenge completions, plus the append-only forced-word log.
//!
//! The store never blocks game progression. Result writes are spawned and
//! failures are logged and discarded; a game is never replayed. The one
//! read path, the daily-challenge precheck, fails closed so a storage
//! error can never hand out a second daily attempt.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::protocol::{GameMode, PlayerResult};

/// One finished game, as handed to the store on entry to `finished`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRecord {
    pub game_id: u64,
    pub room_code: String,
    /// Shared target for daily/random; per-player targets live in the
    /// result rows for sabotage.
    pub target_word: Option<String>,
    pub game_mode: GameMode,
    pub hard_mode: bool,
    pub started_at: DateTime<Utc>,
    pub results: Vec<PlayerResult>,
}

/// One authenticated player's daily-challenge outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyCompletion {
    pub email: String,
    pub daily_number: u32,
    pub guesses: Vec<String>,
    pub guess_count: usize,
    pub won: bool,
    pub solve_time_ms: u64,
}

/// Storage abstraction for finished-game records. The core defines the
/// interface; the technology behind it is a deployment concern.
#[async_trait]
pub trait GameStore: Send + Sync {
    /// Issue an identifier for a game that is about to start.
    fn allocate_game_id(&self) -> u64;

    /// Write a finished game. Called asynchronously; failures are the
    /// caller's to log and discard.
    async fn record_game(&self, record: GameRecord) -> Result<()>;

    /// Record a daily-challenge completion for one authenticated player.
    async fn record_daily_completion(&self, completion: DailyCompletion) -> Result<()>;

    /// Precheck for the one-attempt-per-daily rule. Callers must treat an
    /// `Err` as "completed" (fail closed).
    async fn has_completed_daily(&self, email: &str, daily_number: u32) -> Result<bool>;
}

/// In-memory store: the process-local default, also used throughout the
/// test suites.
#[derive(Default)]
pub struct InMemoryGameStore {
    next_game_id: AtomicU64,
    games: Mutex<Vec<GameRecord>>,
    daily_completions: Mutex<HashMap<(String, u32), DailyCompletion>>,
}

impl InMemoryGameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far (test observability).
    pub async fn recorded_games(&self) -> Vec<GameRecord> {
        self.games.lock().await.clone()
    }
}

#[async_trait]
impl GameStore for InMemoryGameStore {
    fn allocate_game_id(&self) -> u64 {
        self.next_game_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    async fn record_game(&self, record: GameRecord) -> Result<()> {
        self.games.lock().await.push(record);
        Ok(())
    }

    async fn record_daily_completion(&self, completion: DailyCompletion) -> Result<()> {
        self.daily_completions
            .lock()
            .await
            .insert((completion.email.clone(), completion.daily_number), completion);
        Ok(())
    }

    async fn has_completed_daily(&self, email: &str, daily_number: u32) -> Result<bool> {
        Ok(self
            .daily_completions
            .lock()
            .await
            .contains_key(&(email.to_string(), daily_number)))
    }
}

/// One line of the forced-word log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForcedWordEntry {
    pub timestamp: DateTime<Utc>,
    pub word: String,
    pub player_name: String,
    pub player_email: Option<String>,
    pub room_code: String,
}

/// Append-only newline-delimited JSON log of user-forced guesses, kept for
/// dictionary review. Appends are serialized through one writer; nothing in
/// the core reads the file back.
pub struct ForcedWordLog {
    path: PathBuf,
    writer: Mutex<Option<tokio::fs::File>>,
}

impl ForcedWordLog {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            writer: Mutex::new(None),
        }
    }

    pub async fn append(
        &self,
        word: &str,
        player_name: &str,
        player_email: Option<&str>,
        room_code: &str,
    ) {
        let entry = ForcedWordEntry {
            timestamp: Utc::now(),
            word: word.to_string(),
            player_name: player_name.to_string(),
            player_email: player_email.map(str::to_string),
            room_code: room_code.to_string(),
        };
        if let Err(err) = self.append_entry(&entry).await {
            tracing::warn!(word, room_code, error = %err, "Failed to append forced-word entry");
        }
    }

    async fn append_entry(&self, entry: &ForcedWordEntry) -> Result<()> {
        let mut guard = self.writer.lock().await;
        if guard.is_none() {
            if let Some(parent) = self.path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
            let file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await?;
            *guard = Some(file);
        }
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');
        if let Some(file) = guard.as_mut() {
            file.write_all(&line).await?;
            file.flush().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn daily_completion_round_trip() {
        let store = InMemoryGameStore::new();
        assert!(!store.has_completed_daily("a@b.c", 12).await.unwrap());
        store
            .record_daily_completion(DailyCompletion {
                email: "a@b.c".to_string(),
                daily_number: 12,
                guesses: vec!["CRANE".to_string()],
                guess_count: 1,
                won: true,
                solve_time_ms: 9_000,
            })
            .await
            .unwrap();
        assert!(store.has_completed_daily("a@b.c", 12).await.unwrap());
        assert!(!store.has_completed_daily("a@b.c", 13).await.unwrap());
        assert!(!store.has_completed_daily("x@y.z", 12).await.unwrap());
    }

    #[tokio::test]
    async fn game_ids_are_unique_and_increasing() {
        let store = InMemoryGameStore::new();
        let a = store.allocate_game_id();
        let b = store.allocate_game_id();
        assert!(b > a);
    }

    #[tokio::test]
    async fn forced_word_log_appends_ndjson() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forced.ndjson");
        let log = ForcedWordLog::new(path.clone());
        log.append("QWXYZ", "Ada", Some("a@b.c"), "ABCDEF").await;
        log.append("ZZZZZ", "Bob", None, "ABCDEF").await;

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: ForcedWordEntry = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.word, "QWXYZ");
        assert_eq!(first.player_email.as_deref(), Some("a@b.c"));
        let second: ForcedWordEntry = serde_json::from_str(lines[1]).unwrap();
        assert!(second.player_email.is_none());
    }
}
