#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_excessive_bools,
    clippy::too_many_arguments,
    clippy::too_many_lines,
    clippy::similar_names
)]

//! # Word Rush Server
//!
//! Authoritative WebSocket server for real-time multiplayer word-guessing
//! games: rooms of up to four players, daily challenges, the sabotage
//! variant, reconnection with grace periods, and a public-room lobby.
//!
//! In-memory by design: rooms live and die with the process.

/// Server configuration and environment variables
pub mod config;

/// Pure game logic: coloring, hard mode, scoring, dictionaries, sabotage
pub mod game;

/// Structured logging configuration
pub mod logging;

/// Best-effort storage for finished games and the forced-word log
pub mod persistence;

/// WebSocket message protocol definitions
pub mod protocol;

/// Room state machine and timers
pub mod room;

/// Main server orchestration
pub mod server;

/// WebSocket connection handling
pub mod websocket;
