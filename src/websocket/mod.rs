//! WebSocket transport: axum routes, the upgrade handler, and the
//! per-connection socket loops.

mod connection;
mod handler;
mod routes;
mod sending;

pub use routes::create_router;
