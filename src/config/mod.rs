//! Configuration module.
//!
//! JSON configuration files with environment-variable overrides and
//! sensible compiled-in defaults:
//!
//! - [`types`]: root `Config` struct
//! - [`server`]: gameplay timing and connection tunables
//! - [`logging`]: logging configuration
//! - [`defaults`]: default value functions
//! - [`loader`]: configuration loading
//! - [`validation`]: startup validation

pub mod defaults;
pub mod loader;
pub mod logging;
pub mod server;
pub mod types;
pub mod validation;

pub use loader::load;
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use server::ServerConfig;
pub use types::Config;
pub use validation::validate;
