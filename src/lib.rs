//! chesswatch library: re-exports modules for the binary and integration tests.

pub mod channel;
pub mod commands;
pub mod config;
pub mod daemon;
pub mod health;
pub mod monitor;
pub mod notifier;
pub mod presence;
pub mod snapshot;
pub mod state;
