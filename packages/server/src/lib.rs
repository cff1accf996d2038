//! TaskMe realtime relay server library.
//!
//! Lets several clients watching the same task share live chat messages,
//! task updates and membership changes, and delivers per-user notifications
//! to a private room.

pub mod common;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

// Re-export entry points
pub use config::ServerConfig;
pub use ui::{ServerError, run};
