//! Shared utilities for the TaskMe realtime server and client.

pub mod logger;
pub mod time;
