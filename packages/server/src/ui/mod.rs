//! WebSocket relay server: HTTP/WebSocket handlers, state and runner.

mod handler;
mod runner;
mod signal;
pub mod state;

pub use runner::{ServerError, create_router, run, serve};
