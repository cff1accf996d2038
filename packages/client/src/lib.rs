//! TaskMe realtime client.
//!
//! Subscription hooks over a single WebSocket connection: join and leave rooms,
//! send events, and register callbacks per event type. The connection is kept
//! alive by a driver task that reconnects with capped exponential backoff.

pub mod client;
pub mod error;
pub mod subscription;

pub use client::{ClientOptions, RealtimeClient};
pub use error::ClientError;
pub use subscription::{ClientEvent, EventType, Subscription};
