//! Domain layer for the realtime relay.
//!
//! This module contains business logic that is independent of
//! data transfer objects (DTOs) and infrastructure concerns.

pub mod auth;
pub mod entity;
pub mod error;
pub mod factory;
pub mod repository;
pub mod value_object;

pub use auth::TokenVerifier;
pub use entity::{Connection, DEFAULT_ROOM_CAPACITY, Member, Room};
pub use error::{AuthError, RepositoryError, RoomError, ValueObjectError};
pub use factory::ConnectionIdFactory;
pub use repository::{JoinFrames, JoinNotices, OutboundSender, RoomRegistry};
pub use value_object::{
    ConnectionId, EventPayload, MAX_PAYLOAD_BYTES, RelayKind, RoomId, TaskId, Timestamp, UserId,
};

#[cfg(test)]
pub use auth::MockTokenVerifier;
