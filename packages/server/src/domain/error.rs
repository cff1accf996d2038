//! Domain layer error definitions.

use thiserror::Error;

/// Errors related to Value Objects validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueObjectError {
    /// UserId validation error
    #[error("UserId cannot be empty")]
    UserIdEmpty,

    /// UserId too long error
    #[error("UserId cannot exceed {max} characters (got {actual})")]
    UserIdTooLong { max: usize, actual: usize },

    /// UserId contains whitespace
    #[error("UserId cannot contain whitespace (got: {0:?})")]
    UserIdInvalidFormat(String),

    /// TaskId validation error
    #[error("TaskId cannot be empty")]
    TaskIdEmpty,

    /// TaskId too long error
    #[error("TaskId cannot exceed {max} characters (got {actual})")]
    TaskIdTooLong { max: usize, actual: usize },

    /// TaskId contains whitespace
    #[error("TaskId cannot contain whitespace (got: {0:?})")]
    TaskIdInvalidFormat(String),

    /// ConnectionId invalid format error (not a valid UUID format)
    #[error("ConnectionId must be a valid UUID format (got: {0})")]
    ConnectionIdInvalidFormat(String),

    /// RoomId is neither `task-<id>` nor `user-<id>`
    #[error("RoomId must look like 'task-<id>' or 'user-<id>' (got: {0})")]
    RoomIdInvalidFormat(String),

    /// EventPayload too large error
    #[error("EventPayload cannot exceed {max} bytes (got {actual})")]
    EventPayloadTooLarge { max: usize, actual: usize },
}

/// Errors related to Room domain logic
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoomError {
    /// Room capacity exceeded error
    #[error("Room capacity exceeded: maximum {capacity} members allowed (current: {current})")]
    CapacityExceeded { capacity: usize, current: usize },
}

/// Errors raised by the room registry (data access layer)
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Connection not found: {0}")]
    ConnectionNotFound(String),

    #[error("Connection already registered: {0}")]
    DuplicateConnection(String),

    #[error("Outbound channel closed for connection: {0}")]
    ChannelClosed(String),

    #[error(transparent)]
    Room(#[from] RoomError),
}

/// Errors raised while verifying a handshake credential
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing credential")]
    MissingToken,

    #[error("Token expired")]
    ExpiredToken,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Invalid token issuer")]
    InvalidIssuer,

    #[error("Token validation failed: {0}")]
    ValidationFailed(String),

    #[error("Token subject is not a valid user id: {0}")]
    InvalidSubject(#[from] ValueObjectError),
}
