//! UseCase layer error definitions.

use thiserror::Error;

use crate::domain::{AuthError, RepositoryError, RoomError, ValueObjectError};

/// Errors raised while accepting a connection
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectError {
    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] AuthError),

    #[error("Failed to register connection: {0}")]
    Registration(String),

    #[error("Failed to encode frame: {0}")]
    Encode(String),
}

/// Errors raised by a join request
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JoinRoomError {
    #[error("Not allowed to join room '{0}'")]
    Forbidden(String),

    #[error("Room capacity exceeded: maximum {capacity} members allowed (current: {current})")]
    CapacityExceeded { capacity: usize, current: usize },

    #[error("Connection not found: {0}")]
    ConnectionNotFound(String),

    #[error("Failed to encode frame: {0}")]
    Encode(String),
}

impl From<RepositoryError> for JoinRoomError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Room(RoomError::CapacityExceeded { capacity, current }) => {
                Self::CapacityExceeded { capacity, current }
            }
            RepositoryError::ConnectionNotFound(id)
            | RepositoryError::DuplicateConnection(id)
            | RepositoryError::ChannelClosed(id) => Self::ConnectionNotFound(id),
        }
    }
}

/// Errors raised by a leave request
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LeaveRoomError {
    #[error("Not allowed to leave room '{0}'")]
    Forbidden(String),

    #[error("Connection not found: {0}")]
    ConnectionNotFound(String),

    #[error("Failed to encode frame: {0}")]
    Encode(String),
}

/// Errors raised while relaying an event into a room
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("Events cannot be sent to room '{0}'")]
    Forbidden(String),

    #[error("Connection is not a member of room '{0}'")]
    NotAMember(String),

    #[error("Payload cannot exceed {max} bytes (got {actual})")]
    PayloadTooLarge { max: usize, actual: usize },

    #[error("Connection not found: {0}")]
    ConnectionNotFound(String),

    #[error("Failed to encode frame: {0}")]
    Encode(String),
}

impl From<ValueObjectError> for RelayError {
    fn from(error: ValueObjectError) -> Self {
        match error {
            ValueObjectError::EventPayloadTooLarge { max, actual } => {
                Self::PayloadTooLarge { max, actual }
            }
            other => Self::Encode(other.to_string()),
        }
    }
}

/// Errors raised while tearing a connection down
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DisconnectError {
    #[error("Connection not found: {0}")]
    ConnectionNotFound(String),
}
