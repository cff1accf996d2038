//! Client error definitions.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Server rejected the credentials")]
    Unauthorized,

    #[error("Failed to connect: {0}")]
    Connect(String),

    #[error("Invalid room id: {0}")]
    InvalidRoom(String),

    #[error("Failed to encode frame: {0}")]
    Encode(String),

    #[error("Client is closed")]
    Closed,
}
