//! Value Objects for domain models.
//!
//! Value Objects are immutable objects that represent values in the domain.
//! They are compared by their value, not by identity.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::error::ValueObjectError;

/// Maximum length of user and task identifiers (bytes)
pub const MAX_ID_LENGTH: usize = 100;

/// Maximum serialized size of an event payload (bytes)
pub const MAX_PAYLOAD_BYTES: usize = 64 * 1024;

const TASK_ROOM_PREFIX: &str = "task-";
const USER_ROOM_PREFIX: &str = "user-";

/// User identifier value object.
///
/// Taken from the `sub` claim of the handshake credential.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Create a new UserId.
    ///
    /// # Arguments
    ///
    /// * `id` - The user identifier string
    ///
    /// # Returns
    ///
    /// A Result containing the UserId or an error if validation fails
    pub fn new(id: String) -> Result<Self, ValueObjectError> {
        if id.is_empty() {
            return Err(ValueObjectError::UserIdEmpty);
        }
        let len = id.len();
        if len > MAX_ID_LENGTH {
            return Err(ValueObjectError::UserIdTooLong {
                max: MAX_ID_LENGTH,
                actual: len,
            });
        }
        if id.chars().any(char::is_whitespace) {
            return Err(ValueObjectError::UserIdInvalidFormat(id));
        }
        Ok(Self(id))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to owned String.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Task identifier value object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(String);

impl TaskId {
    /// Create a new TaskId.
    pub fn new(id: String) -> Result<Self, ValueObjectError> {
        if id.is_empty() {
            return Err(ValueObjectError::TaskIdEmpty);
        }
        let len = id.len();
        if len > MAX_ID_LENGTH {
            return Err(ValueObjectError::TaskIdTooLong {
                max: MAX_ID_LENGTH,
                actual: len,
            });
        }
        if id.chars().any(char::is_whitespace) {
            return Err(ValueObjectError::TaskIdInvalidFormat(id));
        }
        Ok(Self(id))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TaskId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Connection identifier value object.
///
/// One per WebSocket connection, generated by the server (UUID v4).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Create a ConnectionId from a string, validating it as a UUID.
    pub fn new(id: String) -> Result<Self, ValueObjectError> {
        uuid::Uuid::parse_str(&id)
            .map_err(|_| ValueObjectError::ConnectionIdInvalidFormat(id.clone()))?;
        Ok(Self(id))
    }

    /// Create a ConnectionId from a UUID.
    pub fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid.to_string())
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Room identifier value object.
///
/// A room is either a task discussion room (`task-<id>`) or a user's private
/// notification room (`user-<id>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RoomId {
    Task(TaskId),
    User(UserId),
}

impl RoomId {
    /// Task discussion room
    pub fn task(task_id: TaskId) -> Self {
        Self::Task(task_id)
    }

    /// Private notification room of a user
    pub fn user(user_id: UserId) -> Self {
        Self::User(user_id)
    }

    pub fn is_task_room(&self) -> bool {
        matches!(self, Self::Task(_))
    }

    /// Whether this is the notification room owned by `user_id`
    pub fn is_notification_room_of(&self, user_id: &UserId) -> bool {
        matches!(self, Self::User(owner) if owner == user_id)
    }
}

impl FromStr for RoomId {
    type Err = ValueObjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValueObjectError::RoomIdInvalidFormat(s.to_string());
        if let Some(task) = s.strip_prefix(TASK_ROOM_PREFIX) {
            TaskId::new(task.to_string())
                .map(Self::Task)
                .map_err(|_| invalid())
        } else if let Some(user) = s.strip_prefix(USER_ROOM_PREFIX) {
            UserId::new(user.to_string())
                .map(Self::User)
                .map_err(|_| invalid())
        } else {
            Err(invalid())
        }
    }
}

impl TryFrom<String> for RoomId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RoomId> for String {
    fn from(value: RoomId) -> Self {
        value.to_string()
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Task(id) => write!(f, "{}{}", TASK_ROOM_PREFIX, id),
            Self::User(id) => write!(f, "{}{}", USER_ROOM_PREFIX, id),
        }
    }
}

/// Application payload carried by a relayed event.
///
/// Opaque to the relay; only its size is checked.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EventPayload(serde_json::Value);

impl EventPayload {
    /// Create a new EventPayload.
    ///
    /// # Errors
    ///
    /// Returns `ValueObjectError::EventPayloadTooLarge` if the serialized
    /// payload exceeds [`MAX_PAYLOAD_BYTES`].
    pub fn new(value: serde_json::Value) -> Result<Self, ValueObjectError> {
        let actual = value.to_string().len();
        if actual > MAX_PAYLOAD_BYTES {
            return Err(ValueObjectError::EventPayloadTooLarge {
                max: MAX_PAYLOAD_BYTES,
                actual,
            });
        }
        Ok(Self(value))
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_value(self) -> serde_json::Value {
        self.0
    }
}

/// Kinds of events a client (or the REST write path) may relay into a task room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelayKind {
    ChatMessage,
    TaskUpdated,
}

/// Timestamp value object.
///
/// Represents a Unix timestamp in milliseconds (JST).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Create a new Timestamp.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Get the inner i64 value.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
