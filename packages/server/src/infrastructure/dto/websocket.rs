//! WebSocket frame DTOs for the realtime protocol.
//!
//! Every server frame carries `{type, roomId, payload}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::RelayKind;

/// Frames sent by clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientFrame {
    Join {
        room_id: String,
    },
    Leave {
        room_id: String,
    },
    ChatMessage {
        room_id: String,
        #[serde(default)]
        payload: Value,
        /// Also deliver the event back to the sending connection
        #[serde(default)]
        echo: bool,
    },
    TaskUpdated {
        room_id: String,
        #[serde(default)]
        payload: Value,
        #[serde(default)]
        echo: bool,
    },
}

/// Frame type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FrameType {
    Connected,
    RoomJoined,
    RoomLeft,
    ChatMessage,
    TaskUpdated,
    MemberJoined,
    MemberLeft,
    Notification,
    Error,
}

impl From<RelayKind> for FrameType {
    fn from(kind: RelayKind) -> Self {
        match kind {
            RelayKind::ChatMessage => Self::ChatMessage,
            RelayKind::TaskUpdated => Self::TaskUpdated,
        }
    }
}

/// Frames sent by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerFrame {
    pub r#type: FrameType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    #[serde(default)]
    pub payload: Value,
    /// User that originated a relayed event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    /// Unix timestamp (milliseconds since epoch) in JST
    pub timestamp: i64,
}

impl ServerFrame {
    pub fn new(r#type: FrameType, room_id: Option<String>, payload: Value, timestamp: i64) -> Self {
        Self {
            r#type,
            room_id,
            payload,
            sender_id: None,
            timestamp,
        }
    }

    pub fn with_sender(mut self, sender_id: impl Into<String>) -> Self {
        self.sender_id = Some(sender_id.into());
        self
    }

    /// Error frame addressed to a single connection
    pub fn error(room_id: Option<String>, code: ErrorCode, message: String, timestamp: i64) -> Self {
        let payload = ErrorPayload { code, message };
        Self::new(
            FrameType::Error,
            room_id,
            serde_json::to_value(payload).unwrap_or(Value::Null),
            timestamp,
        )
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Payload of `connected`, `member-joined` and `member-left`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberInfo {
    pub user_id: String,
    pub connection_id: String,
}

/// Payload of `room-joined`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomMembersPayload {
    pub members: Vec<MemberInfo>,
}

/// Error codes carried by `error` frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    InvalidFrame,
    InvalidRoom,
    Forbidden,
    NotAMember,
    RoomCapacityExceeded,
    PayloadTooLarge,
    Internal,
}

/// Payload of `error`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: ErrorCode,
    pub message: String,
}
