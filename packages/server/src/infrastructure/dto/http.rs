//! HTTP API request/response DTOs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::RelayKind;

/// Room summary for list endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSummaryDto {
    pub id: String,
    /// Distinct user ids present in the room
    pub members: Vec<String>,
    /// Number of live connections in the room
    pub connections: usize,
}

/// Room detail for detail endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomDetailDto {
    pub id: String,
    pub members: Vec<MemberDetailDto>,
}

/// Member detail for room detail endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDetailDto {
    pub connection_id: String,
    pub user_id: String,
    pub joined_at: String, // ISO 8601
}

/// Body of `POST /api/tasks/{task_id}/events`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishTaskEventRequest {
    pub r#type: RelayKind,
    #[serde(default)]
    pub payload: Value,
    /// User who made the change, forwarded as `senderId`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
}

/// Body of `POST /api/users/{user_id}/notifications`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishNotificationRequest {
    #[serde(default)]
    pub payload: Value,
}

/// Response of the publish endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishResponseDto {
    /// Number of connections the event was queued for
    pub delivered: usize,
}
