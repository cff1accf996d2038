//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
};

use crate::{
    common::time::timestamp_to_jst_rfc3339,
    domain::{RoomId, TaskId, UserId},
    infrastructure::{
        auth::extract_bearer_token,
        dto::http::{
            MemberDetailDto, PublishNotificationRequest, PublishResponseDto,
            PublishTaskEventRequest, RoomDetailDto, RoomSummaryDto,
        },
    },
    ui::state::AppState,
    usecase::{PublishNotificationUseCase, RelayError, RelayEventUseCase},
};

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Get list of rooms that currently have members
pub async fn get_rooms(State(state): State<Arc<AppState>>) -> Json<Vec<RoomSummaryDto>> {
    let rooms = state.registry.list_rooms().await;

    Json(
        rooms
            .iter()
            .map(|room| RoomSummaryDto {
                id: room.id.to_string(),
                members: room.user_ids().into_iter().map(UserId::into_string).collect(),
                connections: room.members.len(),
            })
            .collect(),
    )
}

/// Get room detail by ID
pub async fn get_room_detail(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomDetailDto>, StatusCode> {
    let room_id: RoomId = room_id.parse().map_err(|_| StatusCode::BAD_REQUEST)?;
    let room = state
        .registry
        .get_room(&room_id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(RoomDetailDto {
        id: room.id.to_string(),
        members: room
            .members
            .iter()
            .map(|m| MemberDetailDto {
                connection_id: m.connection_id.to_string(),
                user_id: m.user_id.to_string(),
                joined_at: timestamp_to_jst_rfc3339(m.joined_at.value()),
            })
            .collect(),
    }))
}

/// Relay an already-persisted task change or comment to the task room
pub async fn publish_task_event(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(task_id): Path<String>,
    Json(body): Json<PublishTaskEventRequest>,
) -> Result<Json<PublishResponseDto>, StatusCode> {
    authorize_publisher(&state, &headers)?;
    let task_id = TaskId::new(task_id).map_err(|_| StatusCode::BAD_REQUEST)?;
    let sender = body
        .sender_id
        .map(UserId::new)
        .transpose()
        .map_err(|_| StatusCode::BAD_REQUEST)?;

    let usecase = RelayEventUseCase::new(state.registry.clone());
    let delivered = usecase
        .publish(task_id, body.r#type, body.payload, sender.as_ref())
        .await
        .map_err(relay_error_status)?;

    Ok(Json(PublishResponseDto {
        delivered: delivered.len(),
    }))
}

/// Deliver a notification to every connection of a user
pub async fn publish_notification(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    Json(body): Json<PublishNotificationRequest>,
) -> Result<Json<PublishResponseDto>, StatusCode> {
    authorize_publisher(&state, &headers)?;
    let user_id = UserId::new(user_id).map_err(|_| StatusCode::BAD_REQUEST)?;

    let usecase = PublishNotificationUseCase::new(state.registry.clone());
    let delivered = usecase
        .execute(user_id, body.payload)
        .await
        .map_err(relay_error_status)?;

    Ok(Json(PublishResponseDto {
        delivered: delivered.len(),
    }))
}

/// Require a service token signed with the publish secret.
///
/// A valid user token is authenticated but not allowed to publish (403);
/// anything else is 401.
fn authorize_publisher(state: &AppState, headers: &HeaderMap) -> Result<UserId, StatusCode> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(extract_bearer_token)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    match state.publisher.verify(token) {
        Ok(service) => {
            tracing::debug!("Publish request from service '{}'", service);
            Ok(service)
        }
        Err(publish_error) => match state.verifier.verify(token) {
            Ok(user) => {
                tracing::warn!("User '{}' is not allowed to publish", user);
                Err(StatusCode::FORBIDDEN)
            }
            Err(_) => {
                tracing::warn!("Rejected publish request: {}", publish_error);
                Err(StatusCode::UNAUTHORIZED)
            }
        },
    }
}

fn relay_error_status(error: RelayError) -> StatusCode {
    match error {
        RelayError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        RelayError::Forbidden(_) | RelayError::NotAMember(_) => StatusCode::FORBIDDEN,
        RelayError::ConnectionNotFound(_) | RelayError::Encode(_) => {
            tracing::error!("Failed to publish event: {}", error);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
