//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::{
    common::time::get_jst_timestamp,
    domain::{ConnectionId, RelayKind, RoomId, UserId},
    infrastructure::{
        auth::extract_bearer_token,
        dto::websocket::{ClientFrame, ErrorCode, ServerFrame},
    },
    ui::state::{AppState, ConnectQuery},
    usecase::{
        ConnectUserUseCase, DisconnectConnectionUseCase, JoinRoomError, JoinRoomUseCase,
        LeaveRoomError, LeaveRoomUseCase, RelayError, RelayEventUseCase,
    },
};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, StatusCode> {
    // Query parameter first, then the Authorization header
    let token = query.token.or_else(|| {
        headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(extract_bearer_token)
            .map(str::to_string)
    });

    let connect_usecase = ConnectUserUseCase::new(state.registry.clone(), state.verifier.clone());
    let user_id = match connect_usecase.authenticate(token.as_deref()) {
        Ok(user_id) => user_id,
        Err(e) => {
            tracing::warn!("Rejected WebSocket handshake: {}", e);
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    tracing::info!("User '{}' authenticated, upgrading connection", user_id);
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user_id)))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user_id: UserId) {
    // Create a channel for this connection to receive frames
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let connect_usecase = ConnectUserUseCase::new(state.registry.clone(), state.verifier.clone());
    let connection = match connect_usecase.execute(user_id, tx).await {
        Ok(connection) => connection,
        Err(e) => {
            tracing::error!("Failed to register connection: {}", e);
            return;
        }
    };
    let connection_id = connection.id.clone();
    tracing::info!(
        "Connection '{}' registered for user '{}'",
        connection_id,
        connection.user_id
    );

    let (mut sender, mut receiver) = socket.split();

    // Spawn a task to receive frames from this connection
    let recv_state = state.clone();
    let recv_connection_id = connection_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::error!("WebSocket error on '{}': {}", recv_connection_id, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    tracing::debug!("Received frame from '{}': {}", recv_connection_id, text);
                    handle_frame(&recv_state, &recv_connection_id, text.as_str()).await;
                }
                Message::Binary(_) => {
                    tracing::warn!(
                        "Ignoring binary frame from '{}'",
                        recv_connection_id
                    );
                }
                Message::Ping(_) => {
                    tracing::debug!("Received ping");
                    // Ping/pong is handled automatically by the WebSocket protocol
                }
                Message::Close(_) => {
                    tracing::info!("Connection '{}' requested close", recv_connection_id);
                    break;
                }
                _ => {}
            }
        }
    });

    // Spawn a task to forward queued frames to this connection
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    let disconnect_usecase = DisconnectConnectionUseCase::new(state.registry.clone());
    match disconnect_usecase.execute(&connection_id).await {
        Ok(rooms) => {
            tracing::info!(
                "Connection '{}' closed, left {} task room(s)",
                connection_id,
                rooms.len()
            );
        }
        Err(e) => {
            tracing::warn!("Failed to disconnect '{}': {}", connection_id, e);
        }
    }
}

/// Parse one client frame and dispatch it; failures go back to the sender only
async fn handle_frame(state: &AppState, connection_id: &ConnectionId, text: &str) {
    let frame = match serde_json::from_str::<ClientFrame>(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!("Invalid frame from '{}': {}", connection_id, e);
            send_error(state, connection_id, None, ErrorCode::InvalidFrame, e.to_string()).await;
            return;
        }
    };

    match frame {
        ClientFrame::Join { room_id } => {
            let Some(room) = parse_room(state, connection_id, &room_id).await else {
                return;
            };
            let usecase = JoinRoomUseCase::new(state.registry.clone());
            if let Err(e) = usecase.execute(connection_id, &room).await {
                let code = match e {
                    JoinRoomError::Forbidden(_) => ErrorCode::Forbidden,
                    JoinRoomError::CapacityExceeded { .. } => ErrorCode::RoomCapacityExceeded,
                    JoinRoomError::ConnectionNotFound(_) | JoinRoomError::Encode(_) => {
                        ErrorCode::Internal
                    }
                };
                send_error(state, connection_id, Some(room_id), code, e.to_string()).await;
            }
        }
        ClientFrame::Leave { room_id } => {
            let Some(room) = parse_room(state, connection_id, &room_id).await else {
                return;
            };
            let usecase = LeaveRoomUseCase::new(state.registry.clone());
            if let Err(e) = usecase.execute(connection_id, &room).await {
                let code = match e {
                    LeaveRoomError::Forbidden(_) => ErrorCode::Forbidden,
                    LeaveRoomError::ConnectionNotFound(_) | LeaveRoomError::Encode(_) => {
                        ErrorCode::Internal
                    }
                };
                send_error(state, connection_id, Some(room_id), code, e.to_string()).await;
            }
        }
        ClientFrame::ChatMessage {
            room_id,
            payload,
            echo,
        } => {
            relay(state, connection_id, room_id, RelayKind::ChatMessage, payload, echo).await;
        }
        ClientFrame::TaskUpdated {
            room_id,
            payload,
            echo,
        } => {
            relay(state, connection_id, room_id, RelayKind::TaskUpdated, payload, echo).await;
        }
    }
}

async fn relay(
    state: &AppState,
    connection_id: &ConnectionId,
    room_id: String,
    kind: RelayKind,
    payload: Value,
    echo: bool,
) {
    let Some(room) = parse_room(state, connection_id, &room_id).await else {
        return;
    };
    let usecase = RelayEventUseCase::new(state.registry.clone());
    if let Err(e) = usecase
        .execute(connection_id, &room, kind, payload, echo)
        .await
    {
        let code = match e {
            RelayError::Forbidden(_) => ErrorCode::Forbidden,
            RelayError::NotAMember(_) => ErrorCode::NotAMember,
            RelayError::PayloadTooLarge { .. } => ErrorCode::PayloadTooLarge,
            RelayError::ConnectionNotFound(_) | RelayError::Encode(_) => ErrorCode::Internal,
        };
        send_error(state, connection_id, Some(room_id), code, e.to_string()).await;
    }
}

async fn parse_room(
    state: &AppState,
    connection_id: &ConnectionId,
    room_id: &str,
) -> Option<RoomId> {
    match room_id.parse::<RoomId>() {
        Ok(room) => Some(room),
        Err(e) => {
            send_error(
                state,
                connection_id,
                Some(room_id.to_string()),
                ErrorCode::InvalidRoom,
                e.to_string(),
            )
            .await;
            None
        }
    }
}

async fn send_error(
    state: &AppState,
    connection_id: &ConnectionId,
    room_id: Option<String>,
    code: ErrorCode,
    message: String,
) {
    let frame = match ServerFrame::error(room_id, code, message, get_jst_timestamp()).to_json() {
        Ok(frame) => frame,
        Err(e) => {
            tracing::error!("Failed to encode error frame: {}", e);
            return;
        }
    };
    if let Err(e) = state.registry.send_to(connection_id, &frame).await {
        tracing::warn!("Failed to send error to '{}': {}", connection_id, e);
    }
}
