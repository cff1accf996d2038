//! Test fixtures shared by the integration tests.
//!
//! Each test starts its own in-process server on an ephemeral port.

#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::Value;
use taskme_server::{
    infrastructure::{
        auth::{JwtClaims, JwtTokenVerifier},
        repository::InMemoryRoomRegistry,
    },
    ui::{serve, state::AppState},
};
use tokio::{net::TcpStream, sync::oneshot};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{Message, client::IntoClientRequest},
};

pub const TEST_SECRET: &str = "integration-test-secret";
pub const PUBLISH_SECRET: &str = "integration-publish-secret";

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// In-process server, stopped when dropped
pub struct TestServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with_capacity(taskme_server::domain::DEFAULT_ROOM_CAPACITY).await
    }

    pub async fn start_with_capacity(room_capacity: usize) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local addr");
        let state = Arc::new(AppState::new(
            Arc::new(InMemoryRoomRegistry::new(room_capacity)),
            Arc::new(JwtTokenVerifier::new(TEST_SECRET.as_bytes(), None)),
            Arc::new(JwtTokenVerifier::new(PUBLISH_SECRET.as_bytes(), None)),
        ));
        let (tx, rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let shutdown = async {
                let _ = rx.await;
            };
            serve(listener, state, shutdown)
                .await
                .expect("Test server failed");
        });

        Self {
            addr,
            shutdown: Some(tx),
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Connect as `user` with the token in the query string and consume the `connected` frame
    pub async fn connect(&self, user: &str) -> WsStream {
        let url = format!("{}?token={}", self.ws_url(), token_for(user));
        let (mut ws, _) = connect_async(url).await.expect("Failed to connect");
        let connected = recv_frame(&mut ws).await;
        assert_eq!(connected["type"], "connected");
        ws
    }

    /// Connect with the token in an Authorization header
    pub async fn connect_with_header(&self, user: &str) -> WsStream {
        let mut request = self
            .ws_url()
            .into_client_request()
            .expect("Failed to build request");
        request.headers_mut().insert(
            "Authorization",
            format!("Bearer {}", token_for(user))
                .parse()
                .expect("Invalid header value"),
        );
        let (mut ws, _) = connect_async(request).await.expect("Failed to connect");
        let connected = recv_frame(&mut ws).await;
        assert_eq!(connected["type"], "connected");
        ws
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Mint a valid HS256 token for `user`
pub fn token_for(user: &str) -> String {
    token_with_secret(user, TEST_SECRET)
}

/// Mint a service token accepted by the publish endpoints
pub fn service_token() -> String {
    token_with_secret("task-api", PUBLISH_SECRET)
}

pub fn token_with_secret(user: &str, secret: &str) -> String {
    let claims = JwtClaims {
        sub: user.to_string(),
        exp: (chrono::Utc::now().timestamp() + 3600) as u64,
        iat: None,
        iss: None,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("Failed to encode token")
}

pub async fn send_json(ws: &mut WsStream, frame: Value) {
    ws.send(Message::Text(frame.to_string().into()))
        .await
        .expect("Failed to send frame");
}

/// Receive the next text frame as JSON, failing after two seconds
pub async fn recv_frame(ws: &mut WsStream) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("Timed out waiting for frame")
            .expect("Stream ended")
            .expect("WebSocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).expect("Frame is not JSON");
        }
    }
}

/// Receive frames until one of type `frame_type` arrives
pub async fn recv_until(ws: &mut WsStream, frame_type: &str) -> Value {
    loop {
        let frame = recv_frame(ws).await;
        if frame["type"] == frame_type {
            return frame;
        }
    }
}

/// Assert that no text frame arrives within `wait`
pub async fn assert_silent(ws: &mut WsStream, wait: Duration) {
    if let Ok(Some(Ok(Message::Text(text)))) = tokio::time::timeout(wait, ws.next()).await {
        panic!("Unexpected frame: {}", text);
    }
}

pub async fn join(ws: &mut WsStream, room_id: &str) -> Value {
    send_json(ws, serde_json::json!({"type": "join", "roomId": room_id})).await;
    recv_until(ws, "room-joined").await
}
