//! WebSocket relay integration tests.
//!
//! Handshake, room membership and event relay over real sockets.

mod fixtures;

use std::time::Duration;

use fixtures::{TestServer, assert_silent, join, recv_frame, recv_until, send_json, token_with_secret};
use futures_util::SinkExt;
use serde_json::json;
use tokio_tungstenite::{connect_async, tungstenite::Message};

const QUIET: Duration = Duration::from_millis(200);

#[tokio::test]
async fn test_handshake_without_token_rejected() {
    // テスト項目: トークンなしのハンドシェイクはアップグレード前に 401 で拒否される
    // given (前提条件):
    let server = TestServer::start().await;

    // when (操作):
    let result = connect_async(server.ws_url()).await;

    // then (期待する結果):
    match result {
        Err(tokio_tungstenite::tungstenite::Error::Http(response)) => {
            assert_eq!(response.status(), 401);
        }
        other => panic!("Expected HTTP 401, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_handshake_with_forged_token_rejected() {
    // テスト項目: 署名の異なるトークンは拒否され、状態が作られない
    // given (前提条件):
    let server = TestServer::start().await;
    let url = format!(
        "{}?token={}",
        server.ws_url(),
        token_with_secret("mallory", "wrong-secret")
    );

    // when (操作):
    let result = connect_async(url).await;

    // then (期待する結果):
    assert!(result.is_err());
    let rooms: serde_json::Value = reqwest::get(format!("{}/api/rooms", server.base_url()))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(rooms, json!([]));
}

#[tokio::test]
async fn test_chat_message_relayed_without_echo() {
    // テスト項目: A の chat-message を B が一度だけ受け取り、A には届かない
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.connect("alice").await;
    let mut bob = server.connect("bob").await;
    join(&mut alice, "task-42").await;
    join(&mut bob, "task-42").await;
    recv_until(&mut alice, "member-joined").await;

    // when (操作):
    send_json(
        &mut alice,
        json!({"type": "chat-message", "roomId": "task-42", "payload": {"text": "hi"}}),
    )
    .await;

    // then (期待する結果):
    let frame = recv_frame(&mut bob).await;
    assert_eq!(frame["type"], "chat-message");
    assert_eq!(frame["roomId"], "task-42");
    assert_eq!(frame["payload"]["text"], "hi");
    assert_eq!(frame["senderId"], "alice");
    assert_silent(&mut alice, QUIET).await;
    assert_silent(&mut bob, QUIET).await;
}

#[tokio::test]
async fn test_chat_message_with_echo() {
    // テスト項目: echo:true の場合は送信者にもちょうど一度届く
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.connect("alice").await;
    join(&mut alice, "task-42").await;

    // when (操作):
    send_json(
        &mut alice,
        json!({"type": "task-updated", "roomId": "task-42", "payload": {"status": "done"}, "echo": true}),
    )
    .await;

    // then (期待する結果):
    let frame = recv_frame(&mut alice).await;
    assert_eq!(frame["type"], "task-updated");
    assert_eq!(frame["payload"]["status"], "done");
    assert_silent(&mut alice, QUIET).await;
}

#[tokio::test]
async fn test_events_arrive_in_send_order() {
    // テスト項目: 同一送信者のイベントは送信順に届く
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.connect("alice").await;
    let mut bob = server.connect("bob").await;
    join(&mut alice, "task-42").await;
    join(&mut bob, "task-42").await;

    // when (操作):
    for i in 0..30 {
        send_json(
            &mut alice,
            json!({"type": "chat-message", "roomId": "task-42", "payload": i}),
        )
        .await;
    }

    // then (期待する結果):
    for i in 0..30 {
        let frame = recv_until(&mut bob, "chat-message").await;
        assert_eq!(frame["payload"], i);
    }
}

#[tokio::test]
async fn test_disconnect_notifies_member_left() {
    // テスト項目: leave せずに切断しても残りのメンバーに member-left が届く
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.connect("alice").await;
    let mut bob = server.connect("bob").await;
    join(&mut alice, "task-42").await;
    join(&mut bob, "task-42").await;
    recv_until(&mut alice, "member-joined").await;

    // when (操作):
    bob.close(None).await.unwrap();

    // then (期待する結果):
    let frame = recv_until(&mut alice, "member-left").await;
    assert_eq!(frame["roomId"], "task-42");
    assert_eq!(frame["payload"]["userId"], "bob");
}

#[tokio::test]
async fn test_no_events_after_leave() {
    // テスト項目: room-left を受け取った後はそのルームのイベントが届かない
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.connect("alice").await;
    let mut bob = server.connect("bob").await;
    join(&mut alice, "task-42").await;
    join(&mut bob, "task-42").await;

    // when (操作):
    send_json(&mut alice, json!({"type": "leave", "roomId": "task-42"})).await;
    recv_until(&mut alice, "room-left").await;
    recv_until(&mut bob, "member-left").await;
    send_json(
        &mut bob,
        json!({"type": "chat-message", "roomId": "task-42", "payload": "anyone?"}),
    )
    .await;

    // then (期待する結果):
    assert_silent(&mut alice, QUIET).await;
}

#[tokio::test]
async fn test_join_is_idempotent() {
    // テスト項目: 二重参加で member-joined は一度しか届かない
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.connect("alice").await;
    let mut bob = server.connect("bob").await;
    join(&mut alice, "task-42").await;

    // when (操作):
    let first = join(&mut bob, "task-42").await;
    let second = join(&mut bob, "task-42").await;

    // then (期待する結果):
    assert_eq!(first["payload"]["members"].as_array().unwrap().len(), 2);
    assert_eq!(second["payload"]["members"].as_array().unwrap().len(), 2);
    recv_until(&mut alice, "member-joined").await;
    assert_silent(&mut alice, QUIET).await;
}

#[tokio::test]
async fn test_send_without_membership_returns_error() {
    // テスト項目: 未参加ルームへの送信は送信者にだけ not-a-member が返る
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.connect("alice").await;
    let mut bob = server.connect("bob").await;
    join(&mut bob, "task-42").await;

    // when (操作):
    send_json(
        &mut alice,
        json!({"type": "chat-message", "roomId": "task-42", "payload": "hi"}),
    )
    .await;

    // then (期待する結果):
    let frame = recv_frame(&mut alice).await;
    assert_eq!(frame["type"], "error");
    assert_eq!(frame["payload"]["code"], "not-a-member");
    assert_silent(&mut bob, QUIET).await;
}

#[tokio::test]
async fn test_join_other_users_notification_room_forbidden() {
    // テスト項目: 他人の通知ルームへの参加は forbidden
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.connect("alice").await;

    // when (操作):
    send_json(&mut alice, json!({"type": "join", "roomId": "user-bob"})).await;

    // then (期待する結果):
    let frame = recv_frame(&mut alice).await;
    assert_eq!(frame["type"], "error");
    assert_eq!(frame["roomId"], "user-bob");
    assert_eq!(frame["payload"]["code"], "forbidden");
}

#[tokio::test]
async fn test_invalid_frames_return_errors() {
    // テスト項目: 解釈できないフレーム・不正なルーム ID はエラーを返し、接続は維持される
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.connect("alice").await;

    // when (操作):
    alice
        .send(Message::Text("not json".into()))
        .await
        .unwrap();
    let invalid_frame = recv_frame(&mut alice).await;
    send_json(&mut alice, json!({"type": "join", "roomId": "project-1"})).await;
    let invalid_room = recv_frame(&mut alice).await;

    // then (期待する結果):
    assert_eq!(invalid_frame["payload"]["code"], "invalid-frame");
    assert_eq!(invalid_room["payload"]["code"], "invalid-room");
    let joined = join(&mut alice, "task-1").await;
    assert_eq!(joined["roomId"], "task-1");
}

#[tokio::test]
async fn test_room_capacity_exceeded() {
    // テスト項目: 容量を超える参加は room-capacity-exceeded
    // given (前提条件):
    let server = TestServer::start_with_capacity(1).await;
    let mut alice = server.connect("alice").await;
    let mut bob = server.connect("bob").await;
    join(&mut alice, "task-42").await;

    // when (操作):
    send_json(&mut bob, json!({"type": "join", "roomId": "task-42"})).await;

    // then (期待する結果):
    let frame = recv_frame(&mut bob).await;
    assert_eq!(frame["type"], "error");
    assert_eq!(frame["payload"]["code"], "room-capacity-exceeded");
}
