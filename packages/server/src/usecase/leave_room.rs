//! UseCase: ルーム退出処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - LeaveRoomUseCase::execute() メソッド
//!
//! ### なぜこのテストが必要か
//! - 残ったメンバーに member-left が届くこと
//! - 退出後はそのルームの配信を受け取らないこと
//! - 通知ルームは接続中ずっと参加したままであること
//!
//! ### どのような状況を想定しているか
//! - 正常系：退出と通知
//! - エッジケース：未参加ルームからの退出（no-op）
//! - 異常系：通知ルームからの退出

use std::sync::Arc;

use crate::{
    common::time::get_jst_timestamp,
    domain::{ConnectionId, RoomId, RoomRegistry},
    infrastructure::dto::websocket::{FrameType, MemberInfo, ServerFrame},
};

use super::error::LeaveRoomError;

/// ルーム退出のユースケース
pub struct LeaveRoomUseCase {
    registry: Arc<dyn RoomRegistry>,
}

impl LeaveRoomUseCase {
    /// 新しい LeaveRoomUseCase を作成
    pub fn new(registry: Arc<dyn RoomRegistry>) -> Self {
        Self { registry }
    }

    /// ルーム退出を実行
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - 退出した（残りのメンバーへ通知済み）
    /// * `Ok(false)` - もともと参加していなかった
    /// * `Err(LeaveRoomError)` - 通知ルームからの退出など
    pub async fn execute(
        &self,
        connection_id: &ConnectionId,
        room_id: &RoomId,
    ) -> Result<bool, LeaveRoomError> {
        if !room_id.is_task_room() {
            return Err(LeaveRoomError::Forbidden(room_id.to_string()));
        }

        let connection = self
            .registry
            .get_connection(connection_id)
            .await
            .map_err(|_| LeaveRoomError::ConnectionNotFound(connection_id.to_string()))?;

        let left = self
            .registry
            .leave_room(connection_id, room_id)
            .await
            .map_err(|_| LeaveRoomError::ConnectionNotFound(connection_id.to_string()))?;

        let timestamp = get_jst_timestamp();
        let info = serde_json::to_value(MemberInfo {
            user_id: connection.user_id.to_string(),
            connection_id: connection_id.to_string(),
        })
        .map_err(|e| LeaveRoomError::Encode(e.to_string()))?;

        if left {
            let frame = ServerFrame::new(
                FrameType::MemberLeft,
                Some(room_id.to_string()),
                info.clone(),
                timestamp,
            )
            .to_json()
            .map_err(|e| LeaveRoomError::Encode(e.to_string()))?;
            self.registry.deliver(room_id, None, &frame).await;
        }

        let ack = ServerFrame::new(FrameType::RoomLeft, Some(room_id.to_string()), info, timestamp)
            .to_json()
            .map_err(|e| LeaveRoomError::Encode(e.to_string()))?;
        if let Err(e) = self.registry.send_to(connection_id, &ack).await {
            tracing::warn!("Failed to send room-left to '{}': {}", connection_id, e);
        }

        Ok(left)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::TaskId,
        usecase::{
            JoinRoomUseCase, RelayEventUseCase,
            test_support::{connect, create_test_registry, drain},
        },
    };
    use serde_json::json;

    fn task_42() -> RoomId {
        RoomId::task(TaskId::new("42".to_string()).unwrap())
    }

    #[tokio::test]
    async fn test_leave_notifies_remaining_members() {
        // テスト項目: 退出すると残りのメンバーに member-left が届く
        // given (前提条件):
        let registry = create_test_registry();
        let join = JoinRoomUseCase::new(registry.clone());
        let usecase = LeaveRoomUseCase::new(registry.clone());
        let (alice, mut alice_rx) = connect(&registry, "alice").await;
        let (bob, mut bob_rx) = connect(&registry, "bob").await;
        join.execute(&alice.id, &task_42()).await.unwrap();
        join.execute(&bob.id, &task_42()).await.unwrap();
        drain(&mut alice_rx);
        drain(&mut bob_rx);

        // when (操作):
        let result = usecase.execute(&alice.id, &task_42()).await;

        // then (期待する結果):
        assert_eq!(result, Ok(true));
        let bob_frames = drain(&mut bob_rx);
        assert_eq!(bob_frames.len(), 1);
        assert_eq!(bob_frames[0].r#type, FrameType::MemberLeft);
        let left: MemberInfo = serde_json::from_value(bob_frames[0].payload.clone()).unwrap();
        assert_eq!(left.user_id, "alice");

        let alice_frames = drain(&mut alice_rx);
        assert_eq!(alice_frames.len(), 1);
        assert_eq!(alice_frames[0].r#type, FrameType::RoomLeft);
    }

    #[tokio::test]
    async fn test_no_events_after_leave() {
        // テスト項目: leave が返った後に送られたイベントは退出者に届かない
        // given (前提条件):
        let registry = create_test_registry();
        let join = JoinRoomUseCase::new(registry.clone());
        let relay = RelayEventUseCase::new(registry.clone());
        let usecase = LeaveRoomUseCase::new(registry.clone());
        let (alice, mut alice_rx) = connect(&registry, "alice").await;
        let (bob, _bob_rx) = connect(&registry, "bob").await;
        join.execute(&alice.id, &task_42()).await.unwrap();
        join.execute(&bob.id, &task_42()).await.unwrap();

        // when (操作):
        usecase.execute(&alice.id, &task_42()).await.unwrap();
        drain(&mut alice_rx);
        relay
            .execute(
                &bob.id,
                &task_42(),
                crate::domain::RelayKind::ChatMessage,
                json!("anyone?"),
                false,
            )
            .await
            .unwrap();

        // then (期待する結果):
        assert!(drain(&mut alice_rx).is_empty());
    }

    #[tokio::test]
    async fn test_leave_without_join_is_noop() {
        // テスト項目: 参加していないルームからの退出は no-op で通知もない
        // given (前提条件):
        let registry = create_test_registry();
        let join = JoinRoomUseCase::new(registry.clone());
        let usecase = LeaveRoomUseCase::new(registry.clone());
        let (alice, _alice_rx) = connect(&registry, "alice").await;
        let (bob, mut bob_rx) = connect(&registry, "bob").await;
        join.execute(&bob.id, &task_42()).await.unwrap();
        drain(&mut bob_rx);

        // when (操作):
        let result = usecase.execute(&alice.id, &task_42()).await;

        // then (期待する結果):
        assert_eq!(result, Ok(false));
        assert!(drain(&mut bob_rx).is_empty());
    }

    #[tokio::test]
    async fn test_leave_notification_room_forbidden() {
        // テスト項目: 通知ルームからは退出できない
        // given (前提条件):
        let registry = create_test_registry();
        let usecase = LeaveRoomUseCase::new(registry.clone());
        let (alice, _alice_rx) = connect(&registry, "alice").await;

        // when (操作):
        let result = usecase.execute(&alice.id, &alice.notification_room()).await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(LeaveRoomError::Forbidden("user-alice".to_string()))
        );
        assert!(
            registry
                .is_member(&alice.id, &alice.notification_room())
                .await
        );
    }
}
