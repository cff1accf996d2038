//! UseCase: ユーザー通知の配信
//!
//! 通知はユーザーの通知ルーム（そのユーザーの全接続）に届けられる。

use std::sync::Arc;

use serde_json::Value;

use crate::{
    common::time::get_jst_timestamp,
    domain::{ConnectionId, EventPayload, RoomId, RoomRegistry, UserId},
    infrastructure::dto::websocket::{FrameType, ServerFrame},
};

use super::error::RelayError;

/// 通知配信のユースケース
pub struct PublishNotificationUseCase {
    registry: Arc<dyn RoomRegistry>,
}

impl PublishNotificationUseCase {
    /// 新しい PublishNotificationUseCase を作成
    pub fn new(registry: Arc<dyn RoomRegistry>) -> Self {
        Self { registry }
    }

    /// `user_id` の全接続へ notification を配信する
    ///
    /// オフラインのユーザー宛ては配信先 0 件で成功する（永続化しない）。
    pub async fn execute(
        &self,
        user_id: UserId,
        payload: Value,
    ) -> Result<Vec<ConnectionId>, RelayError> {
        let payload = EventPayload::new(payload)?;
        let room_id = RoomId::user(user_id);
        let frame = ServerFrame::new(
            FrameType::Notification,
            Some(room_id.to_string()),
            payload.into_value(),
            get_jst_timestamp(),
        )
        .to_json()
        .map_err(|e| RelayError::Encode(e.to_string()))?;

        let delivered = self.registry.deliver(&room_id, None, &frame).await;
        tracing::debug!(
            "Delivered notification to {} connection(s) of '{}'",
            delivered.len(),
            room_id
        );
        Ok(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecase::test_support::{connect, create_test_registry, drain};
    use serde_json::json;

    #[tokio::test]
    async fn test_notification_reaches_every_connection_of_user() {
        // テスト項目: 通知は対象ユーザーの全接続に届き、他ユーザーには届かない
        // given (前提条件):
        let registry = create_test_registry();
        let usecase = PublishNotificationUseCase::new(registry.clone());
        let (_tab1, mut tab1_rx) = connect(&registry, "alice").await;
        let (_tab2, mut tab2_rx) = connect(&registry, "alice").await;
        let (_bob, mut bob_rx) = connect(&registry, "bob").await;
        for rx in [&mut tab1_rx, &mut tab2_rx, &mut bob_rx] {
            drain(rx);
        }

        // when (操作):
        let delivered = usecase
            .execute(
                UserId::new("alice".to_string()).unwrap(),
                json!({"text": "You were assigned to task 42"}),
            )
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(delivered.len(), 2);
        for rx in [&mut tab1_rx, &mut tab2_rx] {
            let frames = drain(rx);
            assert_eq!(frames.len(), 1);
            assert_eq!(frames[0].r#type, FrameType::Notification);
            assert_eq!(frames[0].room_id.as_deref(), Some("user-alice"));
        }
        assert!(drain(&mut bob_rx).is_empty());
    }

    #[tokio::test]
    async fn test_notification_to_offline_user() {
        // テスト項目: 接続のないユーザー宛ての通知は 0 件配信で成功する
        // given (前提条件):
        let registry = create_test_registry();
        let usecase = PublishNotificationUseCase::new(registry.clone());

        // when (操作):
        let result = usecase
            .execute(UserId::new("nobody".to_string()).unwrap(), json!({}))
            .await;

        // then (期待する結果):
        assert_eq!(result, Ok(Vec::new()));
    }
}
