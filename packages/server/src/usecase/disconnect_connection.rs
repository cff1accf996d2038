//! UseCase: 接続切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectConnectionUseCase::execute() メソッド
//!
//! ### なぜこのテストが必要か
//! - leave を呼ばずに切断しても、参加中の全ルームから一括で削除されること
//! - 残ったメンバーに member-left（切断したユーザー ID 付き）が届くこと
//!
//! ### どのような状況を想定しているか
//! - 正常系：複数ルーム参加中の切断
//! - エッジケース：最後のメンバーの切断（ルームが消える）
//! - 異常系：存在しない接続の切断

use std::sync::Arc;

use crate::{
    common::time::get_jst_timestamp,
    domain::{ConnectionId, RoomId, RoomRegistry},
    infrastructure::dto::websocket::{FrameType, MemberInfo, ServerFrame},
};

use super::error::DisconnectError;

/// 接続切断のユースケース
pub struct DisconnectConnectionUseCase {
    registry: Arc<dyn RoomRegistry>,
}

impl DisconnectConnectionUseCase {
    /// 新しい DisconnectConnectionUseCase を作成
    pub fn new(registry: Arc<dyn RoomRegistry>) -> Self {
        Self { registry }
    }

    /// 接続切断を実行
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<RoomId>)` - 退出したタスクルーム（member-left 通知済み）
    /// * `Err(DisconnectError)` - 接続が見つからない
    pub async fn execute(
        &self,
        connection_id: &ConnectionId,
    ) -> Result<Vec<RoomId>, DisconnectError> {
        // 1. 全ルームから一括で削除
        let (connection, rooms) = self
            .registry
            .unregister_connection(connection_id)
            .await
            .map_err(|_| DisconnectError::ConnectionNotFound(connection_id.to_string()))?;

        // 2. タスクルームの残りのメンバーへ通知
        let task_rooms: Vec<RoomId> = rooms.into_iter().filter(RoomId::is_task_room).collect();
        let info = MemberInfo {
            user_id: connection.user_id.to_string(),
            connection_id: connection_id.to_string(),
        };
        let payload = match serde_json::to_value(info) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!("Failed to encode member-left payload: {}", e);
                return Ok(task_rooms);
            }
        };
        let disconnected_at = get_jst_timestamp();

        for room_id in &task_rooms {
            let frame = ServerFrame::new(
                FrameType::MemberLeft,
                Some(room_id.to_string()),
                payload.clone(),
                disconnected_at,
            );
            match frame.to_json() {
                Ok(json) => {
                    self.registry.deliver(room_id, None, &json).await;
                }
                Err(e) => tracing::error!("Failed to encode member-left frame: {}", e),
            }
        }

        Ok(task_rooms)
    }
}
