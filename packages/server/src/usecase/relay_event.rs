//! UseCase: タスクルームへのイベント中継
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - RelayEventUseCase::execute()（クライアント発）と publish()（REST 書き込み経路発）
//!
//! ### なぜこのテストが必要か
//! - 送信者エコーの有無が呼び出し側の指定どおりに一貫して適用されること
//! - 同一送信者のイベントが送信順に届くこと
//! - 未参加ルームへの送信が他のメンバーに影響せず拒否されること
//!
//! ### どのような状況を想定しているか
//! - 正常系：chat-message / task-updated の中継
//! - 異常系：未参加・通知ルーム宛て・ペイロード過大

use std::sync::Arc;

use serde_json::Value;

use crate::{
    common::time::get_jst_timestamp,
    domain::{ConnectionId, EventPayload, RelayKind, RoomId, RoomRegistry, TaskId, UserId},
    infrastructure::dto::websocket::ServerFrame,
};

use super::error::RelayError;

/// イベント中継のユースケース
pub struct RelayEventUseCase {
    registry: Arc<dyn RoomRegistry>,
}

impl RelayEventUseCase {
    /// 新しい RelayEventUseCase を作成
    pub fn new(registry: Arc<dyn RoomRegistry>) -> Self {
        Self { registry }
    }

    /// クライアントから受け取ったイベントを中継する
    ///
    /// # Arguments
    ///
    /// * `sender` - 送信元の接続
    /// * `room_id` - 宛先ルーム（タスクルームのみ）
    /// * `kind` - イベント種別
    /// * `payload` - アプリケーションペイロード（そのまま転送）
    /// * `echo` - 送信元にも配信するか
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<ConnectionId>)` - 配信した接続
    /// * `Err(RelayError)` - 送信者にだけ返すエラー
    pub async fn execute(
        &self,
        sender: &ConnectionId,
        room_id: &RoomId,
        kind: RelayKind,
        payload: Value,
        echo: bool,
    ) -> Result<Vec<ConnectionId>, RelayError> {
        if !room_id.is_task_room() {
            return Err(RelayError::Forbidden(room_id.to_string()));
        }

        let connection = self
            .registry
            .get_connection(sender)
            .await
            .map_err(|_| RelayError::ConnectionNotFound(sender.to_string()))?;

        if !self.registry.is_member(sender, room_id).await {
            return Err(RelayError::NotAMember(room_id.to_string()));
        }

        let exclude = if echo { None } else { Some(sender) };
        self.relay(room_id, kind, payload, Some(&connection.user_id), exclude)
            .await
    }

    /// REST 書き込み経路で永続化済みの結果をタスクルームへ中継する
    ///
    /// 送信元の接続がないため、ルームの全メンバーに配信する。
    /// `sender` は変更を行ったユーザーで、発行元サービスが申告する。
    pub async fn publish(
        &self,
        task_id: TaskId,
        kind: RelayKind,
        payload: Value,
        sender: Option<&UserId>,
    ) -> Result<Vec<ConnectionId>, RelayError> {
        let room_id = RoomId::task(task_id);
        self.relay(&room_id, kind, payload, sender, None).await
    }

    async fn relay(
        &self,
        room_id: &RoomId,
        kind: RelayKind,
        payload: Value,
        sender_user: Option<&UserId>,
        exclude: Option<&ConnectionId>,
    ) -> Result<Vec<ConnectionId>, RelayError> {
        let payload = EventPayload::new(payload)?;

        let mut frame = ServerFrame::new(
            kind.into(),
            Some(room_id.to_string()),
            payload.into_value(),
            get_jst_timestamp(),
        );
        if let Some(user) = sender_user {
            frame = frame.with_sender(user.as_str());
        }
        let frame = frame
            .to_json()
            .map_err(|e| RelayError::Encode(e.to_string()))?;

        let delivered = self.registry.deliver(room_id, exclude, &frame).await;
        tracing::debug!(
            "Relayed {:?} to {} connection(s) in '{}'",
            kind,
            delivered.len(),
            room_id
        );
        Ok(delivered)
    }
}
