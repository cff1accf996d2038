//! UseCase: ハンドシェイク認証と接続登録
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectUserUseCase::authenticate() / execute()
//!
//! ### なぜこのテストが必要か
//! - 不正な資格情報では状態を一切作らずに拒否されることを保証
//! - 接続が所有ユーザーの通知ルームに自動参加することを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：有効なトークンでの接続と connected フレームの送信
//! - 異常系：トークンなし・検証失敗
//! - エッジケース：同一ユーザーの複数接続

use std::sync::Arc;

use crate::{
    common::time::get_jst_timestamp,
    domain::{
        AuthError, Connection, ConnectionIdFactory, OutboundSender, RoomRegistry, Timestamp,
        TokenVerifier, UserId,
    },
    infrastructure::dto::websocket::{FrameType, MemberInfo, ServerFrame},
};

use super::error::ConnectError;

/// 接続受付のユースケース
pub struct ConnectUserUseCase {
    /// Registry（データアクセス層の抽象化）
    registry: Arc<dyn RoomRegistry>,
    /// 資格情報の検証
    verifier: Arc<dyn TokenVerifier>,
}

impl ConnectUserUseCase {
    /// 新しい ConnectUserUseCase を作成
    pub fn new(registry: Arc<dyn RoomRegistry>, verifier: Arc<dyn TokenVerifier>) -> Self {
        Self { registry, verifier }
    }

    /// ハンドシェイクの資格情報を検証する
    ///
    /// 登録前に呼ばれるため、失敗しても状態は作られない。
    pub fn authenticate(&self, token: Option<&str>) -> Result<UserId, ConnectError> {
        let token = token.ok_or(ConnectError::Unauthorized(AuthError::MissingToken))?;
        Ok(self.verifier.verify(token)?)
    }

    /// 認証済みユーザーの接続を登録する
    ///
    /// # Arguments
    ///
    /// * `user_id` - `authenticate` で得たユーザー ID
    /// * `sender` - この接続への送信キュー
    ///
    /// # Returns
    ///
    /// * `Ok(Connection)` - 登録された接続（通知ルーム参加済み）
    /// * `Err(ConnectError)` - 登録失敗
    pub async fn execute(
        &self,
        user_id: UserId,
        sender: OutboundSender,
    ) -> Result<Connection, ConnectError> {
        let connected_at = get_jst_timestamp();
        let connection = Connection::new(
            ConnectionIdFactory::generate(),
            user_id,
            Timestamp::new(connected_at),
        );

        // Encode before registering so a failure leaves nothing behind.
        let info = MemberInfo {
            user_id: connection.user_id.to_string(),
            connection_id: connection.id.to_string(),
        };
        let frame = ServerFrame::new(
            FrameType::Connected,
            Some(connection.notification_room().to_string()),
            serde_json::to_value(info).map_err(|e| ConnectError::Encode(e.to_string()))?,
            connected_at,
        )
        .to_json()
        .map_err(|e| ConnectError::Encode(e.to_string()))?;

        self.registry
            .register_connection(connection.clone(), sender)
            .await
            .map_err(|e| ConnectError::Registration(e.to_string()))?;

        if let Err(e) = self.registry.send_to(&connection.id, &frame).await {
            tracing::warn!("Failed to send connected frame to '{}': {}", connection.id, e);
        }

        Ok(connection)
    }
}
