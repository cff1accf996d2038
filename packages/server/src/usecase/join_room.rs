//! UseCase: ルーム参加処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - JoinRoomUseCase::execute() メソッド
//!
//! ### なぜこのテストが必要か
//! - 既存メンバーに member-joined が一度だけ通知されること（冪等性）
//! - 他人の通知ルームに参加できないこと
//!
//! ### どのような状況を想定しているか
//! - 正常系：タスクルームへの参加と通知
//! - 異常系：他ユーザーの通知ルーム・容量超過
//! - エッジケース：二重参加

use std::sync::Arc;

use crate::{
    common::time::get_jst_timestamp,
    domain::{ConnectionId, JoinFrames, JoinNotices, Room, RoomId, RoomRegistry, Timestamp},
    infrastructure::dto::websocket::{FrameType, MemberInfo, RoomMembersPayload, ServerFrame},
};

use super::error::JoinRoomError;

/// Result of a join request
#[derive(Debug, Clone, PartialEq)]
pub struct JoinOutcome {
    /// `false` when the connection was already a member
    pub newly_joined: bool,
    /// Members after the join, sorted by connection id
    pub members: Vec<MemberInfo>,
}

/// ルーム参加のユースケース
pub struct JoinRoomUseCase {
    registry: Arc<dyn RoomRegistry>,
}

impl JoinRoomUseCase {
    /// 新しい JoinRoomUseCase を作成
    pub fn new(registry: Arc<dyn RoomRegistry>) -> Self {
        Self { registry }
    }

    /// ルーム参加を実行
    ///
    /// 新規参加の場合のみ既存メンバーへ member-joined を配信し、
    /// 参加者本人には常に room-joined（メンバー一覧）を返す。
    /// どちらのフレームも参加と同じロック内でキューに入るため、
    /// 参加者には room-joined より先にルームのイベントが届くことはない。
    pub async fn execute(
        &self,
        connection_id: &ConnectionId,
        room_id: &RoomId,
    ) -> Result<JoinOutcome, JoinRoomError> {
        let connection = self.registry.get_connection(connection_id).await?;

        if let RoomId::User(_) = room_id
            && !room_id.is_notification_room_of(&connection.user_id)
        {
            return Err(JoinRoomError::Forbidden(room_id.to_string()));
        }

        let timestamp = get_jst_timestamp();
        let joined = MemberInfo {
            user_id: connection.user_id.to_string(),
            connection_id: connection_id.to_string(),
        };
        let announcement = ServerFrame::new(
            FrameType::MemberJoined,
            Some(room_id.to_string()),
            serde_json::to_value(joined).map_err(|e| JoinRoomError::Encode(e.to_string()))?,
            timestamp,
        )
        .to_json()
        .map_err(|e| JoinRoomError::Encode(e.to_string()))?;

        let mut members = Vec::new();
        let mut encode_error = None;
        let room_name = room_id.to_string();
        let frames: JoinFrames<'_> = Box::new(|room, _| {
            members = member_list(room);
            let ack = serde_json::to_value(RoomMembersPayload {
                members: members.clone(),
            })
            .and_then(|payload| {
                ServerFrame::new(FrameType::RoomJoined, Some(room_name), payload, timestamp)
                    .to_json()
            });
            let to_joiner = match ack {
                Ok(ack) => Some(ack),
                Err(e) => {
                    encode_error = Some(e.to_string());
                    None
                }
            };
            JoinNotices {
                to_others: Some(announcement),
                to_joiner,
            }
        });

        let newly_joined = self
            .registry
            .join_room(connection_id, room_id, Timestamp::new(timestamp), frames)
            .await?;
        if let Some(e) = encode_error {
            return Err(JoinRoomError::Encode(e));
        }

        tracing::debug!(
            "Connection '{}' joined '{}' (new: {}, members: {})",
            connection_id,
            room_id,
            newly_joined,
            members.len()
        );

        Ok(JoinOutcome {
            newly_joined,
            members,
        })
    }
}

/// メンバー一覧を構築（connection_id でソート済み）
fn member_list(room: &Room) -> Vec<MemberInfo> {
    let mut members: Vec<MemberInfo> = room
        .members
        .iter()
        .map(|m| MemberInfo {
            user_id: m.user_id.to_string(),
            connection_id: m.connection_id.to_string(),
        })
        .collect();
    members.sort_by(|a, b| a.connection_id.cmp(&b.connection_id));
    members
}
