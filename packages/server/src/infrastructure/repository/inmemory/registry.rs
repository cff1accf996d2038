//! InMemory Room Registry 実装
//!
//! ドメイン層が定義する RoomRegistry trait の具体的な実装。
//! 接続とルームのメンバーシップを HashMap で保持し、単一の Mutex で
//! 全ての変更と配信を直列化します（イベントループ相当）。

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    Connection, ConnectionId, DEFAULT_ROOM_CAPACITY, JoinFrames, Member, OutboundSender,
    RepositoryError, Room, RoomId, RoomRegistry, Timestamp,
};

/// A live connection plus everything needed to reach it
struct ConnectionEntry {
    connection: Connection,
    sender: OutboundSender,
    rooms: BTreeSet<RoomId>,
}

#[derive(Default)]
struct RegistryState {
    connections: HashMap<ConnectionId, ConnectionEntry>,
    rooms: HashMap<RoomId, Room>,
}

impl RegistryState {
    /// Remove a membership from the room side, dropping the room once empty.
    fn detach(&mut self, connection_id: &ConnectionId, room_id: &RoomId) -> bool {
        let Some(room) = self.rooms.get_mut(room_id) else {
            return false;
        };
        let removed = room.remove_member(connection_id).is_some();
        if room.is_empty() {
            self.rooms.remove(room_id);
        }
        removed
    }

    /// Queue `frame` for every member of `room_id` except `exclude`.
    fn fan_out(
        &self,
        room_id: &RoomId,
        exclude: Option<&ConnectionId>,
        frame: &str,
    ) -> Vec<ConnectionId> {
        let Some(room) = self.rooms.get(room_id) else {
            return Vec::new();
        };

        let mut delivered = Vec::with_capacity(room.members.len());
        for member in &room.members {
            if exclude == Some(&member.connection_id) {
                continue;
            }
            let Some(entry) = self.connections.get(&member.connection_id) else {
                continue;
            };
            if entry.sender.send(frame.to_string()).is_err() {
                tracing::warn!(
                    "Failed to deliver to connection '{}' in room '{}'",
                    member.connection_id,
                    room_id
                );
                continue;
            }
            delivered.push(member.connection_id.clone());
        }
        delivered
    }
}

/// インメモリ Room Registry 実装
///
/// ドメイン層の RoomRegistry trait を実装します（依存性の逆転）。
pub struct InMemoryRoomRegistry {
    state: Mutex<RegistryState>,
    /// Maximum members per task room
    room_capacity: usize,
}

impl InMemoryRoomRegistry {
    /// 新しい InMemoryRoomRegistry を作成
    pub fn new(room_capacity: usize) -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            room_capacity,
        }
    }
}

impl Default for InMemoryRoomRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_ROOM_CAPACITY)
    }
}

#[async_trait]
impl RoomRegistry for InMemoryRoomRegistry {
    async fn register_connection(
        &self,
        connection: Connection,
        sender: OutboundSender,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        if state.connections.contains_key(&connection.id) {
            return Err(RepositoryError::DuplicateConnection(
                connection.id.to_string(),
            ));
        }

        let notification_room = connection.notification_room();
        state
            .rooms
            .entry(notification_room.clone())
            .or_insert_with(|| Room::new(notification_room.clone(), self.room_capacity))
            .add_member(Member::new(
                connection.id.clone(),
                connection.user_id.clone(),
                connection.connected_at,
            ))?;

        state.connections.insert(
            connection.id.clone(),
            ConnectionEntry {
                connection,
                sender,
                rooms: BTreeSet::from([notification_room]),
            },
        );
        Ok(())
    }

    async fn unregister_connection(
        &self,
        connection_id: &ConnectionId,
    ) -> Result<(Connection, Vec<RoomId>), RepositoryError> {
        let mut state = self.state.lock().await;
        let entry = state
            .connections
            .remove(connection_id)
            .ok_or_else(|| RepositoryError::ConnectionNotFound(connection_id.to_string()))?;

        for room_id in &entry.rooms {
            state.detach(connection_id, room_id);
        }

        Ok((entry.connection, entry.rooms.into_iter().collect()))
    }

    async fn get_connection(
        &self,
        connection_id: &ConnectionId,
    ) -> Result<Connection, RepositoryError> {
        let state = self.state.lock().await;
        state
            .connections
            .get(connection_id)
            .map(|entry| entry.connection.clone())
            .ok_or_else(|| RepositoryError::ConnectionNotFound(connection_id.to_string()))
    }

    async fn join_room(
        &self,
        connection_id: &ConnectionId,
        room_id: &RoomId,
        joined_at: Timestamp,
        frames: JoinFrames<'_>,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state.lock().await;
        let user_id = state
            .connections
            .get(connection_id)
            .map(|entry| entry.connection.user_id.clone())
            .ok_or_else(|| RepositoryError::ConnectionNotFound(connection_id.to_string()))?;

        // Validate against the room before touching the connection side so a
        // rejected join leaves no partial state behind.
        let joined = match state.rooms.get_mut(room_id) {
            Some(room) => room.add_member(Member::new(connection_id.clone(), user_id, joined_at))?,
            None => {
                let mut room = Room::new(room_id.clone(), self.room_capacity);
                room.add_member(Member::new(connection_id.clone(), user_id, joined_at))?;
                state.rooms.insert(room_id.clone(), room);
                true
            }
        };

        if joined && let Some(entry) = state.connections.get_mut(connection_id) {
            entry.rooms.insert(room_id.clone());
        }

        let Some(room) = state.rooms.get(room_id) else {
            return Ok(joined);
        };
        let notices = frames(room, joined);
        if joined && let Some(frame) = notices.to_others {
            state.fan_out(room_id, Some(connection_id), &frame);
        }
        if let Some(frame) = notices.to_joiner
            && let Some(entry) = state.connections.get(connection_id)
            && entry.sender.send(frame).is_err()
        {
            tracing::warn!("Failed to send join acknowledgement to '{}'", connection_id);
        }
        Ok(joined)
    }

    async fn leave_room(
        &self,
        connection_id: &ConnectionId,
        room_id: &RoomId,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state.lock().await;
        let entry = state
            .connections
            .get_mut(connection_id)
            .ok_or_else(|| RepositoryError::ConnectionNotFound(connection_id.to_string()))?;
        if !entry.rooms.remove(room_id) {
            return Ok(false);
        }
        Ok(state.detach(connection_id, room_id))
    }

    async fn is_member(&self, connection_id: &ConnectionId, room_id: &RoomId) -> bool {
        let state = self.state.lock().await;
        state
            .connections
            .get(connection_id)
            .is_some_and(|entry| entry.rooms.contains(room_id))
    }

    async fn get_room(&self, room_id: &RoomId) -> Option<Room> {
        let state = self.state.lock().await;
        state.rooms.get(room_id).cloned()
    }

    async fn list_rooms(&self) -> Vec<Room> {
        let state = self.state.lock().await;
        let mut rooms: Vec<Room> = state.rooms.values().cloned().collect();
        rooms.sort_by(|a, b| a.id.cmp(&b.id));
        rooms
    }

    async fn deliver(
        &self,
        room_id: &RoomId,
        exclude: Option<&ConnectionId>,
        frame: &str,
    ) -> Vec<ConnectionId> {
        let state = self.state.lock().await;
        state.fan_out(room_id, exclude, frame)
    }

    async fn send_to(
        &self,
        connection_id: &ConnectionId,
        frame: &str,
    ) -> Result<(), RepositoryError> {
        let state = self.state.lock().await;
        let entry = state
            .connections
            .get(connection_id)
            .ok_or_else(|| RepositoryError::ConnectionNotFound(connection_id.to_string()))?;
        entry
            .sender
            .send(frame.to_string())
            .map_err(|_| RepositoryError::ChannelClosed(connection_id.to_string()))
    }

    async fn count_connections(&self) -> usize {
        let state = self.state.lock().await;
        state.connections.len()
    }
}
