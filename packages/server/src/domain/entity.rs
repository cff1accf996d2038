//! Core domain models for the realtime layer.

use super::{
    error::RoomError,
    value_object::{ConnectionId, RoomId, Timestamp, UserId},
};

/// Default maximum number of connections allowed in a task room
pub const DEFAULT_ROOM_CAPACITY: usize = 100;

/// An authenticated WebSocket connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    /// Connection identifier
    pub id: ConnectionId,
    /// Owning user (from the handshake credential)
    pub user_id: UserId,
    /// Timestamp when the handshake completed
    pub connected_at: Timestamp,
}

impl Connection {
    /// Create a new connection
    pub fn new(id: ConnectionId, user_id: UserId, connected_at: Timestamp) -> Self {
        Self {
            id,
            user_id,
            connected_at,
        }
    }

    /// The private notification room this connection always belongs to
    pub fn notification_room(&self) -> RoomId {
        RoomId::user(self.user_id.clone())
    }
}

/// A connection's membership in a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub connection_id: ConnectionId,
    pub user_id: UserId,
    pub joined_at: Timestamp,
}

impl Member {
    pub fn new(connection_id: ConnectionId, user_id: UserId, joined_at: Timestamp) -> Self {
        Self {
            connection_id,
            user_id,
            joined_at,
        }
    }
}

/// A broadcast group keyed by task id or user id.
///
/// Rooms only exist while they have members; the registry drops them as soon
/// as the last member leaves.
#[derive(Debug, Clone)]
pub struct Room {
    /// Room identifier
    pub id: RoomId,
    /// Members in join order
    pub members: Vec<Member>,
    /// Maximum number of members allowed
    pub capacity: usize,
}

impl Room {
    /// Create a new empty room.
    ///
    /// Notification rooms are never capped: every connection of the owning
    /// user must be able to join.
    pub fn new(id: RoomId, capacity: usize) -> Self {
        let capacity = if id.is_task_room() {
            capacity
        } else {
            usize::MAX
        };
        Self {
            id,
            members: Vec::new(),
            capacity,
        }
    }

    /// Add a member to the room.
    ///
    /// Returns `Ok(false)` when the connection is already a member.
    ///
    /// # Errors
    ///
    /// Returns `RoomError::CapacityExceeded` if the room is at full capacity
    pub fn add_member(&mut self, member: Member) -> Result<bool, RoomError> {
        if self.contains(&member.connection_id) {
            return Ok(false);
        }
        if self.members.len() >= self.capacity {
            return Err(RoomError::CapacityExceeded {
                capacity: self.capacity,
                current: self.members.len(),
            });
        }
        self.members.push(member);
        Ok(true)
    }

    /// Remove a member. Returns the removed membership, if any.
    pub fn remove_member(&mut self, connection_id: &ConnectionId) -> Option<Member> {
        let index = self
            .members
            .iter()
            .position(|m| &m.connection_id == connection_id)?;
        Some(self.members.remove(index))
    }

    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.members.iter().any(|m| &m.connection_id == connection_id)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Distinct user ids of the members, sorted
    pub fn user_ids(&self) -> Vec<UserId> {
        let mut users: Vec<UserId> = self.members.iter().map(|m| m.user_id.clone()).collect();
        users.sort();
        users.dedup();
        users
    }
}
