//! Room registry trait (data access abstraction).
//!
//! The usecase layer depends on this trait; the concrete in-memory
//! implementation lives in the infrastructure layer.

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

use super::{Connection, ConnectionId, RepositoryError, Room, RoomId, Timestamp};

/// Per-connection outbound queue of encoded frames
pub type OutboundSender = UnboundedSender<String>;

/// Builds the frames announcing a join from the room as it stands right after
/// the join. The second argument is `true` when the membership is new.
///
/// Called while the registry is still locked, so nothing delivered to the
/// room afterwards can overtake these frames.
pub type JoinFrames<'a> = Box<dyn FnOnce(&Room, bool) -> JoinNotices + Send + 'a>;

/// Frames queued atomically with a join
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinNotices {
    /// For every other member; only sent when the membership is new
    pub to_others: Option<String>,
    /// For the joining connection
    pub to_joiner: Option<String>,
}

/// Tracks live connections and their room memberships.
///
/// Every method is atomic with respect to the others, so a connection that
/// has left a room is never selected by a later [`RoomRegistry::deliver`].
#[async_trait]
pub trait RoomRegistry: Send + Sync {
    /// Register an authenticated connection together with its notification
    /// room membership.
    async fn register_connection(
        &self,
        connection: Connection,
        sender: OutboundSender,
    ) -> Result<(), RepositoryError>;

    /// Remove a connection from every room it belongs to.
    ///
    /// Returns the connection and the rooms it was removed from (sorted).
    async fn unregister_connection(
        &self,
        connection_id: &ConnectionId,
    ) -> Result<(Connection, Vec<RoomId>), RepositoryError>;

    async fn get_connection(&self, connection_id: &ConnectionId)
    -> Result<Connection, RepositoryError>;

    /// Add a membership and queue the frames built by `frames`.
    ///
    /// Returns `Ok(false)` if the connection was already a member.
    async fn join_room(
        &self,
        connection_id: &ConnectionId,
        room_id: &RoomId,
        joined_at: Timestamp,
        frames: JoinFrames<'_>,
    ) -> Result<bool, RepositoryError>;

    /// Remove a membership. Returns `Ok(false)` if the connection was not a member.
    async fn leave_room(
        &self,
        connection_id: &ConnectionId,
        room_id: &RoomId,
    ) -> Result<bool, RepositoryError>;

    async fn is_member(&self, connection_id: &ConnectionId, room_id: &RoomId) -> bool;

    async fn get_room(&self, room_id: &RoomId) -> Option<Room>;

    /// All rooms that currently have members, sorted by id
    async fn list_rooms(&self) -> Vec<Room>;

    /// Push `frame` to every member of `room_id` except `exclude`.
    ///
    /// Returns the connections the frame was queued for. A closed queue is
    /// skipped without affecting the other members.
    async fn deliver(
        &self,
        room_id: &RoomId,
        exclude: Option<&ConnectionId>,
        frame: &str,
    ) -> Vec<ConnectionId>;

    /// Push `frame` to a single connection.
    async fn send_to(&self, connection_id: &ConnectionId, frame: &str)
    -> Result<(), RepositoryError>;

    async fn count_connections(&self) -> usize;
}
