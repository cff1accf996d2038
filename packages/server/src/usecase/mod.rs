//! UseCase 層
//!
//! ビジネスロジックを実装するレイヤー。
//! UI 層から呼び出され、Domain 層を操作します。

pub mod connect_user;
pub mod disconnect_connection;
pub mod error;
pub mod join_room;
pub mod leave_room;
pub mod publish_notification;
pub mod relay_event;

pub use connect_user::ConnectUserUseCase;
pub use disconnect_connection::DisconnectConnectionUseCase;
pub use error::{ConnectError, DisconnectError, JoinRoomError, LeaveRoomError, RelayError};
pub use join_room::{JoinOutcome, JoinRoomUseCase};
pub use leave_room::LeaveRoomUseCase;
pub use publish_notification::PublishNotificationUseCase;
pub use relay_event::RelayEventUseCase;
