//! Event callbacks keyed by event type.
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - Handlers::subscribe() / dispatch() と Subscription::unsubscribe()
//!
//! ### なぜこのテストが必要か
//! - unsubscribe 後はコールバックが呼ばれないこと
//! - 同じイベント種別に複数のコールバックを登録できること
//!
//! ### どのような状況を想定しているか
//! - 正常系：登録・配信・解除
//! - エッジケース：クライアント破棄後の unsubscribe

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, PoisonError, Weak,
        atomic::{AtomicU64, Ordering},
    },
};

use taskme_server::infrastructure::dto::websocket::{FrameType, ServerFrame};

/// Kind of event a callback is registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// A frame pushed by the server
    Frame(FrameType),
    /// The transport dropped; the driver is about to reconnect
    Disconnected,
    /// The driver re-established the connection. Rooms are not re-joined.
    Reconnected,
    /// The driver stopped for good (closed, rejected or out of attempts)
    Closed,
}

impl From<FrameType> for EventType {
    fn from(frame_type: FrameType) -> Self {
        Self::Frame(frame_type)
    }
}

/// Event handed to callbacks
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Frame(ServerFrame),
    Disconnected,
    Reconnected { attempt: u32 },
    Closed,
}

impl ClientEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            Self::Frame(frame) => EventType::Frame(frame.r#type),
            Self::Disconnected => EventType::Disconnected,
            Self::Reconnected { .. } => EventType::Reconnected,
            Self::Closed => EventType::Closed,
        }
    }
}

pub(crate) type Callback = Arc<dyn Fn(&ClientEvent) + Send + Sync>;

/// Registered callbacks, shared between the client and its driver task
#[derive(Default)]
pub(crate) struct Handlers {
    next_id: AtomicU64,
    callbacks: Mutex<HashMap<EventType, Vec<(u64, Callback)>>>,
}

impl Handlers {
    pub(crate) fn subscribe(self: &Arc<Self>, event_type: EventType, callback: Callback) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event_type)
            .or_default()
            .push((id, callback));

        Subscription {
            id,
            event_type,
            handlers: Arc::downgrade(self),
        }
    }

    fn remove(&self, event_type: EventType, id: u64) {
        let mut callbacks = self.callbacks.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(list) = callbacks.get_mut(&event_type) {
            list.retain(|(callback_id, _)| *callback_id != id);
            if list.is_empty() {
                callbacks.remove(&event_type);
            }
        }
    }

    /// Invoke every callback registered for the event's type
    pub(crate) fn dispatch(&self, event: &ClientEvent) {
        // Callbacks run outside the lock so they may subscribe or unsubscribe.
        let targets: Vec<Callback> = self
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event.event_type())
            .map(|list| list.iter().map(|(_, callback)| callback.clone()).collect())
            .unwrap_or_default();

        for callback in targets {
            callback(event);
        }
    }

    #[cfg(test)]
    fn count(&self, event_type: EventType) -> usize {
        self.callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event_type)
            .map_or(0, Vec::len)
    }
}

/// Handle returned by [`crate::RealtimeClient::on`]
#[must_use = "dropping a Subscription keeps the callback registered; call unsubscribe() to remove it"]
pub struct Subscription {
    id: u64,
    event_type: EventType,
    handlers: Weak<Handlers>,
}

impl Subscription {
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// Remove the callback. No-op if the client is already gone.
    pub fn unsubscribe(self) {
        if let Some(handlers) = self.handlers.upgrade() {
            handlers.remove(self.event_type, self.id);
        }
    }
}
