//! Realtime client and its connection driver.

use std::{sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use taskme_server::{
    domain::{RelayKind, RoomId},
    infrastructure::dto::websocket::{ClientFrame, ServerFrame},
};
use tokio::{net::TcpStream, sync::mpsc, task::JoinHandle};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{
        self, Message,
        client::IntoClientRequest,
        handshake::client::Request,
        http::{HeaderValue, StatusCode, header::AUTHORIZATION},
    },
};

use crate::{
    error::ClientError,
    subscription::{ClientEvent, EventType, Handlers, Subscription},
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(500);
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Client behaviour
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Ask the server to deliver our own events back to us
    pub echo: bool,
    /// Delay before the first reconnect attempt
    pub initial_backoff: Duration,
    /// Upper bound of the doubling delay
    pub max_backoff: Duration,
    /// Give up after this many failed attempts (`None` retries forever)
    pub max_attempts: Option<u32>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            echo: false,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            max_attempts: None,
        }
    }
}

impl ClientOptions {
    /// Delay before reconnect attempt `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1 << exponent)
            .min(self.max_backoff)
    }
}

enum Command {
    Send(String),
    Close,
}

/// One realtime session with the TaskMe server
pub struct RealtimeClient {
    commands: mpsc::UnboundedSender<Command>,
    handlers: Arc<Handlers>,
    driver: JoinHandle<()>,
    echo: bool,
}

impl RealtimeClient {
    /// Open the connection and start the driver task.
    ///
    /// The first handshake is performed here so rejected credentials surface
    /// as [`ClientError::Unauthorized`] instead of a reconnect loop.
    pub async fn connect(
        url: &str,
        token: &str,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        let ws = open(url, token).await?;
        tracing::info!("Connected to {}", url);

        let handlers = Arc::new(Handlers::default());
        let (commands, rx) = mpsc::unbounded_channel();
        let echo = options.echo;
        let driver = Driver {
            url: url.to_string(),
            token: token.to_string(),
            options,
            commands: rx,
            handlers: handlers.clone(),
        };
        let driver = tokio::spawn(driver.run(ws));

        Ok(Self {
            commands,
            handlers,
            driver,
            echo,
        })
    }

    pub fn join_room(&self, room_id: &str) -> Result<(), ClientError> {
        let room_id = parse_room(room_id)?;
        self.send_frame(&ClientFrame::Join {
            room_id: room_id.to_string(),
        })
    }

    pub fn leave_room(&self, room_id: &str) -> Result<(), ClientError> {
        let room_id = parse_room(room_id)?;
        self.send_frame(&ClientFrame::Leave {
            room_id: room_id.to_string(),
        })
    }

    /// Send an event to a task room the client has joined
    pub fn send(&self, room_id: &str, kind: RelayKind, payload: Value) -> Result<(), ClientError> {
        let room_id = parse_room(room_id)?.to_string();
        let echo = self.echo;
        let frame = match kind {
            RelayKind::ChatMessage => ClientFrame::ChatMessage {
                room_id,
                payload,
                echo,
            },
            RelayKind::TaskUpdated => ClientFrame::TaskUpdated {
                room_id,
                payload,
                echo,
            },
        };
        self.send_frame(&frame)
    }

    /// Register `callback` for `event_type`
    pub fn on<F>(&self, event_type: impl Into<EventType>, callback: F) -> Subscription
    where
        F: Fn(&ClientEvent) + Send + Sync + 'static,
    {
        self.handlers.subscribe(event_type.into(), Arc::new(callback))
    }

    /// Stop the driver without reconnecting and wait for it to finish
    pub async fn close(self) {
        let _ = self.commands.send(Command::Close);
        if let Err(e) = self.driver.await {
            tracing::warn!("Client driver ended abnormally: {}", e);
        }
    }

    fn send_frame(&self, frame: &ClientFrame) -> Result<(), ClientError> {
        let text = serde_json::to_string(frame).map_err(|e| ClientError::Encode(e.to_string()))?;
        self.commands
            .send(Command::Send(text))
            .map_err(|_| ClientError::Closed)
    }
}

fn parse_room(room_id: &str) -> Result<RoomId, ClientError> {
    room_id
        .parse()
        .map_err(|_| ClientError::InvalidRoom(room_id.to_string()))
}

fn build_request(url: &str, token: &str) -> Result<Request, ClientError> {
    let mut request = url
        .into_client_request()
        .map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
    let value = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|e| ClientError::InvalidToken(e.to_string()))?;
    request.headers_mut().insert(AUTHORIZATION, value);
    Ok(request)
}

async fn open(url: &str, token: &str) -> Result<WsStream, ClientError> {
    let request = build_request(url, token)?;
    match connect_async(request).await {
        Ok((ws, _)) => Ok(ws),
        Err(tungstenite::Error::Http(response)) if response.status() == StatusCode::UNAUTHORIZED => {
            Err(ClientError::Unauthorized)
        }
        Err(e) => Err(ClientError::Connect(e.to_string())),
    }
}

/// Why a connected session ended
enum SessionEnd {
    /// `close()` was called or the client was dropped
    Closed,
    /// The transport failed or the server hung up
    Lost,
}

struct Driver {
    url: String,
    token: String,
    options: ClientOptions,
    commands: mpsc::UnboundedReceiver<Command>,
    handlers: Arc<Handlers>,
}

impl Driver {
    async fn run(mut self, mut ws: WsStream) {
        loop {
            match self.session(&mut ws).await {
                SessionEnd::Closed => {
                    if let Err(e) = ws.close(None).await {
                        tracing::debug!("Close handshake failed: {}", e);
                    }
                    break;
                }
                SessionEnd::Lost => {
                    tracing::warn!("Connection to {} lost", self.url);
                    self.handlers.dispatch(&ClientEvent::Disconnected);
                }
            }

            match self.reconnect().await {
                Some((new_ws, attempt)) => {
                    ws = new_ws;
                    tracing::info!("Reconnected to {} after {} attempt(s)", self.url, attempt);
                    self.handlers.dispatch(&ClientEvent::Reconnected { attempt });
                }
                None => break,
            }
        }

        self.handlers.dispatch(&ClientEvent::Closed);
        tracing::info!("Client driver stopped");
    }

    /// Pump frames in both directions until the session ends
    async fn session(&mut self, ws: &mut WsStream) -> SessionEnd {
        loop {
            tokio::select! {
                incoming = ws.next() => match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ServerFrame>(text.as_str()) {
                            Ok(frame) => self.handlers.dispatch(&ClientEvent::Frame(frame)),
                            Err(e) => tracing::warn!("Ignoring unparsable frame: {}", e),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => return SessionEnd::Lost,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!("WebSocket error: {}", e);
                        return SessionEnd::Lost;
                    }
                },
                command = self.commands.recv() => match command {
                    Some(Command::Send(text)) => {
                        if let Err(e) = ws.send(Message::Text(text.into())).await {
                            tracing::warn!("Failed to send frame: {}", e);
                            return SessionEnd::Lost;
                        }
                    }
                    Some(Command::Close) | None => return SessionEnd::Closed,
                },
            }
        }
    }

    /// Reconnect with capped exponential backoff.
    ///
    /// Frames submitted while disconnected are dropped. Returns `None` when the
    /// client is closed, the credentials are rejected or attempts run out.
    async fn reconnect(&mut self) -> Option<(WsStream, u32)> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            if let Some(max) = self.options.max_attempts
                && attempt > max
            {
                tracing::error!("Giving up after {} reconnect attempt(s)", max);
                return None;
            }

            let delay = self.options.backoff(attempt);
            tracing::debug!("Reconnect attempt {} in {:?}", attempt, delay);
            let sleep = tokio::time::sleep(delay);
            tokio::pin!(sleep);
            loop {
                tokio::select! {
                    _ = &mut sleep => break,
                    command = self.commands.recv() => match command {
                        Some(Command::Send(_)) => {
                            tracing::warn!("Not connected, dropping outgoing frame");
                        }
                        Some(Command::Close) | None => return None,
                    },
                }
            }

            match open(&self.url, &self.token).await {
                Ok(ws) => return Some((ws, attempt)),
                Err(ClientError::Unauthorized) => {
                    tracing::error!("Credentials rejected on reconnect, stopping");
                    return None;
                }
                Err(e) => tracing::warn!("Reconnect attempt {} failed: {}", attempt, e),
            }
        }
    }
}
