//! TaskMe realtime CLI client.
//!
//! Joins one task room, prints every frame it receives and sends each typed
//! line as a `chat-message`. Type `/quit` to exit.
//!
//! Run with:
//! ```not_rust
//! TASKME_TOKEN=<jwt> cargo run --bin taskme-client -- --task 42
//! ```

use clap::Parser;
use rustyline::{DefaultEditor, error::ReadlineError};
use serde_json::json;
use taskme_client::{ClientEvent, ClientOptions, EventType, RealtimeClient};
use taskme_server::{
    domain::RelayKind,
    infrastructure::dto::websocket::{FrameType, ServerFrame},
};
use taskme_shared::{logger::setup_logger, time::timestamp_to_jst_rfc3339};
use tokio::sync::mpsc;

/// TaskMe realtime CLI client
#[derive(Debug, Parser)]
#[command(name = "taskme-client", version, about)]
struct Args {
    /// WebSocket endpoint of the relay server
    #[arg(long, env = "TASKME_URL", default_value = "ws://127.0.0.1:8080/ws")]
    url: String,

    /// Bearer token issued by the authentication service
    #[arg(long, env = "TASKME_TOKEN", hide_env_values = true)]
    token: String,

    /// Task whose room to join
    #[arg(short, long)]
    task: String,

    /// Receive our own messages back from the server
    #[arg(long)]
    echo: bool,

    /// Give up after this many reconnect attempts
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Default log level when RUST_LOG is not set
    #[arg(long, env = "TASKME_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

enum Input {
    Line(String),
    Quit,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    let options = ClientOptions {
        echo: args.echo,
        max_attempts: args.max_attempts,
        ..ClientOptions::default()
    };
    let client = match RealtimeClient::connect(&args.url, &args.token, options).await {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to connect: {}", e);
            std::process::exit(1);
        }
    };

    let room_id = format!("task-{}", args.task);
    let _subscriptions: Vec<_> = [
        FrameType::Connected,
        FrameType::RoomJoined,
        FrameType::RoomLeft,
        FrameType::ChatMessage,
        FrameType::TaskUpdated,
        FrameType::MemberJoined,
        FrameType::MemberLeft,
        FrameType::Notification,
        FrameType::Error,
    ]
    .into_iter()
    .map(|frame_type| {
        client.on(frame_type, |event| {
            if let ClientEvent::Frame(frame) = event {
                print_frame(frame);
            }
        })
    })
    .collect();

    // Rooms are not restored by the client; re-join from the main loop.
    let (rejoin_tx, mut rejoin_rx) = mpsc::unbounded_channel::<()>();
    let _reconnected = client.on(EventType::Reconnected, move |event| {
        if let ClientEvent::Reconnected { attempt } = event {
            println!("* reconnected (attempt {})", attempt);
        }
        let _ = rejoin_tx.send(());
    });
    let (closed_tx, mut closed_rx) = mpsc::unbounded_channel::<()>();
    let _closed = client.on(EventType::Closed, move |_| {
        let _ = closed_tx.send(());
    });
    let _disconnected = client.on(EventType::Disconnected, |_| {
        println!("* connection lost, reconnecting...");
    });

    if let Err(e) = client.join_room(&room_id) {
        eprintln!("Failed to join {}: {}", room_id, e);
        std::process::exit(1);
    }

    // rustyline blocks, so read lines on a blocking thread
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<Input>();
    tokio::task::spawn_blocking(move || read_lines(input_tx));

    let exit_code = loop {
        tokio::select! {
            input = input_rx.recv() => match input {
                Some(Input::Line(line)) => {
                    if let Err(e) = client.send(&room_id, RelayKind::ChatMessage, json!({"text": line})) {
                        eprintln!("Failed to send: {}", e);
                    }
                }
                Some(Input::Quit) | None => break 0,
            },
            Some(()) = rejoin_rx.recv() => {
                if let Err(e) = client.join_room(&room_id) {
                    eprintln!("Failed to re-join {}: {}", room_id, e);
                }
            },
            _ = closed_rx.recv() => {
                eprintln!("Connection closed");
                break 1;
            },
        }
    };

    client.close().await;
    // The line editor thread may still be blocked on input.
    std::process::exit(exit_code);
}

fn read_lines(tx: mpsc::UnboundedSender<Input>) {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("Failed to start line editor: {}", e);
            let _ = tx.send(Input::Quit);
            return;
        }
    };

    loop {
        match editor.readline("> ") {
            Ok(line) => {
                let line = line.trim();
                if line == "/quit" {
                    let _ = tx.send(Input::Quit);
                    return;
                }
                if line.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line);
                if tx.send(Input::Line(line.to_string())).is_err() {
                    return;
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                let _ = tx.send(Input::Quit);
                return;
            }
            Err(e) => {
                eprintln!("Input error: {}", e);
                let _ = tx.send(Input::Quit);
                return;
            }
        }
    }
}

fn print_frame(frame: &ServerFrame) {
    let time = timestamp_to_jst_rfc3339(frame.timestamp);
    let room = frame.room_id.as_deref().unwrap_or("-");
    match (frame.r#type, frame.sender_id.as_deref()) {
        (FrameType::ChatMessage, Some(sender)) => {
            let text = frame
                .payload
                .get("text")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| frame.payload.to_string());
            println!("[{}] {} {}: {}", time, room, sender, text);
        }
        (frame_type, _) => {
            println!("[{}] {} {:?} {}", time, room, frame_type, frame.payload);
        }
    }
}
