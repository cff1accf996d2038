//! TaskMe realtime relay server.
//!
//! Run with:
//! ```not_rust
//! TASKME_JWT_SECRET=change-me TASKME_PUBLISH_SECRET=change-me-too cargo run --bin taskme-server
//! ```

use clap::Parser;
use taskme_server::ServerConfig;
use taskme_shared::logger::setup_logger;

#[tokio::main]
async fn main() {
    let config = ServerConfig::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &config.log_level);

    // Run the server
    if let Err(e) = taskme_server::run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
