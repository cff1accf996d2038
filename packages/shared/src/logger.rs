//! Logger setup shared by the server and client binaries.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_level` is applied to the
/// workspace crates and `warn` to everything else.
///
/// # Arguments
///
/// * `bin_name` - Name of the running binary, logged once at startup
/// * `default_level` - Level used when `RUST_LOG` is not set (e.g. `"debug"`)
pub fn setup_logger(bin_name: &str, default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,taskme_server={level},taskme_client={level},taskme_shared={level},tower_http={level}",
            level = default_level
        ))
    });

    // A second call (e.g. from tests) must not panic.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init();

    tracing::debug!("Logger initialized for '{}'", bin_name);
}
