// src/utils/logging.rs
use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global `tracing` subscriber.
/// `RUST_LOG` wins when set; otherwise `default_level` applies to this crate
/// and everything else stays at `warn` so html5ever/reqwest do not flood batch runs.
pub fn setup_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,tenk_sections={}", default_level)));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Logging setup complete.");
}
