//! # Tracing Setup
//!
//! ## Log Levels
//! - `RUST_LOG=debug` - Show debug messages
//! - `RUST_LOG=jazzy=trace` - Show trace for jazzy crates only
//! - Default: `info,jazzy=debug,sqlx=warn`

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "info,jazzy=debug,sqlx=warn";

/// Installs the global fmt subscriber. Later calls are no-ops.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
