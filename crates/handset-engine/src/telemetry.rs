//! Tracing setup.
//!
//! ## Log Levels
//! - `RUST_LOG=debug` - Show debug messages everywhere
//! - `RUST_LOG=handset=trace` - Trace the handset crates only
//! - Default: [`DEFAULT_FILTER`], or the configured `[logging] filter`

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "info,handset=debug,sqlx=warn";

/// Installs the global fmt subscriber. `RUST_LOG` wins over `configured`.
///
/// Returns `false` when a subscriber was already installed (tests, or a host
/// application that set up its own).
pub fn init_tracing(configured: Option<&str>) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(configured.unwrap_or(DEFAULT_FILTER)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}
