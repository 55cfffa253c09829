//! Logging setup and convenience wrappers.
//!
//! Thin wrappers around tracing macros used throughout the crate.

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber.
///
/// `RUST_LOG` wins over `default_level` when set. Calling this twice is a
/// no-op apart from the returned error.
pub fn init_logging(default_level: &str) -> Result<(), String> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| format!("Invalid log filter '{}': {}", default_level, e))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| format!("Logger already initialized: {}", e))
}

pub(crate) fn log_info(message: &str) {
    info!("{}", message);
}

pub(crate) fn log_warn(message: &str) {
    warn!("{}", message);
}

pub(crate) fn log_error(message: &str) {
    error!("{}", message);
}
