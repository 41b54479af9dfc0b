//! Tracing/logging setup for binaries and tests that embed the patchlog crates.
//!
//! The library crates only emit `tracing` events; installing a subscriber is
//! left to the process, through [`init`] or [`init_with`].

/// Initialize process-wide logging from the environment.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init_with(tracing::LogConfig::from_env());
}

/// Initialize process-wide logging with an explicit configuration.
pub fn init_with(config: LogConfig) {
    tracing::init_with(config);
}

/// Subscriber configuration (filters, output format).
pub mod tracing;

pub use self::tracing::{ENV_LOG_FORMAT, LogConfig, LogFormat};
