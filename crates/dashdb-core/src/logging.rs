//! Logging setup and segment prefixes.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing with dashdb defaults.
///
/// Sets up tracing-subscriber with:
/// - Environment filter (RUST_LOG)
/// - Compact format suitable for terminal output
pub fn init() {
    init_with_filter("info");
}

/// Initialize tracing with a custom default filter.
pub fn init_with_filter(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

/// Like [`init_with_filter`], but returns an error instead of panicking when a
/// global subscriber is already installed. Writes through the test harness
/// capture.
pub fn try_init(default_filter: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_test_writer())
        .try_init()
}

/// Segment prefixes for log lines.
pub mod prefix {
    /// Database operations prefix
    pub const DB: &str = "⊔";
}
