//! Structured logging setup.
//!
//! Services embedding the engine call [`init_logging`] once at startup.
//! `RUST_LOG` wins when set; otherwise the supplied default directive is
//! used (e.g. `"info"` or `"info,rollcall_engine=debug"`). JSON output is
//! meant for log aggregation; the human format for local development.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format for structured logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Human,
    Json,
}

/// Install the global tracing subscriber.
///
/// # Panics
///
/// Panics if a global subscriber was already installed in this process.
pub fn init_logging(format: LogFormat, default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Human => registry.with(fmt::layer().with_target(true)).init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().flatten_event(true).with_target(true))
            .init(),
    }
}
