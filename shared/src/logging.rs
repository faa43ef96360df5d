//! Shared logging utilities for consistent tracing across the workspace

use chrono::{DateTime, Utc};
use tracing::{error, info};

/// Crates whose events pass the level filter
const WORKSPACE_CRATES: &[&str] = &["supervisor", "webserver", "shared"];

/// Build the filter directive string for a base level
///
/// Workspace crates log at `base_level`, the HTTP stack stays at `warn` so
/// request noise does not drown channel transitions.
pub fn filter_directives(base_level: &str) -> String {
    let mut directives: Vec<String> = WORKSPACE_CRATES
        .iter()
        .map(|krate| format!("{krate}={base_level}"))
        .collect();
    directives.push("tower_http=warn".to_string());
    directives.push("hyper=warn".to_string());
    directives.push("axum=warn".to_string());
    directives.join(",")
}

/// Initialize the tracing subscriber with the given log level
///
/// `RUST_LOG` takes precedence when it is set.
pub fn init_tracing(log_level: Option<&str>) {
    use tracing_subscriber::{fmt, EnvFilter};

    let base_level = log_level.unwrap_or("info");
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_directives(base_level)));

    // A second init (tests, embedding) keeps the first subscriber
    let _ = fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}

/// Get formatted timestamp for consistent logging
pub fn format_timestamp() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.format("%H:%M:%S%.3f").to_string()
}

/// Macro for channel-aware info logging
#[macro_export]
macro_rules! channel_info {
    ($channel:expr, $($arg:tt)*) => {
        tracing::info!(
            channel = %$channel,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for channel-aware warning logging
#[macro_export]
macro_rules! channel_warn {
    ($channel:expr, $($arg:tt)*) => {
        tracing::warn!(
            channel = %$channel,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for channel-aware error logging
#[macro_export]
macro_rules! channel_error {
    ($channel:expr, $($arg:tt)*) => {
        tracing::error!(
            channel = %$channel,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for channel-aware debug logging
#[macro_export]
macro_rules! channel_debug {
    ($channel:expr, $($arg:tt)*) => {
        tracing::debug!(
            channel = %$channel,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Contextual logging helper for startup messages
pub fn log_startup(component: &str, details: &str) {
    info!(
        component = component,
        timestamp = format_timestamp(),
        "🚀 Starting {}",
        details
    );
}

/// Contextual logging helper for shutdown messages
pub fn log_shutdown(component: &str, reason: &str) {
    info!(
        component = component,
        timestamp = format_timestamp(),
        "🛑 Shutting down: {}",
        reason
    );
}

/// Contextual logging helper for error conditions
pub fn log_error(component: &str, context: &str, error: &dyn std::fmt::Display) {
    error!(
        component = component,
        timestamp = format_timestamp(),
        error = %error,
        "❌ {} failed: {}",
        context,
        error
    );
}

/// Contextual logging helper for success conditions
pub fn log_success(component: &str, message: &str) {
    info!(
        component = component,
        timestamp = format_timestamp(),
        "✅ {}",
        message
    );
}
