//! Logging initialization for the host and module libraries
//!
//! - Respects the RUST_LOG environment variable
//! - Falls back to the configured filter, then to "info"
//! - Respects NO_COLOR
//!
//! # Usage
//!
//! ```rust,ignore
//! use module_host::utils::init_logging;
//!
//! init_logging(None); // Uses RUST_LOG or defaults to "info"
//! ```

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info";

/// Pick the filter directive: RUST_LOG, then the configured filter, then "info"
fn filter_directive(filter: Option<&str>) -> String {
    match std::env::var("RUST_LOG") {
        Ok(env) if !env.trim().is_empty() => env,
        _ => filter.unwrap_or(DEFAULT_FILTER).to_string(),
    }
}

fn env_filter(filter: Option<&str>) -> EnvFilter {
    EnvFilter::try_new(filter_directive(filter)).unwrap_or_else(|e| {
        eprintln!("Invalid log filter ({}), falling back to \"{}\"", e, DEFAULT_FILTER);
        EnvFilter::new(DEFAULT_FILTER)
    })
}

/// Initialize human-readable logging
///
/// # Arguments
/// * `filter` - Optional log filter from config (e.g., "info", "module_host=debug").
///   RUST_LOG takes precedence when set.
///
/// Calling this more than once is harmless; only the first subscriber is kept.
pub fn init_logging(filter: Option<&str>) {
    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_ansi(std::env::var("NO_COLOR").is_err()),
        )
        .with(env_filter(filter))
        .try_init();
}

/// Initialize logging with JSON output
///
/// Useful when logs need to be parsed by log aggregation systems.
#[cfg(feature = "json-logging")]
pub fn init_json_logging(filter: Option<&str>) {
    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .json()
                .with_target(true)
                .with_current_span(true)
                .with_span_list(true),
        )
        .with(env_filter(filter))
        .try_init();
}

/// Initialize logging from [`LoggingConfig`](crate::config::LoggingConfig)
///
/// `json_format` falls back to human-readable output when the
/// `json-logging` feature is disabled.
pub fn init_logging_from_config(config: Option<&crate::config::LoggingConfig>) {
    let filter = config.and_then(|c| c.filter.as_deref());

    if config.map(|c| c.json_format).unwrap_or(false) {
        #[cfg(feature = "json-logging")]
        {
            init_json_logging(filter);
        }
        #[cfg(not(feature = "json-logging"))]
        {
            init_logging(filter);
        }
    } else {
        init_logging(filter);
    }
}
