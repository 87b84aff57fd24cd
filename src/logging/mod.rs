// Logging module for structured logging using the tracing crate

use tracing::Span;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Initialize the tracing subscriber for structured logging
///
/// The filter comes from `RUST_LOG` when set, otherwise from
/// `config.level`. Output goes to stdout, either human-readable or one JSON
/// object per line.
///
/// # Errors
///
/// Returns an error if the filter directive is invalid or a global
/// subscriber is already installed.
///
/// # Examples
///
/// ```no_run
/// use tilemark::config::LoggingConfig;
/// use tilemark::logging::init_subscriber;
///
/// init_subscriber(&LoggingConfig::default()).expect("Failed to initialize logging");
/// tracing::info!("Application started");
/// ```
pub fn init_subscriber(config: &LoggingConfig) -> Result<(), String> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| format!("Invalid log level '{}': {}", config.level, e))?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = if config.format == "json" {
        builder.json().with_current_span(true).try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| format!("Failed to install log subscriber: {}", e))
}

/// Span covering one render for a session
#[inline]
pub fn render_span(session: &str) -> Span {
    tracing::info_span!("render", session = %session)
}

/// Span covering one upload for a session
#[inline]
pub fn upload_span(session: &str, mime: &str) -> Span {
    tracing::info_span!("upload", session = %session, mime = %mime)
}
