//! Logging initialization with environment-based formatters
//!
//! - Production: Structured JSON logs for cloud monitoring
//! - Sandbox: Colorful, human-readable logs for development

use crate::config::get_environment;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging based on the environment
///
/// Filter directives come from `RUST_LOG` and fall back to `info`. Calling this
/// more than once keeps the first subscriber.
pub fn init_logging() {
    init_logging_with_default("info");
}

/// Same as [`init_logging`] with a caller-chosen fallback filter
pub fn init_logging_with_default(default_filter: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let result = if is_production(&get_environment()) {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_writer(std::io::stdout),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_ansi(true)
                    .with_writer(std::io::stdout),
            )
            .try_init()
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "logging already initialized");
    }
}

fn is_production(env: &str) -> bool {
    matches!(env, "production" | "prod")
}
