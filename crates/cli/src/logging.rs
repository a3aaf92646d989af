//! Logging setup
//!
//! Logs always go to stderr; stdout is reserved for converter output and
//! `--json` results.

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset
const DEFAULT_FILTER: &str = "folio=info";

/// Initialize tracing
///
/// # Environment Variables
///
/// - `RUST_LOG`: standard `EnvFilter` directives (default: `folio=info`)
/// - `FOLIO_LOG_FORMAT`: `json` for structured output, anything else for pretty
pub fn init_logging() -> Result<()> {
    let log_format = std::env::var("FOLIO_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .context("Failed to create env filter")?;

    match log_format.as_str() {
        "json" => {
            // Production: JSON structured logging
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init()
                .context("Failed to install JSON subscriber")?;
        }
        _ => {
            // Development: Pretty formatting with colors
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .try_init()
                .context("Failed to install pretty subscriber")?;
        }
    }

    Ok(())
}
