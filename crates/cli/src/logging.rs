//! Logging setup
//!
//! Logs go to stderr; stdout is reserved for reports.

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log format selector (`json` or `pretty`)
pub const LOG_FORMAT_VAR: &str = "DIVERGENCE_LOG_FORMAT";

const DEFAULT_FILTER: &str = "divergence=info";

/// Initialize tracing from `RUST_LOG` and `DIVERGENCE_LOG_FORMAT`
///
/// # Example
///
/// ```text
/// RUST_LOG=divergence=debug DIVERGENCE_LOG_FORMAT=json divergence run
/// ```
pub fn init_logging() -> Result<()> {
    let log_format = std::env::var(LOG_FORMAT_VAR).unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))?;

    match log_format.as_str() {
        "json" => {
            // Machine-readable structured logging
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init()?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .try_init()?;
        }
    }

    Ok(())
}
