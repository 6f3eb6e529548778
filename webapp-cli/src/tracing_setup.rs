//! Tracing setup for the webapp CLI
//!
//! Usage:
//!   webapp --debug ...                  # Debug logging, SQL included (wins over RUST_LOG)
//!   RUST_LOG=webapp_orm=debug webapp    # Fine-grained log control
//!
//! Logs go to stderr so stdout stays machine-readable JSON.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Tracing configuration options
#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    /// Log at debug level, overriding RUST_LOG
    pub debug: bool,
}

/// Filter from `--debug`, else RUST_LOG, else `info`
fn env_filter(config: &TracingConfig) -> EnvFilter {
    if config.debug {
        return EnvFilter::new("debug");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn init(config: &TracingConfig) -> Result<()> {
    let filter = env_filter(config);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.debug) // Show targets in debug mode
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .map_err(|err| anyhow!(err))
}
