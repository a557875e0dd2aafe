//! Structured logging initialization.
//!
//! JSON format for production environments, pretty format for
//! development. The level can always be overridden with `RUST_LOG`.

use anyhow::anyhow;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Initialize the global tracing subscriber from config.
///
/// Returns an error if a subscriber is already installed.
pub fn init_logging(cfg: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.level))
        .map_err(|e| anyhow!("invalid log filter {:?}: {}", cfg.level, e))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if cfg.json {
        builder
            .json()
            .try_init()
            .map_err(|e| anyhow!("failed to install tracing subscriber: {}", e))?;
    } else {
        builder
            .pretty()
            .try_init()
            .map_err(|e| anyhow!("failed to install tracing subscriber: {}", e))?;
    }

    Ok(())
}
