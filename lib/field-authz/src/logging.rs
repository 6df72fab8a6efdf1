use std::io::IsTerminal;
use std::str::FromStr;

use field_authz_config::log::{LogFormat, LoggingConfig};
use tracing_subscriber::fmt::{self, time::UtcTime};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Invalid log filter '{directive}': {source}")]
    InvalidFilter {
        directive: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
    #[error("Failed to install the global subscriber: {0}")]
    AlreadyInitialized(#[from] TryInitError),
}

pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, LoggingError> {
    let directive = config.env_filter_str();
    EnvFilter::from_str(directive).map_err(|source| LoggingError::InvalidFilter {
        directive: directive.to_string(),
        source,
    })
}

/// Installs the process-wide `tracing` subscriber. Fails if one is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = env_filter(config)?;
    let timer = UtcTime::rfc_3339();
    let is_terminal = std::io::stdout().is_terminal();
    let registry = tracing_subscriber::registry();

    match config.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_timer(timer)
                    .with_target(false)
                    .flatten_event(true),
            )
            .with(filter)
            .try_init()?,
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_timer(timer)
                    .with_target(false)
                    .with_ansi(is_terminal),
            )
            .with(filter)
            .try_init()?,
    }

    Ok(())
}
