use crate::config::{AppEnvironment, TelemetryConfig};
use std::fmt;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
pub enum TelemetryError {
    /// Neither `RUST_LOG` nor the configured level produced a usable filter.
    InvalidDirective { directive: String, source: ParseError },
    /// A global subscriber was already installed in this process.
    AlreadyInstalled(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDirective { directive, .. } => {
                write!(f, "log directive '{directive}' is not a valid tracing filter")
            }
            Self::AlreadyInstalled(err) => write!(f, "cannot install log subscriber: {err}"),
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidDirective { source, .. } => Some(source),
            Self::AlreadyInstalled(err) => Some(err.as_ref()),
        }
    }
}

/// `RUST_LOG` wins when it parses; otherwise the configured level is used.
pub fn env_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    if let Ok(from_env) = EnvFilter::try_from_default_env() {
        return Ok(from_env);
    }
    EnvFilter::try_new(&config.log_level).map_err(|source| TelemetryError::InvalidDirective {
        directive: config.log_level.clone(),
        source,
    })
}

pub fn init(config: &TelemetryConfig, environment: AppEnvironment) -> Result<(), TelemetryError> {
    let filter = env_filter(config)?;
    let interactive = matches!(environment, AppEnvironment::Development);

    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filter)
        .with_ansi(interactive)
        .with_target(interactive)
        .try_init()
        .map_err(TelemetryError::AlreadyInstalled)
}
