//! Log subscriber installation for `aced` and `ace-worker`.
//!
//! Both processes log to stderr. The service uses the configured filter and
//! format; a worker inherits the parent's filter through
//! [`WORKER_LOG_FILTER_ENV`] and always logs compactly so its lines stay
//! readable when the parent relays them.

use std::env;
use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::{EnvFilter, fmt};

use ace_config::{Config, LogFormat, default_log_filter};

use crate::execution::WORKER_LOG_FILTER_ENV;

static INSTALLED: OnceCell<()> = OnceCell::new();

/// Proof that a subscriber is in place for this process.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Reasons the log subscriber could not be installed.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The filter directive did not parse.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Some other subscriber already owns the global slot.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

struct LogProfile {
    filter: String,
    format: LogFormat,
}

impl LogProfile {
    fn service(config: &Config) -> Self {
        Self {
            filter: config.log_filter().to_owned(),
            format: config.log_format(),
        }
    }

    fn worker() -> Self {
        Self {
            filter: env::var(WORKER_LOG_FILTER_ENV)
                .unwrap_or_else(|_| default_log_filter().to_owned()),
            format: LogFormat::Compact,
        }
    }

    fn install(&self) -> Result<(), TelemetryError> {
        let filter = EnvFilter::try_new(&self.filter)
            .map_err(|error| TelemetryError::Filter(error.to_string()))?;
        let builder = fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .with_ansi(io::stderr().is_terminal())
            .with_timer(UtcTime::rfc_3339())
            .with_target(true);

        let result = match self.format {
            LogFormat::Json => tracing::subscriber::set_global_default(
                builder.json().flatten_event(true).finish(),
            ),
            LogFormat::Compact => {
                tracing::subscriber::set_global_default(builder.compact().finish())
            }
        };
        result.map_err(TelemetryError::Subscriber)
    }
}

fn install_once(profile: &LogProfile) -> Result<TelemetryHandle, TelemetryError> {
    INSTALLED
        .get_or_try_init(|| profile.install())
        .map(|()| TelemetryHandle)
}

/// Installs the service subscriber on first use; later calls are no-ops.
///
/// # Errors
///
/// Returns [`TelemetryError`] when the configured filter is invalid or
/// another subscriber is already installed.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    install_once(&LogProfile::service(config))
}

/// Installs the worker subscriber.
///
/// # Errors
///
/// As for [`initialise`].
pub fn initialise_worker() -> Result<TelemetryHandle, TelemetryError> {
    install_once(&LogProfile::worker())
}
