//! Service bootstrap orchestration.

use std::fs;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use ace_config::{Config, ConfigValidationError, TlsBundle, TlsError};
use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

use crate::execution::{DriverDirectory, Executor, IsolatedExecutor};
use crate::health::HealthReporter;
use crate::pipeline::Pipeline;
use crate::plugin_cache::{CodeSource, CodeSourceError, FileServerSource, PluginCache};
use crate::target::DeviceInitializer;
use crate::telemetry::{self, TelemetryError};

/// Source of the service configuration.
pub trait ConfigLoader: Send + Sync {
    /// Loads the service configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that returns a fixed configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps `config`.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Stages at which bootstrap can fail.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Configuration loaded but is not usable.
    #[error("invalid configuration: {source}")]
    Validation {
        /// Violated constraint.
        #[source]
        source: ConfigValidationError,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// A cache directory could not be created.
    #[error("failed to prepare cache directory '{path}': {source}")]
    CacheDirectory {
        /// Directory that could not be created.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The TLS bundle could not be loaded.
    #[error("failed to load TLS material: {source}")]
    Tls {
        /// Underlying TLS error.
        #[source]
        source: TlsError,
    },
    /// The code source could not be built.
    #[error("failed to configure the code source: {source}")]
    CodeSource {
        /// Underlying code source error.
        #[source]
        source: CodeSourceError,
    },
    /// The worker executable could not be located.
    #[error("failed to locate the worker executable: {source}")]
    Worker {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// External collaborators wired into the pipeline.
pub struct Collaborators {
    /// Runs tasks and catalogs.
    pub executor: Arc<dyn Executor>,
    /// Initialises devices for the catalog flow.
    pub devices: Arc<dyn DeviceInitializer>,
    /// Stages environment code.
    pub code_source: Box<dyn CodeSource>,
}

impl Collaborators {
    /// Production collaborators: isolated workers, driver executables and
    /// the configured file server.
    ///
    /// # Errors
    ///
    /// Returns a [`BootstrapError`] when TLS material, the code source or
    /// the worker executable is unusable.
    pub fn from_config(config: &Config) -> Result<Self, BootstrapError> {
        let tls = TlsBundle::load(config).map_err(|source| BootstrapError::Tls { source })?;
        let uri = config.file_server_uri().unwrap_or_default();
        let code_source = FileServerSource::new(
            uri,
            Duration::from_secs(config.file_server_conn_timeout),
            tls.as_ref(),
        )
        .map_err(|source| BootstrapError::CodeSource { source })?;
        let executor =
            IsolatedExecutor::from_config(config).map_err(|source| BootstrapError::Worker { source })?;

        Ok(Self {
            executor: Arc::new(executor),
            devices: Arc::new(DriverDirectory::new(config.driver_dir.as_std_path())),
            code_source: Box::new(code_source),
        })
    }
}

/// A bootstrapped service ready to bind its listener.
pub struct Service {
    config: Config,
    pipeline: Arc<Pipeline>,
    reporter: Arc<dyn HealthReporter>,
}

impl Service {
    /// Validated configuration the service runs with.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Shared request pipeline.
    #[must_use]
    pub fn pipeline(&self) -> Arc<Pipeline> {
        Arc::clone(&self.pipeline)
    }

    /// Health reporter the service was bootstrapped with.
    #[must_use]
    pub fn reporter(&self) -> Arc<dyn HealthReporter> {
        Arc::clone(&self.reporter)
    }

}

/// Bootstraps the service using the supplied collaborators.
///
/// `collaborators` runs after the configuration is validated and the cache
/// is prepared.
///
/// # Errors
///
/// Returns the first [`BootstrapError`]; the reporter sees it too.
pub fn bootstrap_with<F>(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    collaborators: F,
) -> Result<Service, BootstrapError>
where
    F: FnOnce(&Config) -> Result<Collaborators, BootstrapError>,
{
    reporter.bootstrap_starting();
    match assemble(loader, collaborators) {
        Ok((config, pipeline)) => {
            reporter.bootstrap_succeeded(&config);
            Ok(Service {
                config,
                pipeline: Arc::new(pipeline),
                reporter,
            })
        }
        Err(error) => {
            reporter.bootstrap_failed(&error);
            Err(error)
        }
    }
}

fn assemble<F>(
    loader: &dyn ConfigLoader,
    collaborators: F,
) -> Result<(Config, Pipeline), BootstrapError>
where
    F: FnOnce(&Config) -> Result<Collaborators, BootstrapError>,
{
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    config
        .validate()
        .map_err(|source| BootstrapError::Validation { source })?;
    telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;

    for path in [config.tasks_cache_dir(), config.environments_cache_dir()] {
        fs::create_dir_all(&path).map_err(|source| BootstrapError::CacheDirectory {
            path: path.clone(),
            source,
        })?;
    }

    let Collaborators {
        executor,
        devices,
        code_source,
    } = collaborators(&config)?;
    let plugins = PluginCache::new(config.environments_cache_dir().into_std_path_buf(), code_source);
    let pipeline = Pipeline::new(executor, plugins, devices)
        .with_server_uri(config.file_server_uri().map(str::to_owned));
    Ok((config, pipeline))
}
