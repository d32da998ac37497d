//! Shared configuration for the agentless catalog executor.
//!
//! [`Config`] is loaded through `ortho_config`, so every option can be set
//! from (lowest to highest precedence) built-in defaults, a configuration
//! file, `ACE_*` environment variables, and command-line flags. The loaded
//! value is immutable; callers validate it once with [`Config::validate`]
//! before handing it to the service.
//!
//! `load` and `load_from_iter` come from the [`OrthoConfig`] trait, which
//! callers bring into scope.

mod defaults;
mod logging;
mod tls;
mod validation;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_CACHE_DIR, DEFAULT_CONCURRENCY, DEFAULT_DRIVER_DIR, DEFAULT_FILE_SERVER_CONN_TIMEOUT,
    DEFAULT_HOST, DEFAULT_LOG_FILTER, DEFAULT_PORT, default_log_filter, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use tls::{TlsBundle, TlsError, TlsSetting};
pub use validation::ConfigValidationError;

/// Name of the subdirectory of `cache_dir` holding the task content cache.
pub const TASKS_SUBDIR: &str = "tasks";

/// Name of the subdirectory of `cache_dir` holding staged environments.
pub const ENVIRONMENTS_SUBDIR: &str = "environments";

/// Runtime configuration for the `aced` service and its worker.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, OrthoConfig)]
#[ortho_config(prefix = "ACE")]
pub struct Config {
    /// Address the HTTP listener binds to.
    #[serde(default = "defaults::default_host")]
    #[ortho_config(default = defaults::default_host())]
    pub host: String,
    /// Port the HTTP listener binds to.
    #[serde(default = "defaults::default_port")]
    #[ortho_config(default = defaults::default_port())]
    pub port: u16,
    /// Number of requests executed concurrently.
    #[serde(default = "defaults::default_concurrency")]
    #[ortho_config(default = defaults::default_concurrency())]
    pub concurrency: usize,
    /// Root of the on-disk cache (`tasks/` and `environments/`).
    #[serde(default = "defaults::default_cache_dir")]
    #[ortho_config(default = defaults::default_cache_dir())]
    pub cache_dir: Utf8PathBuf,
    /// Connect timeout, in seconds, used when talking to the code source.
    #[serde(default = "defaults::default_file_server_conn_timeout")]
    #[ortho_config(default = defaults::default_file_server_conn_timeout())]
    pub file_server_conn_timeout: u64,
    /// Base URI of the remote code source.
    #[serde(default)]
    pub file_server_uri: Option<String>,
    /// Client certificate presented to the code source.
    #[serde(default)]
    pub ssl_cert: Option<Utf8PathBuf>,
    /// Private key matching `ssl_cert`.
    #[serde(default)]
    pub ssl_key: Option<Utf8PathBuf>,
    /// Certificate authority bundle trusted for the code source.
    #[serde(default)]
    pub ssl_ca_cert: Option<Utf8PathBuf>,
    /// Certificate revocation list issued by the CA.
    #[serde(default)]
    pub ssl_ca_crls: Option<Utf8PathBuf>,
    /// Directory holding one driver executable per transport.
    #[serde(default = "defaults::default_driver_dir")]
    #[ortho_config(default = defaults::default_driver_dir())]
    pub driver_dir: Utf8PathBuf,
    /// Worker executable used for process isolation.
    #[serde(default)]
    pub worker_path: Option<Utf8PathBuf>,
    /// Tracing filter expression.
    #[serde(default = "defaults::default_log_filter_string")]
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Output format for log records.
    #[serde(default = "defaults::default_log_format")]
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: defaults::default_host(),
            port: DEFAULT_PORT,
            concurrency: DEFAULT_CONCURRENCY,
            cache_dir: defaults::default_cache_dir(),
            file_server_conn_timeout: DEFAULT_FILE_SERVER_CONN_TIMEOUT,
            file_server_uri: None,
            ssl_cert: None,
            ssl_key: None,
            ssl_ca_cert: None,
            ssl_ca_crls: None,
            driver_dir: defaults::default_driver_dir(),
            worker_path: None,
            log_filter: defaults::default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Listen address as `host:port`.
    #[must_use]
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Output format for log records.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Cache root.
    #[must_use]
    pub fn cache_dir(&self) -> &Utf8Path {
        self.cache_dir.as_path()
    }

    /// Directory of the content-addressed task implementation cache.
    #[must_use]
    pub fn tasks_cache_dir(&self) -> Utf8PathBuf {
        self.cache_dir.join(TASKS_SUBDIR)
    }

    /// Directory under which environments are staged.
    #[must_use]
    pub fn environments_cache_dir(&self) -> Utf8PathBuf {
        self.cache_dir.join(ENVIRONMENTS_SUBDIR)
    }

    /// Base URI of the code source, if configured.
    #[must_use]
    pub fn file_server_uri(&self) -> Option<&str> {
        self.file_server_uri.as_deref()
    }

    /// Validates the semantic constraints that the loader cannot express.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        validation::validate(self)
    }
}
