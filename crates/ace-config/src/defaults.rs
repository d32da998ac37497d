use camino::Utf8PathBuf;

use crate::logging::LogFormat;

/// Default listen address.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default listen port.
pub const DEFAULT_PORT: u16 = 44633;

/// Default number of concurrently executing requests.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Default cache root.
pub const DEFAULT_CACHE_DIR: &str = "/opt/puppetlabs/server/data/ace-server/cache";

/// Default connect timeout for the code source, in seconds.
pub const DEFAULT_FILE_SERVER_CONN_TIMEOUT: u64 = 120;

/// Default directory searched for transport drivers.
pub const DEFAULT_DRIVER_DIR: &str = "/opt/puppetlabs/ace/drivers";

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

pub(crate) fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

pub(crate) fn default_host() -> String {
    DEFAULT_HOST.to_owned()
}

pub(crate) const fn default_port() -> u16 {
    DEFAULT_PORT
}

pub(crate) const fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

pub(crate) fn default_cache_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_CACHE_DIR)
}

pub(crate) const fn default_file_server_conn_timeout() -> u64 {
    DEFAULT_FILE_SERVER_CONN_TIMEOUT
}

pub(crate) fn default_driver_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_DRIVER_DIR)
}
