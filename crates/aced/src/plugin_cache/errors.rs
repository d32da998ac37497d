//! Error types for plugin staging.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Errors surfaced while staging or snapshotting plugin code.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// A filesystem operation failed.
    #[error("storage fault at '{path}': {source}")]
    Storage {
        /// Path the operation touched.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: Arc<io::Error>,
    },
    /// The code source could not provide the environment's code.
    #[error("failed to sync environment '{environment}': {message}")]
    Sync {
        /// Environment being synced.
        environment: String,
        /// Diagnostic from the code source.
        message: String,
    },
    /// The environment name cannot name a directory in the cache.
    #[error("environment name '{environment}' is not valid")]
    InvalidEnvironment {
        /// Offending name.
        environment: String,
    },
}

impl CacheError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn sync(environment: &str, message: impl Into<String>) -> Self {
        Self::Sync {
            environment: environment.to_owned(),
            message: message.into(),
        }
    }

    /// Short fault class used in logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Storage { .. } => "storage-fault",
            Self::Sync { .. } | Self::InvalidEnvironment { .. } => "sync-fault",
        }
    }
}

/// Errors raised while building the production code source.
#[derive(Debug, Error)]
pub enum CodeSourceError {
    /// The configured base URI does not parse.
    #[error("invalid code source URI '{uri}': {message}")]
    InvalidUri {
        /// Configured URI.
        uri: String,
        /// Parser diagnostic.
        message: String,
    },
    /// The configured base URI cannot carry a path.
    #[error("code source URI '{uri}' cannot be a base")]
    CannotBeABase {
        /// Configured URI.
        uri: String,
    },
    /// The TLS material was rejected.
    #[error("invalid TLS material for the code source: {source}")]
    Tls {
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },
    /// The HTTP client could not be built.
    #[error("failed to build the code source client: {source}")]
    Client {
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },
}
