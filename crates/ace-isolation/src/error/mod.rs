//! Errors raised while running work in an isolated process.
//!
//! I/O errors are wrapped in `Arc` so the enum stays cheap to move and
//! satisfies the `result_large_err` Clippy lint.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Failures of a single isolated execution.
#[derive(Debug, Clone, Error)]
pub enum IsolationError {
    /// The worker process could not be started.
    #[error("failed to spawn worker '{program}': {source}")]
    Spawn {
        /// Program that was executed.
        program: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The work item could not be serialised for the child.
    #[error("failed to serialise work for the worker: {message}")]
    SerializeWork {
        /// Serialiser message.
        message: String,
    },

    /// Communicating with the child over its standard streams failed.
    #[error("I/O error communicating with worker: {source}")]
    Io {
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The child closed stdout without writing an outcome.
    #[error("worker produced no outcome")]
    NoOutput,

    /// The child wrote something that is not a valid outcome.
    #[error("worker wrote an invalid outcome: {message}")]
    InvalidOutput {
        /// Parser message.
        message: String,
    },

    /// The unit of work raised a fault inside the child.
    #[error("work faulted in worker ({class}): {message}")]
    Faulted {
        /// Category of the fault as reported by the child.
        class: String,
        /// Fault description.
        message: String,
    },

    /// The child exited with a non-zero status code.
    #[error("worker exited with non-zero status {code}")]
    AbnormalExit {
        /// Process exit code.
        code: i32,
    },

    /// The child was terminated by a signal.
    #[error("worker terminated by signal {signal}")]
    Signalled {
        /// Terminating signal number.
        signal: i32,
    },
}

impl IsolationError {
    pub(crate) fn io(source: std::io::Error) -> Self {
        Self::Io {
            source: Arc::new(source),
        }
    }

    /// Returns `true` when the child died rather than reporting a fault.
    #[must_use]
    pub const fn is_abnormal_termination(&self) -> bool {
        matches!(self, Self::AbnormalExit { .. } | Self::Signalled { .. })
    }
}
