//! Per-transport driver executables.
//!
//! A driver is an executable named after its transport inside the driver
//! directory. It reads one JSON request line on stdin and answers with one
//! JSON line on stdout, using the same framing as the isolated worker.

use std::io::{self, BufReader};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;

use ace_isolation::protocol;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use super::collaborators::{CatalogCompiler, TaskExecutor};
use super::{CatalogOutcome, CompilerSettings};
use crate::target::{DeviceError, DeviceHandle, DeviceInitializer, DeviceRequest, TRANSPORT_KEY, Target};
use crate::task::{Task, TaskResult};

const DRIVER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::driver");

/// Errors raised while running a driver.
#[derive(Debug, Clone, Error)]
pub enum DriverError {
    /// The transport name cannot name a file inside the driver directory.
    #[error("transport name '{transport}' is not a valid driver name")]
    InvalidTransport {
        /// Offending transport name.
        transport: String,
    },
    /// The target descriptor did not name a transport.
    #[error("target does not name a transport")]
    MissingTransport,
    /// No driver is installed for the transport.
    #[error("no driver installed at '{path}'")]
    NotFound {
        /// Expected driver path.
        path: PathBuf,
    },
    /// The driver could not be started.
    #[error("failed to start driver '{path}': {source}")]
    Spawn {
        /// Driver path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: Arc<io::Error>,
    },
    /// Talking to the driver failed.
    #[error("driver '{path}' I/O failed: {source}")]
    Io {
        /// Driver path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: Arc<io::Error>,
    },
    /// The driver exited without replying.
    #[error("driver '{path}' exited without a reply")]
    NoReply {
        /// Driver path.
        path: PathBuf,
    },
    /// The driver's reply did not decode.
    #[error("driver '{path}' replied with invalid output: {message}")]
    InvalidReply {
        /// Driver path.
        path: PathBuf,
        /// Decoder diagnostic.
        message: String,
    },
    /// The driver exited unsuccessfully.
    #[error("driver '{path}' exited with {status}")]
    Exit {
        /// Driver path.
        path: PathBuf,
        /// Rendered exit status.
        status: String,
    },
}

/// Directory holding one driver executable per transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverDirectory {
    root: PathBuf,
}

impl DriverDirectory {
    /// Creates a directory rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the driver for `transport`.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::InvalidTransport`] for names that are empty,
    /// hidden, or contain path separators, and [`DriverError::NotFound`] when
    /// no file exists at the resolved path.
    pub fn executable(&self, transport: &str) -> Result<PathBuf, DriverError> {
        let invalid = transport.is_empty()
            || transport.starts_with('.')
            || transport.contains(['/', '\\']);
        if invalid {
            return Err(DriverError::InvalidTransport {
                transport: transport.to_owned(),
            });
        }
        let path = self.root.join(transport);
        if path.is_file() {
            Ok(path)
        } else {
            Err(DriverError::NotFound { path })
        }
    }
}

impl DeviceInitializer for DriverDirectory {
    fn initialize(&self, request: &DeviceRequest) -> Result<DeviceHandle, DeviceError> {
        let driver = self
            .executable(&request.provider)
            .map_err(|error| DeviceError {
                name: request.name.clone(),
                transport: request.provider.clone(),
                message: error.to_string(),
            })?;
        Ok(DeviceHandle {
            request: request.clone(),
            driver,
        })
    }
}

#[derive(Serialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
enum DriverRequest<'a> {
    RunTask {
        target: &'a Target,
        task: &'a Task,
        parameters: &'a Map<String, Value>,
    },
    ApplyCatalog {
        settings: &'a CompilerSettings,
        target: &'a Map<String, Value>,
    },
}

/// Task executor and catalog compiler backed by driver executables.
#[derive(Debug, Clone)]
pub struct ExternalDriver {
    drivers: DriverDirectory,
}

impl ExternalDriver {
    /// Creates a driver runner over `drivers`.
    #[must_use]
    pub const fn new(drivers: DriverDirectory) -> Self {
        Self { drivers }
    }

    fn call<T: DeserializeOwned>(
        &self,
        transport: &str,
        request: &DriverRequest<'_>,
    ) -> Result<T, DriverError> {
        let path = self.drivers.executable(transport)?;
        debug!(target: DRIVER_TARGET, driver = %path.display(), "starting driver");

        let mut child = Command::new(&path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| DriverError::Spawn {
                path: path.clone(),
                source: Arc::new(source),
            })?;

        let written = child
            .stdin
            .take()
            .map_or(Ok(()), |stdin| protocol::write_line(stdin, request));
        let reply = child
            .stdout
            .take()
            .map_or(Ok(None), |stdout| protocol::read_line::<_, T>(BufReader::new(stdout)));
        let status = child.wait().map_err(|source| DriverError::Io {
            path: path.clone(),
            source: Arc::new(source),
        })?;

        if !status.success() {
            return Err(DriverError::Exit {
                path,
                status: status.to_string(),
            });
        }
        written.map_err(|source| DriverError::Io {
            path: path.clone(),
            source: Arc::new(source),
        })?;
        match reply {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Err(DriverError::NoReply { path }),
            Err(error) => Err(DriverError::InvalidReply {
                path,
                message: error.to_string(),
            }),
        }
    }
}

impl TaskExecutor for ExternalDriver {
    fn run_task(
        &self,
        target: &Target,
        task: &Task,
        parameters: &Map<String, Value>,
    ) -> Result<Vec<TaskResult>, DriverError> {
        let request = DriverRequest::RunTask {
            target,
            task,
            parameters,
        };
        let result: TaskResult = self.call(&target.transport, &request)?;
        Ok(vec![result])
    }
}

impl CatalogCompiler for ExternalDriver {
    fn apply(
        &self,
        settings: &CompilerSettings,
        target: &Map<String, Value>,
    ) -> Result<CatalogOutcome, DriverError> {
        let transport = target
            .get(TRANSPORT_KEY)
            .and_then(Value::as_str)
            .ok_or(DriverError::MissingTransport)?;
        self.call(transport, &DriverRequest::ApplyCatalog { settings, target })
    }
}
