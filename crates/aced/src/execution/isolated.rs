//! Execution through a per-request worker process.

use std::env;
use std::io;
use std::path::PathBuf;

use ace_config::Config;
use ace_isolation::{ProcessIsolator, WorkerCommand};
use serde::de::DeserializeOwned;
use tracing::warn;

use super::{
    CatalogJob, CatalogOutcome, ExecutionError, Executor, TaskJob, WorkRequest, WorkUnit,
};
use crate::task::TaskResult;

const EXECUTION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::execution");

/// File name of the worker binary installed next to `aced`.
pub const WORKER_BINARY: &str = "ace-worker";

/// Environment variable carrying the log filter into the worker.
pub const WORKER_LOG_FILTER_ENV: &str = "ACE_WORKER_LOG_FILTER";

/// Executor that runs every unit of work in a fresh `ace-worker` process.
#[derive(Debug, Clone)]
pub struct IsolatedExecutor {
    isolator: ProcessIsolator,
    driver_dir: PathBuf,
}

impl IsolatedExecutor {
    /// Creates an executor that isolates work with `isolator`.
    pub fn new(isolator: ProcessIsolator, driver_dir: impl Into<PathBuf>) -> Self {
        Self {
            isolator,
            driver_dir: driver_dir.into(),
        }
    }

    /// Builds the production executor from configuration.
    ///
    /// Without an explicit `worker_path` the worker is expected next to the
    /// running executable.
    ///
    /// # Errors
    ///
    /// Returns an IO error when the running executable cannot be located.
    pub fn from_config(config: &Config) -> io::Result<Self> {
        let program = match config.worker_path.as_ref() {
            Some(path) => path.clone().into_std_path_buf(),
            None => env::current_exe()?.with_file_name(WORKER_BINARY),
        };
        let command = WorkerCommand::new(program).env(WORKER_LOG_FILTER_ENV, config.log_filter());
        Ok(Self::new(
            ProcessIsolator::new(command),
            config.driver_dir.clone().into_std_path_buf(),
        ))
    }

    fn dispatch<T: DeserializeOwned>(&self, unit: WorkUnit) -> Result<T, ExecutionError> {
        let request = WorkRequest {
            driver_dir: self.driver_dir.clone(),
            unit,
        };
        self.isolator.isolate(&request).map_err(|error| {
            warn!(
                target: EXECUTION_TARGET,
                abnormal = error.is_abnormal_termination(),
                error = %error,
                "isolated execution failed"
            );
            ExecutionError::Isolation(error)
        })
    }
}

impl Executor for IsolatedExecutor {
    fn run_task(&self, job: &TaskJob) -> Result<TaskResult, ExecutionError> {
        self.dispatch(WorkUnit::RunTask(job.clone()))
    }

    fn apply_catalog(&self, job: &CatalogJob) -> Result<CatalogOutcome, ExecutionError> {
        self.dispatch(WorkUnit::ApplyCatalog(job.clone()))
    }
}
