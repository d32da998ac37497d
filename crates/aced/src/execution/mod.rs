//! Execution of tasks and catalogs against remote devices.
//!
//! The pipeline talks to an [`Executor`]. In production that is the
//! [`IsolatedExecutor`], which ships each [`WorkUnit`] to a fresh
//! `ace-worker` process; inside the worker the same unit is run by an
//! [`InlineExecutor`] over the [`ExternalDriver`] collaborators. Tests and
//! embedders can use the [`InlineExecutor`] directly with their own
//! [`TaskExecutor`] and [`CatalogCompiler`] implementations.

mod collaborators;
mod driver;
mod inline;
mod isolated;

use std::path::PathBuf;

use ace_isolation::IsolationError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::facts::TrustedFacts;
use crate::target::Target;
use crate::task::{Task, TaskResult};

pub use self::collaborators::{CatalogCompiler, TaskExecutor};
pub use self::driver::{DriverDirectory, DriverError, ExternalDriver};
pub use self::inline::{InlineExecutor, perform};
pub use self::isolated::{IsolatedExecutor, WORKER_BINARY, WORKER_LOG_FILTER_ENV};

/// A task run against a single target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskJob {
    /// Device the task runs against.
    pub target: Target,
    /// Task to run.
    pub task: Task,
    /// Task parameters.
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

/// A catalog compile-and-apply against a single device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogJob {
    /// Per-request compiler configuration.
    pub settings: CompilerSettings,
    /// Target descriptor as received, including the transport key.
    pub target: Map<String, Value>,
}

/// Immutable compiler configuration built for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerSettings {
    /// Environment whose code compiles the catalog.
    pub environment: String,
    /// Device certname.
    pub certname: String,
    /// Correlation id forwarded unchanged.
    pub transaction_uuid: String,
    /// Correlation id forwarded unchanged.
    pub job_id: String,
    /// Snapshot `plugins` directory to load automation code from.
    pub libdir: PathBuf,
    /// Code source the compiler fetches from, when configured.
    #[serde(default)]
    pub server_uri: Option<String>,
    /// Facts derived from the certname.
    pub trusted_facts: TrustedFacts,
}

/// One unit of work shipped to an isolated worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum WorkUnit {
    /// Run a task.
    RunTask(TaskJob),
    /// Compile and apply a catalog.
    ApplyCatalog(CatalogJob),
}

/// Envelope written to the worker's stdin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkRequest {
    /// Directory holding per-transport driver executables.
    pub driver_dir: PathBuf,
    /// The work itself.
    pub unit: WorkUnit,
}

/// Value written back by the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkReply {
    /// Reply to [`WorkUnit::RunTask`].
    Task(TaskResult),
    /// Reply to [`WorkUnit::ApplyCatalog`].
    Catalog(CatalogOutcome),
}

/// Classified result of a catalog compile-and-apply.
///
/// Failure variants carry a diagnostic for the log; clients only ever see
/// the fixed message of the kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CatalogOutcome {
    /// The catalog compiled and applied.
    Success,
    /// The catalog failed to compile.
    CompileFailed {
        /// Internal diagnostic.
        #[serde(default)]
        message: String,
    },
    /// The target specification was rejected.
    TargetSpec {
        /// Internal diagnostic.
        #[serde(default)]
        message: String,
    },
    /// The report could not be submitted.
    ReportingFailed {
        /// Internal diagnostic.
        #[serde(default)]
        message: String,
    },
}

/// Errors surfaced while executing work.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The isolated worker failed.
    #[error(transparent)]
    Isolation(#[from] IsolationError),
    /// The driver failed.
    #[error(transparent)]
    Driver(#[from] DriverError),
    /// The task executor produced no result for the target.
    #[error("task executor returned no result for '{node}'")]
    NoResult {
        /// Target name.
        node: String,
    },
}

/// Runs tasks and catalogs for the request pipeline.
pub trait Executor: Send + Sync {
    /// Runs `job` and returns the result for its single target.
    ///
    /// # Errors
    ///
    /// Returns an [`ExecutionError`] when the work could not be carried out.
    fn run_task(&self, job: &TaskJob) -> Result<TaskResult, ExecutionError>;

    /// Compiles and applies the catalog described by `job`.
    ///
    /// # Errors
    ///
    /// Returns an [`ExecutionError`] when the work could not be carried out.
    fn apply_catalog(&self, job: &CatalogJob) -> Result<CatalogOutcome, ExecutionError>;
}
