//! In-process execution over the collaborator traits.

use super::collaborators::{CatalogCompiler, TaskExecutor};
use super::{CatalogJob, CatalogOutcome, ExecutionError, Executor, TaskJob, WorkReply, WorkUnit};
use crate::task::TaskResult;

/// Runs work in the calling process.
///
/// The worker binary uses this inside its isolated process. Tests use it to
/// drive the pipeline with stub collaborators.
#[derive(Debug, Clone)]
pub struct InlineExecutor<T, C> {
    tasks: T,
    compiler: C,
}

impl<T, C> InlineExecutor<T, C> {
    /// Creates an executor over the given collaborators.
    pub const fn new(tasks: T, compiler: C) -> Self {
        Self { tasks, compiler }
    }
}

impl<T, C> Executor for InlineExecutor<T, C>
where
    T: TaskExecutor + Send + Sync,
    C: CatalogCompiler + Send + Sync,
{
    fn run_task(&self, job: &TaskJob) -> Result<TaskResult, ExecutionError> {
        let results = self
            .tasks
            .run_task(&job.target, &job.task, &job.parameters)?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| ExecutionError::NoResult {
                node: job.target.name.clone(),
            })
    }

    fn apply_catalog(&self, job: &CatalogJob) -> Result<CatalogOutcome, ExecutionError> {
        Ok(self.compiler.apply(&job.settings, &job.target)?)
    }
}

/// Runs one unit of work; the body of the isolated worker.
///
/// # Errors
///
/// Propagates the executor's [`ExecutionError`].
pub fn perform<E: Executor + ?Sized>(
    executor: &E,
    unit: &WorkUnit,
) -> Result<WorkReply, ExecutionError> {
    match unit {
        WorkUnit::RunTask(job) => executor.run_task(job).map(WorkReply::Task),
        WorkUnit::ApplyCatalog(job) => executor.apply_catalog(job).map(WorkReply::Catalog),
    }
}
