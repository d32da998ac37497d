//! External collaborators that perform the remote work.

use serde_json::{Map, Value};

use super::{CatalogOutcome, CompilerSettings, DriverError};
use crate::target::Target;
use crate::task::{Task, TaskResult};

/// Runs tasks against targets.
pub trait TaskExecutor {
    /// Runs `task` against `target` and returns one result per target.
    ///
    /// # Errors
    ///
    /// Returns a [`DriverError`] when the task could not be dispatched.
    fn run_task(
        &self,
        target: &Target,
        task: &Task,
        parameters: &Map<String, Value>,
    ) -> Result<Vec<TaskResult>, DriverError>;
}

/// Compiles a catalog for a device and applies it.
pub trait CatalogCompiler {
    /// Compiles and applies a catalog for `target` using `settings`.
    ///
    /// # Errors
    ///
    /// Returns a [`DriverError`] when the compiler could not be reached.
    /// Compile, target and reporting failures are outcomes, not errors.
    fn apply(
        &self,
        settings: &CompilerSettings,
        target: &Map<String, Value>,
    ) -> Result<CatalogOutcome, DriverError>;
}

impl<T: TaskExecutor + ?Sized> TaskExecutor for &T {
    fn run_task(
        &self,
        target: &Target,
        task: &Task,
        parameters: &Map<String, Value>,
    ) -> Result<Vec<TaskResult>, DriverError> {
        (**self).run_task(target, task, parameters)
    }
}

impl<C: CatalogCompiler + ?Sized> CatalogCompiler for &C {
    fn apply(
        &self,
        settings: &CompilerSettings,
        target: &Map<String, Value>,
    ) -> Result<CatalogOutcome, DriverError> {
        (**self).apply(settings, target)
    }
}
