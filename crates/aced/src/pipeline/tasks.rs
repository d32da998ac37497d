//! The `run_task` flow.

use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{info, warn};

use super::errors::{ErrorKind, ServiceError};
use super::{PIPELINE_TARGET, Pipeline, Reply, decode, schema, scrub};
use crate::execution::TaskJob;
use crate::target::Target;
use crate::task::{Task, TaskResult};

const ENDPOINT: &str = "run_task";

#[derive(Debug, Deserialize)]
struct RunTaskRequest {
    target: Map<String, Value>,
    task: Task,
    #[serde(default)]
    parameters: Map<String, Value>,
}

impl Pipeline {
    /// Runs a task against one target.
    ///
    /// Replies 400 for unparsable or invalid bodies, otherwise 200 with the
    /// scrubbed per-target result whether the task succeeded or not.
    #[must_use]
    pub fn run_task(&self, body: &[u8]) -> Reply {
        let request: RunTaskRequest = match decode(ENDPOINT, body, schema::validate_run_task) {
            Ok(request) => request,
            Err(reply) => return reply,
        };
        let target = match Target::remote(&request.target) {
            Ok(target) => target,
            Err(error) => {
                return Reply::bad_request(&ServiceError::new(
                    ErrorKind::InvalidParam,
                    error.to_string(),
                    json!({}),
                ));
            }
        };
        let job = TaskJob {
            target,
            task: request.task,
            parameters: request.parameters,
        };

        let result = self.executor.run_task(&job).unwrap_or_else(|error| {
            warn!(
                target: PIPELINE_TARGET,
                node = %job.target.name,
                task = %job.task.name,
                error = %error,
                "task execution failed"
            );
            let failure = ServiceError::new(ErrorKind::ExecutionFailed, error.to_string(), json!({}));
            TaskResult::failure(job.target.name.clone(), failure.to_value())
        });

        info!(
            target: PIPELINE_TARGET,
            node = %result.node,
            task = %job.task.name,
            status = ?result.status,
            "task finished"
        );
        Reply::ok(scrub(task_payload(result)))
    }
}

fn task_payload(result: TaskResult) -> Value {
    json!({
        "node": result.node,
        "status": result.status,
        "result": result.result,
    })
}
