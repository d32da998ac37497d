//! Task descriptors and per-target execution results.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A named operation whose implementation files are located by content hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Qualified task name, for example `sample::echo`.
    pub name: String,
    /// Task metadata, including its parameter schema.
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Implementation files, resolved through the external task file cache.
    #[serde(default)]
    pub files: Vec<TaskFile>,
}

/// One content-addressed implementation file of a [`Task`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFile {
    /// File name as it should appear on the device side.
    pub filename: String,
    /// Hex-encoded SHA-256 of the file content.
    pub sha256: String,
    /// Where the task file cache can download the file from.
    #[serde(default)]
    pub uri: Value,
}

/// Whether the remote operation succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// The task ran to completion on the device.
    Success,
    /// The task or its transport reported a failure.
    Failure,
}

/// Result of running a task against one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Name of the target the task ran against.
    pub node: String,
    /// Outcome classification.
    pub status: TaskStatus,
    /// Free-form output; failures carry an `_error` object here.
    #[serde(default)]
    pub result: Value,
}

impl TaskResult {
    /// Builds a failure result carrying an `_error` object.
    pub fn failure(node: impl Into<String>, error: Value) -> Self {
        Self {
            node: node.into(),
            status: TaskStatus::Failure,
            result: serde_json::json!({ "_error": error }),
        }
    }
}
