//! Structural validation of request bodies.
//!
//! Each endpoint has a fixed request shape. Validation walks the body once
//! and collects every violation, in schema order, as a message naming the
//! offending property by its `#/`-rooted pointer.

use serde_json::{Map, Value, json};
use thiserror::Error;

use super::errors::{ErrorKind, ServiceError};
use crate::target::TRANSPORT_KEY;

const ROOT: &str = "#/";
const SCHEMA_ERROR_MESSAGE: &str = "There was an error validating the request body.";
const COMPILER_FIELDS: [&str; 4] = ["certname", "environment", "transaction_uuid", "job_id"];

/// A request body violated its schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("request body failed validation: {}", .violations.join("; "))]
pub struct SchemaViolations {
    violations: Vec<String>,
}

impl SchemaViolations {
    /// Violation messages, in schema order.
    #[must_use]
    pub fn violations(&self) -> &[String] {
        &self.violations
    }

    /// The violations as a `schema-error`.
    #[must_use]
    pub fn to_service_error(&self) -> ServiceError {
        ServiceError::new(
            ErrorKind::SchemaError,
            SCHEMA_ERROR_MESSAGE,
            json!(self.violations),
        )
    }
}

/// Validates a `run_task` request body.
///
/// # Errors
///
/// Returns every violation found.
pub fn validate_run_task(body: &Value) -> Result<(), SchemaViolations> {
    let mut check = Checker::default();
    let Some(root) = check.object(ROOT, body) else {
        return check.finish();
    };

    if let Some(target) = check.required_object(ROOT, root, "target") {
        let at = child(ROOT, "target");
        check.required_string(&at, target, TRANSPORT_KEY);
        if !(target.contains_key("host") || target.contains_key("name")) {
            check.push(format!(
                "The property '{at}' did not contain a required property of 'host' or 'name'"
            ));
        }
        check.optional_string(&at, target, "host");
        check.optional_string(&at, target, "name");
    }

    if let Some(task) = check.required_object(ROOT, root, "task") {
        let at = child(ROOT, "task");
        check.required_string(&at, task, "name");
        check.optional_object(&at, task, "metadata");
        if let Some(files) = check.optional_array(&at, task, "files") {
            let files_at = child(&at, "files");
            for (index, file) in files.iter().enumerate() {
                let file_at = child(&files_at, &index.to_string());
                if let Some(file) = check.object(&file_at, file) {
                    check.required_string(&file_at, file, "filename");
                    check.required_string(&file_at, file, "sha256");
                }
            }
        }
    }

    check.optional_object(ROOT, root, "parameters");
    check.finish()
}

/// Validates an `execute_catalog` request body.
///
/// # Errors
///
/// Returns every violation found.
pub fn validate_execute_catalog(body: &Value) -> Result<(), SchemaViolations> {
    let mut check = Checker::default();
    let Some(root) = check.object(ROOT, body) else {
        return check.finish();
    };

    if let Some(target) = check.required_object(ROOT, root, "target") {
        check.required_string(&child(ROOT, "target"), target, TRANSPORT_KEY);
    }
    if let Some(compiler) = check.required_object(ROOT, root, "compiler") {
        let at = child(ROOT, "compiler");
        for field in COMPILER_FIELDS {
            check.required_string(&at, compiler, field);
        }
    }
    check.finish()
}

fn child(pointer: &str, key: &str) -> String {
    if pointer == ROOT {
        format!("{ROOT}{key}")
    } else {
        format!("{pointer}/{key}")
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(number) if number.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Default)]
struct Checker {
    violations: Vec<String>,
}

impl Checker {
    fn push(&mut self, violation: String) {
        self.violations.push(violation);
    }

    fn finish(self) -> Result<(), SchemaViolations> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(SchemaViolations {
                violations: self.violations,
            })
        }
    }

    fn mismatch(&mut self, pointer: &str, value: &Value, expected: &str) {
        self.push(format!(
            "The property '{pointer}' of type {} did not match the following type: {expected}",
            type_name(value)
        ));
    }

    fn object<'a>(&mut self, pointer: &str, value: &'a Value) -> Option<&'a Map<String, Value>> {
        let object = value.as_object();
        if object.is_none() {
            self.mismatch(pointer, value, "object");
        }
        object
    }

    fn required<'a>(
        &mut self,
        pointer: &str,
        object: &'a Map<String, Value>,
        key: &str,
    ) -> Option<&'a Value> {
        let value = object.get(key);
        if value.is_none() {
            self.push(format!(
                "The property '{pointer}' did not contain a required property of '{key}'"
            ));
        }
        value
    }

    fn required_object<'a>(
        &mut self,
        pointer: &str,
        object: &'a Map<String, Value>,
        key: &str,
    ) -> Option<&'a Map<String, Value>> {
        let value = self.required(pointer, object, key)?;
        self.object(&child(pointer, key), value)
    }

    fn required_string(&mut self, pointer: &str, object: &Map<String, Value>, key: &str) {
        if let Some(value) = self.required(pointer, object, key) {
            if !value.is_string() {
                self.mismatch(&child(pointer, key), value, "string");
            }
        }
    }

    fn optional_string(&mut self, pointer: &str, object: &Map<String, Value>, key: &str) {
        if let Some(value) = object.get(key) {
            if !value.is_string() {
                self.mismatch(&child(pointer, key), value, "string");
            }
        }
    }

    fn optional_object(&mut self, pointer: &str, object: &Map<String, Value>, key: &str) {
        if let Some(value) = object.get(key) {
            self.object(&child(pointer, key), value);
        }
    }

    fn optional_array<'a>(
        &mut self,
        pointer: &str,
        object: &'a Map<String, Value>,
        key: &str,
    ) -> Option<&'a Vec<Value>> {
        let value = object.get(key)?;
        let array = value.as_array();
        if array.is_none() {
            self.mismatch(&child(pointer, key), value, "array");
        }
        array
    }
}
