//! The `_error` envelope reported to clients.

use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

/// Classification of a client-visible error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// The request body is not JSON.
    #[serde(rename = "request_exception")]
    RequestException,
    /// The request body failed structural validation.
    #[serde(rename = "schema-error")]
    SchemaError,
    /// A target parameter failed validation.
    #[serde(rename = "invalid_param")]
    InvalidParam,
    /// The catalog failed to compile.
    #[serde(rename = "compile_failed")]
    CompileFailed,
    /// The target specification was rejected.
    #[serde(rename = "target_spec")]
    TargetSpec,
    /// The report could not be submitted.
    #[serde(rename = "reporting_failed")]
    ReportingFailed,
    /// The isolated execution failed before the task produced a result.
    #[serde(rename = "execution_failed")]
    ExecutionFailed,
}

/// Client-visible error, rendered as `{"_error": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceError {
    /// Human-readable message.
    pub msg: String,
    /// Error classification.
    pub kind: ErrorKind,
    /// Kind-specific details.
    pub details: Value,
}

impl ServiceError {
    /// Creates an error.
    pub fn new(kind: ErrorKind, msg: impl Into<String>, details: Value) -> Self {
        Self {
            msg: msg.into(),
            kind,
            details,
        }
    }

    /// The error as a bare object.
    #[must_use]
    pub fn to_value(&self) -> Value {
        json!({
            "msg": self.msg,
            "kind": self.kind,
            "details": self.details,
        })
    }

    /// The error wrapped in the `_error` envelope.
    #[must_use]
    pub fn envelope(&self) -> Value {
        json!({ "_error": self.to_value() })
    }
}

/// The request body could not be parsed as JSON.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct RequestFault {
    #[source]
    source: serde_json::Error,
}

impl RequestFault {
    /// Parses `body` as a JSON document.
    ///
    /// # Errors
    ///
    /// Returns a [`RequestFault`] describing the syntax error.
    pub fn parse(body: &[u8]) -> Result<Value, Self> {
        serde_json::from_slice(body).map_err(|source| Self { source })
    }

    /// Fault class of the parse error.
    #[must_use]
    pub fn class(&self) -> &'static str {
        match self.source.classify() {
            serde_json::error::Category::Io => "io",
            serde_json::error::Category::Syntax => "syntax",
            serde_json::error::Category::Data => "data",
            serde_json::error::Category::Eof => "eof",
        }
    }

    /// The fault as a client-visible error, without any stack trace.
    #[must_use]
    pub fn to_service_error(&self) -> ServiceError {
        ServiceError::new(
            ErrorKind::RequestException,
            self.to_string(),
            json!({
                "class": self.class(),
                "line": self.source.line(),
                "column": self.source.column(),
            }),
        )
    }
}
