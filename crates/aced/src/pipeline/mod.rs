//! Request pipeline for the `run_task` and `execute_catalog` endpoints.
//!
//! Each flow parses the body, validates it against the endpoint's schema,
//! and only then builds typed requests. Malformed or invalid bodies end the
//! request with a 400; once a request is valid the reply is always 200 and
//! execution failures travel inside the body.

mod catalog;
mod errors;
mod schema;
mod scrub;
mod tasks;

use std::sync::Arc;

use axum::http::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use crate::execution::Executor;
use crate::plugin_cache::PluginCache;
use crate::target::DeviceInitializer;

pub use self::errors::{ErrorKind, RequestFault, ServiceError};
pub use self::schema::{SchemaViolations, validate_execute_catalog, validate_run_task};
pub use self::scrub::scrub;

const PIPELINE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::pipeline");

/// Literal body of the `/check` endpoint.
pub const CHECK_BODY: &str = "OK";

/// Body of a pipeline reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyBody {
    /// A JSON document.
    Json(Value),
    /// A literal body.
    Text(&'static str),
    /// No body.
    Empty,
}

/// Status and body produced for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// HTTP status.
    pub status: StatusCode,
    /// Response body.
    pub body: ReplyBody,
}

impl Reply {
    /// A 200 reply carrying `body`.
    #[must_use]
    pub const fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body: ReplyBody::Json(body),
        }
    }

    /// A 400 reply carrying `error` in the `_error` envelope.
    #[must_use]
    pub fn bad_request(error: &ServiceError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ReplyBody::Json(error.envelope()),
        }
    }

    /// The JSON body, if any.
    #[must_use]
    pub const fn json(&self) -> Option<&Value> {
        match &self.body {
            ReplyBody::Json(value) => Some(value),
            ReplyBody::Text(_) | ReplyBody::Empty => None,
        }
    }
}

/// Orchestrates validation, resolution, staging and isolated execution.
pub struct Pipeline {
    executor: Arc<dyn Executor>,
    plugins: PluginCache,
    devices: Arc<dyn DeviceInitializer>,
    server_uri: Option<String>,
}

impl Pipeline {
    /// Assembles a pipeline from its collaborators.
    pub fn new(
        executor: Arc<dyn Executor>,
        plugins: PluginCache,
        devices: Arc<dyn DeviceInitializer>,
    ) -> Self {
        Self {
            executor,
            plugins,
            devices,
            server_uri: None,
        }
    }

    /// Sets the code-source URI handed to the compiler.
    #[must_use]
    pub fn with_server_uri(mut self, uri: Option<String>) -> Self {
        self.server_uri = uri;
        self
    }

    /// Liveness reply.
    #[must_use]
    pub const fn liveness(&self) -> Reply {
        Reply {
            status: StatusCode::OK,
            body: ReplyBody::Empty,
        }
    }

    /// Reply of the `/check` endpoint.
    #[must_use]
    pub const fn check(&self) -> Reply {
        Reply {
            status: StatusCode::OK,
            body: ReplyBody::Text(CHECK_BODY),
        }
    }
}

/// Parses, validates and decodes a request body.
fn decode<T: DeserializeOwned>(
    endpoint: &str,
    body: &[u8],
    validate: fn(&Value) -> Result<(), SchemaViolations>,
) -> Result<T, Reply> {
    let document = RequestFault::parse(body).map_err(|fault| {
        debug!(target: PIPELINE_TARGET, endpoint, class = fault.class(), "unparsable request body");
        Reply::bad_request(&fault.to_service_error())
    })?;

    validate(&document).map_err(|violations| {
        debug!(
            target: PIPELINE_TARGET,
            endpoint,
            violations = violations.violations().len(),
            "request body failed validation"
        );
        Reply::bad_request(&violations.to_service_error())
    })?;

    serde_json::from_value(document).map_err(|error| {
        Reply::bad_request(&ServiceError::new(
            ErrorKind::SchemaError,
            "There was an error validating the request body.",
            json!([error.to_string()]),
        ))
    })
}

#[cfg(test)]
mod tests;
