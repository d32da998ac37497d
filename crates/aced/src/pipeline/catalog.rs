//! The `execute_catalog` flow.

use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

use super::errors::{ErrorKind, ServiceError};
use super::{PIPELINE_TARGET, Pipeline, Reply, decode, schema};
use crate::execution::{CatalogJob, CatalogOutcome, CompilerSettings};
use crate::facts::TrustedFacts;
use crate::target::{TRANSPORT_KEY, resolve_device};

const ENDPOINT: &str = "execute_catalog";
const FAILURE_DETAILS: &str = "upstream api errors go here";

#[derive(Debug, Deserialize)]
struct ExecuteCatalogRequest {
    target: Map<String, Value>,
    compiler: CompilerJob,
}

/// Compiler job descriptor of an `execute_catalog` request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CompilerJob {
    /// Device certname.
    pub certname: String,
    /// Environment whose code compiles the catalog.
    pub environment: String,
    /// Correlation id forwarded unchanged.
    pub transaction_uuid: String,
    /// Correlation id forwarded unchanged.
    pub job_id: String,
}

impl Pipeline {
    /// Compiles and applies a catalog for one device.
    ///
    /// Replies 400 for unparsable or invalid bodies, otherwise always 200:
    /// `{}` on success, or an `_error` envelope of kind `compile_failed`,
    /// `target_spec` or `reporting_failed`.
    #[must_use]
    pub fn execute_catalog(&self, body: &[u8]) -> Reply {
        let request: ExecuteCatalogRequest =
            match decode(ENDPOINT, body, schema::validate_execute_catalog) {
                Ok(request) => request,
                Err(reply) => return reply,
            };
        let ExecuteCatalogRequest { target, compiler } = request;

        // Compilation proceeds whatever the resolution result.
        let transport = target.get(TRANSPORT_KEY).and_then(Value::as_str);
        match resolve_device(
            Some(&compiler.certname),
            transport,
            Some(&target),
            self.devices.as_ref(),
        ) {
            Ok(handle) => debug!(
                target: PIPELINE_TARGET,
                certname = %compiler.certname,
                driver = %handle.driver.display(),
                "device resolved"
            ),
            Err(error) => warn!(
                target: PIPELINE_TARGET,
                certname = %compiler.certname,
                kind = error.kind(),
                error = %error,
                "device resolution failed"
            ),
        }

        let applied = self.plugins.with_synced_libdir(
            &compiler.environment,
            &compiler.certname,
            |libdir| {
                let job = CatalogJob {
                    settings: CompilerSettings {
                        environment: compiler.environment.clone(),
                        certname: compiler.certname.clone(),
                        transaction_uuid: compiler.transaction_uuid.clone(),
                        job_id: compiler.job_id.clone(),
                        libdir: libdir.to_path_buf(),
                        server_uri: self.server_uri.clone(),
                        trusted_facts: TrustedFacts::for_certname(&compiler.certname),
                    },
                    target,
                };
                self.executor.apply_catalog(&job)
            },
        );

        let outcome = match applied {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(error)) => CatalogOutcome::CompileFailed {
                message: error.to_string(),
            },
            Err(error) => CatalogOutcome::CompileFailed {
                message: format!("{}: {error}", error.kind()),
            },
        };
        Reply::ok(catalog_payload(&compiler, outcome))
    }
}

fn catalog_payload(compiler: &CompilerJob, outcome: CatalogOutcome) -> Value {
    let (kind, msg, message) = match outcome {
        CatalogOutcome::Success => {
            info!(
                target: PIPELINE_TARGET,
                certname = %compiler.certname,
                environment = %compiler.environment,
                job_id = %compiler.job_id,
                "catalog applied"
            );
            return json!({});
        }
        CatalogOutcome::CompileFailed { message } => {
            (ErrorKind::CompileFailed, "catalog compile failed", message)
        }
        CatalogOutcome::TargetSpec { message } => {
            (ErrorKind::TargetSpec, "target specification invalid", message)
        }
        CatalogOutcome::ReportingFailed { message } => {
            (ErrorKind::ReportingFailed, "report submission failed", message)
        }
    };
    warn!(
        target: PIPELINE_TARGET,
        certname = %compiler.certname,
        environment = %compiler.environment,
        job_id = %compiler.job_id,
        kind = ?kind,
        diagnostic = %message,
        "catalog run failed"
    );
    ServiceError::new(kind, msg, json!(FAILURE_DETAILS)).envelope()
}
