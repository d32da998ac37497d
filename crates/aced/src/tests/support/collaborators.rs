//! Stub collaborators standing in for drivers, compilers and code sources.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value, json};
use tempfile::TempDir;

use crate::execution::{
    CatalogCompiler, CatalogOutcome, CompilerSettings, DriverError, InlineExecutor, TaskExecutor,
};
use crate::pipeline::Pipeline;
use crate::plugin_cache::{CacheError, CodeSource, PluginCache};
use crate::target::{DeviceError, DeviceHandle, DeviceInitializer, DeviceRequest, Target};
use crate::task::{Task, TaskResult, TaskStatus};

/// Relative path of the file every stub sync stages.
pub(crate) const STAGED_FILE: &str = "lib/puppet/type/panos_address.rb";

/// Task executor echoing `parameters.message`.
///
/// `sample::fail` reports a remote failure carrying diagnostics and
/// `sample::lost` produces no reply at all.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct EchoTasks;

impl TaskExecutor for EchoTasks {
    fn run_task(
        &self,
        target: &Target,
        task: &Task,
        parameters: &Map<String, Value>,
    ) -> Result<Vec<TaskResult>, DriverError> {
        match task.name.as_str() {
            "sample::fail" => Ok(vec![TaskResult::failure(
                target.name.clone(),
                json!({
                    "kind": "puppetlabs.tasks/task-error",
                    "msg": "The task failed with exit code 1",
                    "details": {
                        "exitcode": 1,
                        "stack_trace": ["driver.rb:12"],
                        "backtrace": "driver.rb:12",
                    },
                }),
            )]),
            "sample::lost" => Err(DriverError::NoReply {
                path: PathBuf::from("/opt/drivers/panos"),
            }),
            _ => Ok(vec![TaskResult {
                node: target.name.clone(),
                status: TaskStatus::Success,
                result: json!({"output": parameters.get("message").cloned().unwrap_or(Value::Null)}),
            }]),
        }
    }
}

/// Compiler classifying outcomes by certname and recording its settings.
#[derive(Debug, Default, Clone)]
pub(crate) struct CertnameCompiler {
    seen: Arc<Mutex<Vec<CompilerSettings>>>,
}

impl CertnameCompiler {
    pub(crate) fn seen(&self) -> Vec<CompilerSettings> {
        self.seen.lock().expect("compiler mutex poisoned").clone()
    }
}

impl CatalogCompiler for CertnameCompiler {
    fn apply(
        &self,
        settings: &CompilerSettings,
        _target: &Map<String, Value>,
    ) -> Result<CatalogOutcome, DriverError> {
        self.seen
            .lock()
            .expect("compiler mutex poisoned")
            .push(settings.clone());
        let message = format!("stub outcome for {}", settings.certname);
        Ok(match settings.certname.as_str() {
            "fail.example.net" => CatalogOutcome::CompileFailed { message },
            "credentials.example.net" => CatalogOutcome::TargetSpec { message },
            "reports.example.net" => CatalogOutcome::ReportingFailed { message },
            _ => CatalogOutcome::Success,
        })
    }
}

/// Device initializer that accepts every request.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct AcceptingDevices;

impl DeviceInitializer for AcceptingDevices {
    fn initialize(&self, request: &DeviceRequest) -> Result<DeviceHandle, DeviceError> {
        Ok(DeviceHandle {
            request: request.clone(),
            driver: PathBuf::from("/opt/drivers").join(&request.provider),
        })
    }
}

/// Code source staging one fixed plugin file.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct StubSource;

impl CodeSource for StubSource {
    fn fetch(&self, environment: &str, destination: &Path) -> Result<(), CacheError> {
        let file = destination.join("plugins").join(STAGED_FILE);
        let parent = file.parent().unwrap_or(destination);
        fs::create_dir_all(parent).map_err(|error| CacheError::storage(parent, error))?;
        fs::write(&file, environment).map_err(|error| CacheError::storage(&file, error))
    }
}

/// Code source that is never reachable.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct UnreachableSource;

impl CodeSource for UnreachableSource {
    fn fetch(&self, environment: &str, _destination: &Path) -> Result<(), CacheError> {
        Err(CacheError::sync(environment, "connection refused"))
    }
}

/// Builds a pipeline over the stub collaborators inside `dir`.
pub(crate) fn staged_pipeline(
    dir: &TempDir,
    compiler: CertnameCompiler,
    source: impl CodeSource + 'static,
) -> Pipeline {
    let plugins = PluginCache::new(dir.path().join("environments"), Box::new(source))
        .with_snapshot_dir(dir.path().join("snapshots"));
    Pipeline::new(
        Arc::new(InlineExecutor::new(EchoTasks, compiler)),
        plugins,
        Arc::new(AcceptingDevices),
    )
    .with_server_uri(Some("https://puppet.example.net:8140".to_owned()))
}
