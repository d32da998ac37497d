//! Shared test doubles and fixtures.

mod collaborators;
mod config_loader;
mod reporter;

pub(crate) use collaborators::{
    AcceptingDevices, CertnameCompiler, EchoTasks, STAGED_FILE, StubSource, UnreachableSource,
    staged_pipeline,
};
pub(crate) use config_loader::{FailingConfigLoader, InvalidConfigLoader, TestConfigLoader};
pub(crate) use reporter::{HealthEvent, RecordingHealthReporter};
