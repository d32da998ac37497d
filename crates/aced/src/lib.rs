//! Agentless execution service.
//!
//! `aced` runs tasks and applies compiled catalogs against remote devices
//! that can only be reached through a transport driver. It exposes four
//! HTTP endpoints:
//!
//! | Route | Behaviour |
//! |---|---|
//! | `GET /` | liveness |
//! | `POST /check` | literal `OK` |
//! | `POST /run_task` | runs a task against one target |
//! | `POST /execute_catalog` | compiles and applies a catalog for one device |
//!
//! Driver and compiler code is untrusted, so every unit of work runs in a
//! fresh `ace-worker` process through [`ace_isolation`]. The catalog flow
//! first stages the environment's plugin code with the [`PluginCache`] and
//! compiles against a private snapshot of it.
//!
//! Bootstrap loads the [`ace_config::Config`], initialises telemetry,
//! prepares the cache directories and wires the collaborators; health
//! hooks report each stage through a [`HealthReporter`].

mod bootstrap;
pub mod execution;
mod facts;
mod health;
pub mod pipeline;
pub mod plugin_cache;
mod server;
pub mod target;
pub mod task;
pub mod telemetry;

pub use bootstrap::{
    BootstrapError, Collaborators, ConfigLoader, Service, StaticConfigLoader, SystemConfigLoader,
    bootstrap_with,
};
pub use facts::TrustedFacts;
pub use health::{HealthReporter, StructuredHealthReporter};
pub use pipeline::{Pipeline, Reply};
pub use plugin_cache::PluginCache;
pub use server::{LaunchError, ListenerError, bind, router, run_server, serve};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
