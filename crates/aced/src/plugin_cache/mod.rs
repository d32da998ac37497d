//! Per-environment staging of automation code and private snapshots of it.
//!
//! Every environment is staged under `<cache_dir>/environments/<name>`. A
//! sync refreshes the staged code from the [`CodeSource`] and then copies
//! the `plugins` tree into a fresh temporary directory that belongs to the
//! caller alone.
//!
//! One process-wide readers-writer lock serialises structural mutation: the
//! creation and touch of the staging directory, and the snapshot copy. The
//! fetch runs outside the lock, so concurrent syncs of one environment may
//! fetch redundantly. Snapshots are never reclaimed.

mod errors;
mod snapshot;
mod source;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockWriteGuard};

use tracing::{debug, info};

pub use self::errors::{CacheError, CodeSourceError};
pub use self::source::{CodeSource, FileServerSource, INCOMING_DIR, PLUGIN_MOUNTS};

const CACHE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::plugin_cache");
const PLUGINS_DIR: &str = "plugins";
const SNAPSHOT_PREFIX: &str = "plugins";

/// Stages environment code and hands out snapshots of it.
pub struct PluginCache {
    environments: PathBuf,
    snapshots: PathBuf,
    source: Box<dyn CodeSource>,
    lock: RwLock<()>,
}

impl PluginCache {
    /// Creates a cache staging environments under `environments`.
    ///
    /// Snapshots go to the system temporary directory.
    pub fn new(environments: impl Into<PathBuf>, source: Box<dyn CodeSource>) -> Self {
        Self {
            environments: environments.into(),
            snapshots: env::temp_dir(),
            source,
            lock: RwLock::new(()),
        }
    }

    /// Places snapshots under `dir` instead of the system temporary
    /// directory.
    #[must_use]
    pub fn with_snapshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.snapshots = dir.into();
        self
    }

    /// Stages `environment` and returns the `plugins` directory of a new
    /// snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Storage`] on local filesystem failures and
    /// [`CacheError::Sync`] when the code source fails.
    pub fn sync(&self, environment: &str) -> Result<PathBuf, CacheError> {
        let staging = self.prepare(environment)?;
        self.source.fetch(environment, &staging)?;
        let snapshot = self.snapshot(&staging.join(PLUGINS_DIR))?;
        info!(
            target: CACHE_TARGET,
            environment,
            snapshot = %snapshot.display(),
            "environment synced"
        );
        Ok(snapshot)
    }

    /// Syncs `environment` and runs `block` with the snapshot path.
    ///
    /// The snapshot is left on disk afterwards.
    ///
    /// # Errors
    ///
    /// Returns the [`sync`](Self::sync) failure; `block` does not run then.
    pub fn with_synced_libdir<T>(
        &self,
        environment: &str,
        certname: &str,
        block: impl FnOnce(&Path) -> T,
    ) -> Result<T, CacheError> {
        let libdir = self.sync(environment)?;
        debug!(
            target: CACHE_TARGET,
            environment,
            certname,
            libdir = %libdir.display(),
            "running with synced libdir"
        );
        Ok(block(&libdir))
    }

    fn write_lock(&self) -> RwLockWriteGuard<'_, ()> {
        // The lock guards no data, so a poisoned lock is still usable.
        self.lock.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn prepare(&self, environment: &str) -> Result<PathBuf, CacheError> {
        let staging = snapshot::contained_join(&self.environments, environment)
            .filter(|path| path.parent() == Some(self.environments.as_path()))
            .ok_or_else(|| CacheError::InvalidEnvironment {
                environment: environment.to_owned(),
            })?;

        let _guard = self.write_lock();
        fs::create_dir_all(&staging).map_err(|error| CacheError::storage(&staging, error))?;
        snapshot::touch(&staging)?;
        Ok(staging)
    }

    fn snapshot(&self, plugins: &Path) -> Result<PathBuf, CacheError> {
        fs::create_dir_all(&self.snapshots)
            .map_err(|error| CacheError::storage(&self.snapshots, error))?;
        let root = tempfile::Builder::new()
            .prefix(SNAPSHOT_PREFIX)
            .tempdir_in(&self.snapshots)
            .map_err(|error| CacheError::storage(&self.snapshots, error))?
            .keep();
        let copy = root.join(PLUGINS_DIR);

        let _guard = self.write_lock();
        snapshot::copy_tree(plugins, &copy)?;
        snapshot::touch(&root)?;
        Ok(copy)
    }
}
