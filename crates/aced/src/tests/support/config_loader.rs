//! Test configuration loaders for success and failure paths.

use std::ffi::OsString;
use std::sync::Arc;

use ace_config::Config;
use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig, OrthoError};
use tempfile::TempDir;

use crate::bootstrap::ConfigLoader;

/// Loader rooting the cache in a temporary directory and binding an
/// ephemeral local port.
pub(crate) struct TestConfigLoader {
    cache: TempDir,
}

impl TestConfigLoader {
    pub(crate) fn new() -> Self {
        Self {
            cache: TempDir::new().expect("failed to create temporary cache directory"),
        }
    }

    pub(crate) fn cache_dir(&self) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.cache.path().join("cache"))
            .expect("temporary cache path was not valid UTF-8")
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            host: "127.0.0.1".to_owned(),
            port: 0,
            cache_dir: self.cache_dir(),
            file_server_uri: Some("https://puppet.example.net:8140".to_owned()),
            ..Config::default()
        })
    }
}

/// Loader that fails by passing an unparsable flag value.
pub(crate) struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("aced"),
            OsString::from("--port"),
            OsString::from("not-a-port"),
        ];
        Config::load_from_iter(args)
    }
}

/// Loader producing a configuration that fails validation.
pub(crate) struct InvalidConfigLoader;

impl ConfigLoader for InvalidConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            concurrency: 0,
            file_server_uri: Some("https://puppet.example.net:8140".to_owned()),
            ..Config::default()
        })
    }
}
