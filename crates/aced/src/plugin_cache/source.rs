//! Code sources that stage environment plugins on local disk.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use ace_config::TlsBundle;
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use reqwest::header::ACCEPT;
use serde::Deserialize;
use tempfile::NamedTempFile;
use tracing::debug;
use url::Url;

use super::errors::{CacheError, CodeSourceError};
use super::snapshot::contained_join;

const SOURCE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::plugin_cache::source");

/// Mounts synced from the code server, each into a same-named subdirectory.
pub const PLUGIN_MOUNTS: [&str; 2] = ["plugins", "pluginfacts"];

/// Directory beside the mounts where downloads are written before being
/// renamed into place. Snapshots never walk it.
pub const INCOMING_DIR: &str = ".incoming";

/// Fetches an environment's automation code.
pub trait CodeSource: Send + Sync {
    /// Stages the code of `environment` under `destination`, one
    /// subdirectory per mount. Fetching the same environment twice must be
    /// harmless.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Sync`] when the source cannot be reached and
    /// [`CacheError::Storage`] when staging fails locally.
    fn fetch(&self, environment: &str, destination: &Path) -> Result<(), CacheError>;
}

#[derive(Debug, Deserialize)]
struct FileMetadata {
    #[serde(default)]
    relative_path: Option<String>,
    #[serde(rename = "type")]
    kind: String,
}

/// Code source speaking the file-server plugin-sync protocol.
#[derive(Debug, Clone)]
pub struct FileServerSource {
    client: Client,
    base: Url,
}

impl FileServerSource {
    /// Builds a source for the server at `base_uri`.
    ///
    /// With a TLS bundle the client trusts only the bundle's CA and presents
    /// its client certificate.
    ///
    /// # Errors
    ///
    /// Returns a [`CodeSourceError`] when the URI or TLS material is
    /// unusable.
    pub fn new(
        base_uri: &str,
        connect_timeout: Duration,
        tls: Option<&TlsBundle>,
    ) -> Result<Self, CodeSourceError> {
        let base = Url::parse(base_uri).map_err(|error| CodeSourceError::InvalidUri {
            uri: base_uri.to_owned(),
            message: error.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(CodeSourceError::CannotBeABase {
                uri: base_uri.to_owned(),
            });
        }

        let mut builder = Client::builder().connect_timeout(connect_timeout);
        if let Some(bundle) = tls {
            let ca = reqwest::Certificate::from_pem(&bundle.ca_cert)
                .map_err(|source| CodeSourceError::Tls { source })?;
            let identity = reqwest::Identity::from_pem(&bundle.identity_pem())
                .map_err(|source| CodeSourceError::Tls { source })?;
            builder = builder
                .tls_built_in_root_certs(false)
                .add_root_certificate(ca)
                .identity(identity);
        }
        let client = builder
            .build()
            .map_err(|source| CodeSourceError::Client { source })?;
        Ok(Self { client, base })
    }

    fn endpoint(&self, environment: &str, segments: &[&str]) -> Result<Url, CacheError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| CacheError::sync(environment, "code source URI cannot be a base"))?
            .pop_if_empty()
            .extend(["puppet", "v3"])
            .extend(segments);
        url.query_pairs_mut().append_pair("environment", environment);
        Ok(url)
    }

    fn get(&self, environment: &str, url: Url, accept: &str) -> Result<Response, CacheError> {
        self.client
            .get(url)
            .header(ACCEPT, accept)
            .send()
            .map_err(|error| CacheError::sync(environment, error.to_string()))
    }

    fn list(&self, environment: &str, mount: &str) -> Result<Vec<FileMetadata>, CacheError> {
        let mut url = self.endpoint(environment, &["file_metadatas", mount])?;
        url.query_pairs_mut()
            .append_pair("recurse", "true")
            .append_pair("links", "follow")
            .append_pair("ignore", ".hg")
            .append_pair("checksum_type", "md5")
            .append_pair("source_permissions", "ignore");

        let response = self.get(environment, url, "application/json")?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(target: SOURCE_TARGET, environment, mount, "mount is empty");
            return Ok(Vec::new());
        }
        let response = checked(environment, response)?;
        response
            .json()
            .map_err(|error| CacheError::sync(environment, error.to_string()))
    }

    fn download(
        &self,
        environment: &str,
        mount: &str,
        relative: &str,
        incoming: &Path,
        target: &Path,
    ) -> Result<(), CacheError> {
        let mut segments = vec!["file_content", mount];
        segments.extend(relative.split('/').filter(|segment| !segment.is_empty()));
        let url = self.endpoint(environment, &segments)?;
        let response = checked(
            environment,
            self.get(environment, url, "application/octet-stream")?,
        )?;
        let content = response
            .bytes()
            .map_err(|error| CacheError::sync(environment, error.to_string()))?;
        write_atomically(incoming, target, &content)
    }
}

fn checked(environment: &str, response: Response) -> Result<Response, CacheError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(CacheError::sync(
            environment,
            format!("{} answered {status}", response.url()),
        ))
    }
}

fn write_atomically(incoming: &Path, target: &Path, content: &[u8]) -> Result<(), CacheError> {
    let parent = target.parent().unwrap_or(target);
    fs::create_dir_all(parent).map_err(|error| CacheError::storage(parent, error))?;
    let mut staged =
        NamedTempFile::new_in(incoming).map_err(|error| CacheError::storage(incoming, error))?;
    staged
        .write_all(content)
        .map_err(|error| CacheError::storage(staged.path(), error))?;
    staged
        .persist(target)
        .map_err(|error| CacheError::storage(target, error.error))?;
    Ok(())
}

impl CodeSource for FileServerSource {
    fn fetch(&self, environment: &str, destination: &Path) -> Result<(), CacheError> {
        // Same filesystem as the mounts, so the final rename stays atomic.
        let incoming = destination.join(INCOMING_DIR);
        fs::create_dir_all(&incoming).map_err(|error| CacheError::storage(&incoming, error))?;
        for mount in PLUGIN_MOUNTS {
            let root = destination.join(mount);
            fs::create_dir_all(&root).map_err(|error| CacheError::storage(&root, error))?;

            let entries = self.list(environment, mount)?;
            debug!(
                target: SOURCE_TARGET,
                environment,
                mount,
                entries = entries.len(),
                "listed mount"
            );
            for entry in entries {
                let relative = entry.relative_path.as_deref().unwrap_or(".");
                let target = contained_join(&root, relative).ok_or_else(|| {
                    CacheError::sync(
                        environment,
                        format!("refusing to stage '{relative}' outside '{}'", root.display()),
                    )
                })?;
                match entry.kind.as_str() {
                    "directory" => fs::create_dir_all(&target)
                        .map_err(|error| CacheError::storage(&target, error))?,
                    "file" => {
                        self.download(environment, mount, relative, &incoming, &target)?;
                    }
                    other => {
                        debug!(target: SOURCE_TARGET, relative, kind = other, "skipping entry");
                    }
                }
            }
        }
        Ok(())
    }
}
