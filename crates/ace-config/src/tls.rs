//! Loads the TLS material presented to the code source.
//!
//! The bundle is opaque to this crate: files are read as PEM bytes and handed
//! to whichever HTTP client needs them.

use std::fs;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

use crate::Config;

/// Individual TLS settings, named as they appear in the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum TlsSetting {
    /// `ssl-cert`
    #[strum(serialize = "ssl-cert")]
    Cert,
    /// `ssl-key`
    #[strum(serialize = "ssl-key")]
    Key,
    /// `ssl-ca-cert`
    #[strum(serialize = "ssl-ca-cert")]
    CaCert,
    /// `ssl-ca-crls`
    #[strum(serialize = "ssl-ca-crls")]
    CaCrls,
}

/// Errors raised while reading TLS material.
#[derive(Debug, Error)]
pub enum TlsError {
    /// Some, but not all, TLS settings were provided.
    #[error("TLS setting '{setting}' is required when any TLS setting is configured")]
    MissingSetting {
        /// Setting that was absent.
        setting: TlsSetting,
    },
    /// A configured file could not be read.
    #[error("failed to read TLS file '{path}': {source}")]
    Read {
        /// Path that failed to read.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },
}

/// PEM-encoded credentials for mutually authenticated TLS.
#[derive(Clone, PartialEq, Eq)]
pub struct TlsBundle {
    /// Client certificate chain.
    pub client_cert: Vec<u8>,
    /// Private key for `client_cert`.
    pub private_key: Vec<u8>,
    /// Trusted certificate authority.
    pub ca_cert: Vec<u8>,
    /// Revocation list issued by the CA.
    pub ca_crls: Vec<u8>,
}

impl std::fmt::Debug for TlsBundle {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("TlsBundle")
            .field("client_cert", &self.client_cert.len())
            .field("private_key", &"<redacted>")
            .field("ca_cert", &self.ca_cert.len())
            .field("ca_crls", &self.ca_crls.len())
            .finish()
    }
}

impl TlsBundle {
    /// Reads the bundle named by `config`.
    ///
    /// Returns `Ok(None)` when no TLS setting is configured at all.
    ///
    /// # Errors
    ///
    /// Returns [`TlsError::MissingSetting`] when the settings are only
    /// partially configured, or [`TlsError::Read`] when a file is unreadable.
    pub fn load(config: &Config) -> Result<Option<Self>, TlsError> {
        let settings = [
            (TlsSetting::Cert, config.ssl_cert.as_deref()),
            (TlsSetting::Key, config.ssl_key.as_deref()),
            (TlsSetting::CaCert, config.ssl_ca_cert.as_deref()),
            (TlsSetting::CaCrls, config.ssl_ca_crls.as_deref()),
        ];
        if settings.iter().all(|(_, path)| path.is_none()) {
            return Ok(None);
        }

        let read_setting = |setting: TlsSetting, path: Option<&Utf8Path>| {
            path.ok_or(TlsError::MissingSetting { setting })
                .and_then(read_pem)
        };
        let [cert, key, ca_cert, ca_crls] = settings;
        Ok(Some(Self {
            client_cert: read_setting(cert.0, cert.1)?,
            private_key: read_setting(key.0, key.1)?,
            ca_cert: read_setting(ca_cert.0, ca_cert.1)?,
            ca_crls: read_setting(ca_crls.0, ca_crls.1)?,
        }))
    }

    /// Client certificate followed by its private key, as expected by
    /// PEM identity loaders.
    #[must_use]
    pub fn identity_pem(&self) -> Vec<u8> {
        let mut pem = self.client_cert.clone();
        if !pem.ends_with(b"\n") {
            pem.push(b'\n');
        }
        pem.extend_from_slice(&self.private_key);
        pem
    }
}

fn read_pem(path: &Utf8Path) -> Result<Vec<u8>, TlsError> {
    fs::read(path).map_err(|source| TlsError::Read {
        path: path.to_path_buf(),
        source: Arc::new(source),
    })
}
