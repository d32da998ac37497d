//! Validation of catalog-flow target descriptors into device requests.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

use super::{TRANSPORT_KEY, URI_KEY};

const TARGET_PARSE_PREFIX: &str = "There was an error parsing the target.";

/// Connection value of a device request: a URI or the attribute mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Connection {
    /// Absolute URI, passed through unmodified.
    Uri(String),
    /// Flat connection attributes with the transport key removed.
    Attributes(Map<String, Value>),
}

/// Request handed to the external device initializer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRequest {
    /// Transport name.
    pub provider: String,
    /// Connection value.
    pub url: Connection,
    /// Device certname.
    pub name: String,
    /// Initializer options; always empty.
    pub options: Map<String, Value>,
}

/// Handle returned by a successful device initialisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceHandle {
    /// Request the handle was initialised from.
    pub request: DeviceRequest,
    /// Driver executable serving the device.
    pub driver: PathBuf,
}

/// Failure reported by an external device initializer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to initialise device '{name}' over '{transport}': {message}")]
pub struct DeviceError {
    /// Device certname.
    pub name: String,
    /// Transport name.
    pub transport: String,
    /// Initializer diagnostic.
    pub message: String,
}

/// External collaborator that turns a device request into a usable handle.
pub trait DeviceInitializer: Send + Sync {
    /// Initialises the device described by `request`.
    fn initialize(&self, request: &DeviceRequest) -> Result<DeviceHandle, DeviceError>;
}

/// Failures surfaced by [`resolve_device`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The descriptor or its companions failed validation.
    #[error("{message}")]
    InvalidParam {
        /// Human-readable reason naming the offending parameter.
        message: String,
    },
    /// The initializer rejected a valid request.
    #[error(transparent)]
    Device(#[from] DeviceError),
}

impl ResolveError {
    pub(super) fn invalid_target(reason: &str) -> Self {
        Self::InvalidParam {
            message: format!("{TARGET_PARSE_PREFIX} {reason}"),
        }
    }

    /// Error kind reported to clients.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidParam { .. } => "invalid_param",
            Self::Device(_) => "device_error",
        }
    }
}

/// Validates the descriptor and builds the device request without calling
/// the initializer.
///
/// Checks run in order and the first failure wins: target present, certname
/// present, transport present, then a set `uri` entry must be an absolute
/// URI.
///
/// # Errors
///
/// Returns [`ResolveError::InvalidParam`] naming the failed check.
pub fn build_device_request(
    certname: Option<&str>,
    transport: Option<&str>,
    target: Option<&Map<String, Value>>,
) -> Result<DeviceRequest, ResolveError> {
    let target = target.ok_or_else(|| ResolveError::invalid_target("'target' not found"))?;
    let certname = certname.ok_or_else(|| ResolveError::InvalidParam {
        message: "There was an error parsing the compiler details. 'certname' not found".to_owned(),
    })?;
    let transport = transport.ok_or_else(|| ResolveError::invalid_target("'transport' not found"))?;

    // `null` and `false` count as no URI.
    let url = match target.get(URI_KEY) {
        Some(uri) if !matches!(uri, Value::Null | Value::Bool(false)) => {
            Connection::Uri(absolute_uri(uri)?)
        }
        _ => {
            let mut attributes = target.clone();
            attributes.remove(TRANSPORT_KEY);
            Connection::Attributes(attributes)
        }
    };

    Ok(DeviceRequest {
        provider: transport.to_owned(),
        url,
        name: certname.to_owned(),
        options: Map::new(),
    })
}

fn absolute_uri(value: &Value) -> Result<String, ResolveError> {
    let invalid = || ResolveError::InvalidParam {
        message: "There was an error parsing the URI of the target".to_owned(),
    };
    let text = value.as_str().ok_or_else(invalid)?;
    Url::parse(text).map_err(|_| invalid())?;
    Ok(text.to_owned())
}

/// Resolves a device handle for `certname` reachable over `transport`.
///
/// Pure aside from the single call to `initializer`; initializer failures
/// propagate unchanged.
///
/// # Errors
///
/// Returns the first validation failure from [`build_device_request`], or
/// the initializer's [`DeviceError`].
pub fn resolve_device(
    certname: Option<&str>,
    transport: Option<&str>,
    target: Option<&Map<String, Value>>,
    initializer: &dyn DeviceInitializer,
) -> Result<DeviceHandle, ResolveError> {
    let request = build_device_request(certname, transport, target)?;
    Ok(initializer.initialize(&request)?)
}
