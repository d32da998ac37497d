//! Remote device targets and device-handle resolution.
//!
//! A target arrives as a loosely-typed JSON object. [`Target::remote`] turns
//! the task-flow descriptor into a typed [`Target`] once, at the request
//! boundary; [`resolve_device`] validates the catalog-flow descriptor into a
//! [`DeviceRequest`] and forwards it to a [`DeviceInitializer`].

mod resolver;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use self::resolver::{
    Connection, DeviceError, DeviceHandle, DeviceInitializer, DeviceRequest, ResolveError,
    build_device_request, resolve_device,
};

/// Key of the target descriptor naming the transport driver.
pub const TRANSPORT_KEY: &str = "remote-transport";

/// Key of the target descriptor holding an absolute connection URI.
pub const URI_KEY: &str = "uri";

const PROTOCOL_KEY: &str = "protocol";
const PROTOCOL_REMOTE: &str = "remote";
const NAME_KEYS: [&str; 2] = ["host", "name"];

/// A remote device reference for task execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Name the device is addressed by; `host` wins over `name`.
    pub name: String,
    /// Transport driver that reaches this device kind.
    pub transport: String,
    /// Every descriptor field plus the `protocol=remote` marker.
    pub options: Map<String, Value>,
}

impl Target {
    /// Builds a task target from a request descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InvalidParam`] when the descriptor lacks a
    /// string name (`host` or `name`) or a string transport.
    pub fn remote(descriptor: &Map<String, Value>) -> Result<Self, ResolveError> {
        let name = NAME_KEYS
            .iter()
            .find_map(|key| descriptor.get(*key).and_then(Value::as_str))
            .ok_or_else(|| ResolveError::invalid_target("'host' or 'name' not found"))?;
        let transport = descriptor
            .get(TRANSPORT_KEY)
            .and_then(Value::as_str)
            .ok_or_else(|| ResolveError::invalid_target("'transport' not found"))?;

        let mut options = descriptor.clone();
        options.insert(PROTOCOL_KEY.to_owned(), Value::from(PROTOCOL_REMOTE));

        Ok(Self {
            name: name.to_owned(),
            transport: transport.to_owned(),
            options,
        })
    }
}

#[cfg(test)]
mod tests;
