//! Removal of diagnostic keys from results before they leave the service.

use serde_json::Value;

const DETAILS_POINTER: &str = "/result/_error/details";
const SCRUBBED_KEYS: [&str; 2] = ["stack_trace", "backtrace"];

/// Removes `stack_trace` and `backtrace` from `result._error.details`.
///
/// Every other key is left untouched; a payload without those keys comes
/// back unchanged.
#[must_use]
pub fn scrub(mut payload: Value) -> Value {
    if let Some(details) = payload
        .pointer_mut(DETAILS_POINTER)
        .and_then(Value::as_object_mut)
    {
        for key in SCRUBBED_KEYS {
            details.remove(key);
        }
    }
    payload
}
