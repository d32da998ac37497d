//! Wire types exchanged between the parent and an isolated child.
//!
//! Both directions carry exactly one JSON document terminated by a newline.
//! The parent sends the work item in whatever shape the caller chose; the
//! child answers with a [`WorkOutcome`].

use std::io::{self, BufRead, Write};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Result line written by the child to stdout.
///
/// # Example
///
/// ```
/// use ace_isolation::WorkOutcome;
///
/// let outcome = WorkOutcome::completed(7_u8);
/// let line = serde_json::to_string(&outcome).unwrap();
/// assert_eq!(line, r#"{"outcome":"completed","value":7}"#);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WorkOutcome<T> {
    /// The unit of work returned normally.
    Completed {
        /// Value returned by the unit of work.
        value: T,
    },
    /// The unit of work raised a fault that the child caught.
    Faulted(WorkFault),
}

impl<T> WorkOutcome<T> {
    /// Wraps a returned value.
    #[must_use]
    pub const fn completed(value: T) -> Self {
        Self::Completed { value }
    }

    /// Wraps a caught fault.
    #[must_use]
    pub fn faulted(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Faulted(WorkFault::new(class, message))
    }
}

/// Description of a fault raised inside the child.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkFault {
    class: String,
    message: String,
}

impl WorkFault {
    /// Creates a fault description.
    #[must_use]
    pub fn new(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            message: message.into(),
        }
    }

    /// Category of the fault, such as `panic` or `protocol`.
    #[must_use]
    pub const fn class(&self) -> &str {
        self.class.as_str()
    }

    /// Human-readable description.
    #[must_use]
    pub const fn message(&self) -> &str {
        self.message.as_str()
    }
}

/// Writes `message` as a single JSONL line and flushes the writer.
///
/// # Errors
///
/// Returns an error when serialisation or the underlying write fails.
pub fn write_line<W: Write, T: Serialize>(mut writer: W, message: &T) -> io::Result<()> {
    serde_json::to_writer(&mut writer, message).map_err(io::Error::from)?;
    writer.write_all(b"\n")?;
    writer.flush()
}

/// Reads one JSONL line and decodes it.
///
/// Returns `Ok(None)` when the stream ends before any byte is read.
///
/// # Errors
///
/// Returns an error when reading fails or the line is not valid JSON for `T`.
pub fn read_line<R: BufRead, T: DeserializeOwned>(mut reader: R) -> io::Result<Option<T>> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    serde_json::from_str(line.trim())
        .map(Some)
        .map_err(io::Error::from)
}
