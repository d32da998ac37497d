//! Process isolation for untrusted units of work.
//!
//! The `ace-isolation` crate runs one unit of work per operating system
//! process so that crashes, panics, or resource exhaustion inside device
//! drivers and compilers never reach the long-lived server. The parent and
//! the child exchange a single-line JSONL message in each direction over
//! standard I/O:
//!
//! 1. The parent spawns the worker command and writes one serialised work
//!    item to its stdin, then closes the pipe.
//! 2. The child reads the item, runs it, and writes one [`WorkOutcome`] line
//!    to stdout before exiting.
//! 3. The parent reads the outcome, drains stderr into the log, and waits
//!    for the exit status. Non-zero exits and signals become typed
//!    [`IsolationError`] values instead of propagating.
//!
//! No timeout is enforced. A child that blocks forever blocks its caller
//! forever.
//!
//! # Example
//!
//! ```rust,no_run
//! use ace_isolation::{ProcessIsolator, WorkerCommand};
//!
//! let isolator = ProcessIsolator::new(WorkerCommand::new("/usr/libexec/ace-worker"));
//! let doubled: u64 = isolator.isolate(&21_u64).expect("worker doubles its input");
//! assert_eq!(doubled, 42);
//! ```

pub mod child;
pub mod error;
pub mod process;
pub mod protocol;

pub use self::child::serve_unit_of_work;
pub use self::error::IsolationError;
pub use self::process::{ProcessIsolator, WorkerCommand};
pub use self::protocol::{WorkFault, WorkOutcome};
