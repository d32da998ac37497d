//! Child side of process isolation.
//!
//! A worker binary calls [`serve_unit_of_work`] from `main`, passing its
//! standard streams and a handler. The handler runs exactly once. Panics are
//! caught and reported as a `panic` fault so the parent receives a
//! structured outcome instead of a bare non-zero exit.

use std::any::Any;
use std::io::{BufRead, Write};
use std::panic::{self, AssertUnwindSafe};
use std::process::ExitCode;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::protocol::{self, WorkOutcome};

/// Fault class reported when the handler panics.
pub const PANIC_FAULT: &str = "panic";

/// Fault class reported when the work item cannot be read.
pub const PROTOCOL_FAULT: &str = "protocol";

/// Reads one work item from `input`, runs `handler`, and writes the outcome.
///
/// Handler errors are reported as faults classed by the error's type name.
/// Returns [`ExitCode::SUCCESS`] whenever an outcome was written, and
/// [`ExitCode::FAILURE`] only when the outcome itself could not be written.
pub fn serve_unit_of_work<R, W, In, Out, E, F>(input: R, mut output: W, handler: F) -> ExitCode
where
    R: BufRead,
    W: Write,
    In: DeserializeOwned,
    Out: Serialize,
    E: std::error::Error,
    F: FnOnce(In) -> Result<Out, E>,
{
    let outcome = match protocol::read_line::<_, In>(input) {
        Ok(Some(work)) => run_guarded(handler, work),
        Ok(None) => WorkOutcome::faulted(PROTOCOL_FAULT, "no work item received on stdin"),
        Err(error) => WorkOutcome::faulted(PROTOCOL_FAULT, error.to_string()),
    };

    match protocol::write_line(&mut output, &outcome) {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}

fn run_guarded<In, Out, E, F>(handler: F, work: In) -> WorkOutcome<Out>
where
    E: std::error::Error,
    F: FnOnce(In) -> Result<Out, E>,
{
    match panic::catch_unwind(AssertUnwindSafe(move || handler(work))) {
        Ok(Ok(value)) => WorkOutcome::completed(value),
        Ok(Err(error)) => WorkOutcome::faulted(error_class(&error), error.to_string()),
        Err(payload) => WorkOutcome::faulted(PANIC_FAULT, panic_message(payload.as_ref())),
    }
}

fn error_class<E>(_error: &E) -> String {
    let name = std::any::type_name::<E>();
    name.rsplit("::").next().unwrap_or(name).to_owned()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_owned();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    String::from("worker panicked")
}
