//! Parent side of process isolation.
//!
//! [`ProcessIsolator`] spawns a fresh worker process per call, writes the work
//! item to its stdin as a single JSONL line, reads one [`WorkOutcome`] line
//! from its stdout, and waits for exit. The calling thread blocks until the
//! child has exited. Stderr is drained on a helper thread so a chatty child
//! can never deadlock on a full pipe, and whatever it wrote is logged.

use std::ffi::OsString;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::IsolationError;
use crate::protocol::WorkOutcome;

/// Tracing target for isolation operations.
const ISOLATION_TARGET: &str = "ace_isolation::process";

/// Program and arguments used to start a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    program: PathBuf,
    args: Vec<OsString>,
    envs: Vec<(OsString, OsString)>,
}

impl WorkerCommand {
    /// Creates a command running `program` without arguments.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    /// Appends an argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Sets an environment variable for the child.
    #[must_use]
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Program that will be executed.
    #[must_use]
    pub fn program(&self) -> &Path {
        self.program.as_path()
    }

    fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .envs(self.envs.iter().map(|(key, value)| (key, value)))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }
}

/// Runs each unit of work in its own operating system process.
///
/// The isolator holds no per-call state and may be shared between threads;
/// concurrent calls spawn independent children.
#[derive(Debug, Clone)]
pub struct ProcessIsolator {
    command: WorkerCommand,
}

impl ProcessIsolator {
    /// Creates an isolator that starts children with `command`.
    #[must_use]
    pub const fn new(command: WorkerCommand) -> Self {
        Self { command }
    }

    /// Runs `work` in a fresh child process and returns its result.
    ///
    /// Blocks until the child exits. There is no timeout.
    ///
    /// # Errors
    ///
    /// Returns an [`IsolationError`] when the child cannot be spawned, exits
    /// abnormally, is killed by a signal, reports a fault, or writes output
    /// that does not decode as a [`WorkOutcome`] of `T`.
    pub fn isolate<W, T>(&self, work: &W) -> Result<T, IsolationError>
    where
        W: Serialize,
        T: DeserializeOwned,
    {
        let payload = serde_json::to_vec(work).map_err(|error| IsolationError::SerializeWork {
            message: error.to_string(),
        })?;

        let program = self.command.program();
        debug!(
            target: ISOLATION_TARGET,
            program = %program.display(),
            request_bytes = payload.len(),
            "spawning isolated worker"
        );

        let mut child = self
            .command
            .to_command()
            .spawn()
            .map_err(|source| IsolationError::Spawn {
                program: program.to_path_buf(),
                source: Arc::new(source),
            })?;

        let stderr = child.stderr.take().map(spawn_stderr_drain);
        let write_result = write_work(&mut child, &payload);
        let read_result = read_outcome_line(&mut child);
        let status = child.wait().map_err(IsolationError::io)?;
        log_stderr(stderr);

        debug!(
            target: ISOLATION_TARGET,
            program = %program.display(),
            ?status,
            "isolated worker exited"
        );

        classify_termination(status)?;
        write_result?;
        decode_outcome(read_result?)
    }
}

fn write_work(child: &mut Child, payload: &[u8]) -> Result<(), IsolationError> {
    let mut stdin = child.stdin.take().ok_or_else(|| {
        IsolationError::io(std::io::Error::other("worker stdin was not captured"))
    })?;
    stdin.write_all(payload).map_err(IsolationError::io)?;
    stdin.write_all(b"\n").map_err(IsolationError::io)?;
    stdin.flush().map_err(IsolationError::io)
    // Dropping stdin closes the pipe and signals the end of input.
}

fn read_outcome_line(child: &mut Child) -> Result<String, IsolationError> {
    let stdout = child.stdout.take().ok_or_else(|| {
        IsolationError::io(std::io::Error::other("worker stdout was not captured"))
    })?;
    let mut reader = BufReader::new(stdout);
    let mut line = String::new();
    let bytes_read = reader.read_line(&mut line).map_err(IsolationError::io)?;
    if bytes_read == 0 {
        return Err(IsolationError::NoOutput);
    }
    Ok(line)
}

fn classify_termination(status: ExitStatus) -> Result<(), IsolationError> {
    if status.success() {
        return Ok(());
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            warn!(target: ISOLATION_TARGET, signal, "isolated worker killed by signal");
            return Err(IsolationError::Signalled { signal });
        }
    }
    let code = status.code().unwrap_or(-1);
    warn!(target: ISOLATION_TARGET, code, "isolated worker exited abnormally");
    Err(IsolationError::AbnormalExit { code })
}

fn decode_outcome<T: DeserializeOwned>(line: String) -> Result<T, IsolationError> {
    let outcome: WorkOutcome<T> =
        serde_json::from_str(line.trim()).map_err(|error| IsolationError::InvalidOutput {
            message: error.to_string(),
        })?;
    match outcome {
        WorkOutcome::Completed { value } => Ok(value),
        WorkOutcome::Faulted(fault) => Err(IsolationError::Faulted {
            class: fault.class().to_owned(),
            message: fault.message().to_owned(),
        }),
    }
}

fn spawn_stderr_drain(stderr: impl Read + Send + 'static) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buffer = String::new();
        // Partial output is still worth logging if the pipe errors midway.
        drop(BufReader::new(stderr).read_to_string(&mut buffer));
        buffer
    })
}

fn log_stderr(handle: Option<JoinHandle<String>>) {
    let Some(handle) = handle else {
        return;
    };
    match handle.join() {
        Ok(output) if !output.trim().is_empty() => debug!(
            target: ISOLATION_TARGET,
            stderr = %output.trim(),
            "isolated worker stderr output"
        ),
        Ok(_) => {}
        Err(_) => warn!(target: ISOLATION_TARGET, "stderr drain thread panicked"),
    }
}

#[cfg(all(test, unix))]
mod tests;
