//! Isolated worker: runs one task or catalog unit received on stdin.

use std::io;
use std::process::ExitCode;

use ace_isolation::serve_unit_of_work;
use aced::execution::{
    DriverDirectory, ExecutionError, ExternalDriver, InlineExecutor, WorkReply, WorkRequest,
    perform,
};

fn main() -> ExitCode {
    // Logging is best effort; the reply on stdout is what matters.
    drop(aced::telemetry::initialise_worker());
    serve_unit_of_work(
        io::stdin().lock(),
        io::stdout().lock(),
        |request: WorkRequest| -> Result<WorkReply, ExecutionError> {
            let driver = ExternalDriver::new(DriverDirectory::new(request.driver_dir));
            let executor = InlineExecutor::new(driver.clone(), driver);
            perform(&executor, &request.unit)
        },
    )
}
