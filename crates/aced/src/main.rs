use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    match aced::run_server() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            drop(writeln!(io::stderr(), "aced: {error}"));
            ExitCode::FAILURE
        }
    }
}
