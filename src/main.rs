//! taskdag - task dependencies without the loops

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = taskdag::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
