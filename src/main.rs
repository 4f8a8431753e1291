//! aidocs - Local, versioned documentation for projects and AI agents

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = aidocs::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
