//! catalogctl - Inspect document catalog snapshot dumps

use std::process::ExitCode;

fn main() -> ExitCode {
    match docpart_catalog::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
