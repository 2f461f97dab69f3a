//! Command-line interface entry point for `whilst`.

use std::process::ExitCode;

fn main() -> ExitCode {
    // Delegate to the shared entry_point function so the binary and the
    // output-capturing tests exercise identical behavior.
    match whilst::entry_point::run_with_args(std::env::args().skip(1).collect()) {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
