//! Entry point for the rivet stdio daemon.
//!
//! All of the work happens in [`rivetd::run`]; this binary only hands over
//! the process arguments and locked standard streams.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let stdin = io::stdin().lock();
    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    rivetd::run(std::env::args_os(), stdin, &mut stdout, &mut stderr)
}
