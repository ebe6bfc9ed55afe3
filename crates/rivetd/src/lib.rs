//! Stdio daemon for the rivet JSON-RPC 2.0 pipeline.
//!
//! `rivetd` resolves its [`rivet_config::Config`] from flags, `RIVET_*`
//! environment variables, and an optional TOML file named by
//! `--config-path`. It installs structured telemetry on stderr, and
//! serves the configured framing on stdin and stdout until the peer closes
//! the stream or calls `shutdown`. Lifecycle events go through a
//! [`HealthReporter`] so operators can follow bootstrap and session state.
//!
//! Exit codes follow the usual conventions: `0` after a normal end of
//! stream or a `shutdown` request, `0` for `--help`, `2` for
//! unusable arguments, and `1` for any other failure.

mod bootstrap;
mod health;
mod methods;
mod telemetry;

use std::ffi::OsString;
use std::io::{BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;

pub use bootstrap::{
    BootstrapError, CommandLineConfigLoader, ConfigLoader, Daemon, StaticConfigLoader,
    bootstrap_with,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use methods::{DAEMON_METHODS, daemon_registry};
pub use telemetry::{Telemetry, TelemetryError};

const RUN_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::run");

/// Runs the daemon with the process arguments and standard streams.
#[must_use]
pub fn run<I, R, W, E>(args: I, stdin: R, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: BufRead,
    W: Write + ?Sized,
    E: Write + ?Sized,
{
    let reporter: Arc<dyn HealthReporter> = Arc::new(StructuredHealthReporter::new());
    run_with_loader(args, &CommandLineConfigLoader, reporter, stdin, stdout, stderr)
}

/// Runs the daemon with a custom configuration loader and health reporter.
#[must_use]
pub fn run_with_loader<I, R, W, E>(
    args: I,
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    stdin: R,
    stdout: &mut W,
    stderr: &mut E,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: BufRead,
    W: Write + ?Sized,
    E: Write + ?Sized,
{
    let arguments: Vec<OsString> = args.into_iter().collect();
    let daemon = match bootstrap_with(loader, &arguments, reporter) {
        Ok(daemon) => daemon,
        Err(error) => {
            if let Some(cli) = error.command_line() {
                return report_cli_error(cli, stdout, stderr);
            }
            report(stderr, &format!("rivetd: {error}\n"));
            return ExitCode::FAILURE;
        }
    };

    match daemon.serve(stdin, stdout) {
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => {
            report(stderr, &format!("rivetd: {error}\n"));
            ExitCode::FAILURE
        }
    }
}

/// Prints a `clap` outcome the way `clap` itself would. Help output goes to
/// stdout with a zero exit code.
fn report_cli_error<W, E>(error: &clap::Error, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    W: Write + ?Sized,
    E: Write + ?Sized,
{
    let rendered = error.render().to_string();
    if error.use_stderr() {
        report(stderr, &rendered);
    } else {
        report(stdout, &rendered);
    }
    u8::try_from(error.exit_code()).map_or(ExitCode::FAILURE, ExitCode::from)
}

/// Writes `text` to `sink`. A sink that cannot be written to is logged and
/// otherwise ignored; the exit code already carries the outcome.
fn report<W: Write + ?Sized>(sink: &mut W, text: &str) {
    if let Err(error) = sink.write_all(text.as_bytes()).and_then(|()| sink.flush()) {
        tracing::warn!(
            target: RUN_TARGET,
            event = "report_failed",
            error = %error,
            "could not write to the output stream"
        );
    }
}

#[cfg(test)]
mod tests;
