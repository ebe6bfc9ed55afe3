//! Unit tests for daemon bootstrap and the run entry point.

use std::ffi::OsString;
use std::io::Cursor;
use std::process::ExitCode;
use std::sync::Arc;

use mockall::{mock, predicate::eq};
use rivet_config::{Config, ConfigError, FramingMode, LogFormat};
use rivet_framing::{FramingError, StreamEnd};
use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;

mock! {
    Reporter {}
    impl HealthReporter for Reporter {
        fn bootstrap_starting(&self);
        fn bootstrap_succeeded(&self, config: &Config);
        fn bootstrap_failed(&self, error: &BootstrapError);
        fn session_started(&self, framing: FramingMode);
        fn session_finished(&self, end: StreamEnd);
        fn session_failed(&self, error: &FramingError);
    }
}

struct Outcome {
    exit: ExitCode,
    stdout: String,
    stderr: String,
}

fn args(values: &[&str]) -> Vec<OsString> {
    values.iter().map(OsString::from).collect()
}

fn run_daemon(
    loader: &dyn ConfigLoader,
    arguments: &[&str],
    reporter: Arc<dyn HealthReporter>,
    input: &str,
) -> Outcome {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let exit = run_with_loader(
        args(arguments),
        loader,
        reporter,
        Cursor::new(input.as_bytes().to_vec()),
        &mut stdout,
        &mut stderr,
    );
    Outcome {
        exit,
        stdout: String::from_utf8(stdout).expect("utf-8 stdout"),
        stderr: String::from_utf8(stderr).expect("utf-8 stderr"),
    }
}

#[fixture]
fn quiet() -> Arc<dyn HealthReporter> {
    let mut reporter = MockReporter::new();
    reporter.expect_bootstrap_starting().return_const(());
    reporter.expect_bootstrap_succeeded().return_const(());
    reporter.expect_bootstrap_failed().return_const(());
    reporter.expect_session_started().return_const(());
    reporter.expect_session_finished().return_const(());
    reporter.expect_session_failed().return_const(());
    Arc::new(reporter)
}

#[test]
fn bootstrap_reports_success() {
    let mut reporter = MockReporter::new();
    reporter.expect_bootstrap_starting().times(1).return_const(());
    reporter
        .expect_bootstrap_succeeded()
        .withf(|config: &Config| config.framing() == FramingMode::ContentLength)
        .times(1)
        .return_const(());
    reporter.expect_bootstrap_failed().never();

    let config = Config {
        framing: FramingMode::ContentLength,
        ..Config::default()
    };
    let daemon = bootstrap_with(
        &StaticConfigLoader::new(config.clone()),
        &args(&["rivetd"]),
        Arc::new(reporter),
    )
    .expect("bootstrap succeeds");

    assert_eq!(daemon.config(), &config);
    assert_eq!(daemon.registry().methods(), DAEMON_METHODS);
}

#[test]
fn bootstrap_reports_configuration_failures() {
    let mut reporter = MockReporter::new();
    reporter.expect_bootstrap_starting().times(1).return_const(());
    reporter
        .expect_bootstrap_failed()
        .withf(|error: &BootstrapError| matches!(error, BootstrapError::Configuration { .. }))
        .times(1)
        .return_const(());
    reporter.expect_bootstrap_succeeded().never();

    let result = bootstrap_with(
        &CommandLineConfigLoader,
        &args(&["rivetd", "--max-frame-bytes", "0"]),
        Arc::new(reporter),
    );

    assert!(matches!(
        result,
        Err(BootstrapError::Configuration {
            source: ConfigError::ZeroLimit {
                field: "max_frame_bytes"
            }
        })
    ));
}

#[test]
fn serving_reports_the_session() {
    let mut reporter = MockReporter::new();
    reporter.expect_bootstrap_starting().return_const(());
    reporter.expect_bootstrap_succeeded().return_const(());
    reporter
        .expect_session_started()
        .with(eq(FramingMode::Delimited))
        .times(1)
        .return_const(());
    reporter
        .expect_session_finished()
        .with(eq(StreamEnd::Stopped))
        .times(1)
        .return_const(());
    reporter.expect_session_failed().never();

    let outcome = run_daemon(
        &StaticConfigLoader::new(Config::default()),
        &["rivetd"],
        Arc::new(reporter),
        "{\"jsonrpc\":\"2.0\",\"method\":\"shutdown\",\"id\":1}\n",
    );
    assert_eq!(outcome.exit, ExitCode::SUCCESS);
    assert!(outcome.stdout.is_empty());
}

#[rstest]
fn delimited_requests_are_answered_on_stdout(quiet: Arc<dyn HealthReporter>) {
    let input = concat!(
        r#"{"jsonrpc":"2.0","method":"echo","params":["hi"],"id":1}"#,
        "\n",
        r#"{"jsonrpc":"2.0","method":"add","params":[2,3],"id":2}"#,
        "\n",
    );
    let outcome = run_daemon(&CommandLineConfigLoader, &["rivetd"], quiet, input);

    assert_eq!(outcome.exit, ExitCode::SUCCESS);
    assert_eq!(
        outcome.stdout,
        concat!(
            r#"{"jsonrpc":"2.0","result":"hi","id":1}"#,
            "\n",
            r#"{"jsonrpc":"2.0","result":5,"id":2}"#,
            "\n",
        )
    );
}

#[rstest]
fn content_length_framing_is_selected_by_flag(quiet: Arc<dyn HealthReporter>) {
    let body = r#"{"jsonrpc":"2.0","method":"echo","params":["hi"],"id":1}"#;
    let input = format!("Content-Length: {}\r\n\r\n{body}", body.len());
    let outcome = run_daemon(
        &CommandLineConfigLoader,
        &["rivetd", "--framing", "content_length"],
        quiet,
        &input,
    );

    let reply = r#"{"jsonrpc":"2.0","result":"hi","id":1}"#;
    assert_eq!(
        outcome.stdout,
        format!("Content-Length: {}\r\n\r\n{reply}", reply.len())
    );
}

#[rstest]
fn configuration_files_select_the_framing(quiet: Arc<dyn HealthReporter>) {
    let directory = TempDir::new().expect("temporary directory");
    let path = directory.path().join("rivet.toml");
    std::fs::write(&path, "framing = \"content_length\"\n").expect("write rivet.toml");
    let config_path = path.to_string_lossy().into_owned();

    let body = r#"{"jsonrpc":"2.0","method":"echo","params":["file"],"id":1}"#;
    let input = format!("Content-Length: {}\r\n\r\n{body}", body.len());
    let outcome = run_daemon(
        &CommandLineConfigLoader,
        &["rivetd", "--config-path", &config_path],
        quiet,
        &input,
    );

    let reply = r#"{"jsonrpc":"2.0","result":"file","id":1}"#;
    assert_eq!(outcome.exit, ExitCode::SUCCESS);
    assert_eq!(
        outcome.stdout,
        format!("Content-Length: {}\r\n\r\n{reply}", reply.len())
    );
}

#[rstest]
fn help_is_printed_to_stdout(quiet: Arc<dyn HealthReporter>) {
    let outcome = run_daemon(&CommandLineConfigLoader, &["rivetd", "--help"], quiet, "");
    assert_eq!(outcome.exit, ExitCode::SUCCESS);
    assert!(outcome.stdout.contains("Usage"));
    assert!(outcome.stderr.is_empty());
}

#[rstest]
fn unknown_flags_exit_with_usage_status(quiet: Arc<dyn HealthReporter>) {
    let outcome = run_daemon(&CommandLineConfigLoader, &["rivetd", "--bogus"], quiet, "");
    assert_eq!(outcome.exit, ExitCode::from(2));
    assert!(outcome.stderr.contains("--bogus"));
}

#[rstest]
fn invalid_limits_fail_bootstrap(quiet: Arc<dyn HealthReporter>) {
    let outcome = run_daemon(
        &CommandLineConfigLoader,
        &["rivetd", "--max-header-line-bytes", "0"],
        quiet,
        "",
    );
    assert_eq!(outcome.exit, ExitCode::FAILURE);
    assert!(outcome.stderr.contains("max_header_line_bytes must be greater than zero"));
}

#[rstest]
fn malformed_log_filters_fail_bootstrap(quiet: Arc<dyn HealthReporter>) {
    let config = Config {
        log_filter: "rivetd=loudest".to_owned(),
        ..Config::default()
    };
    let result = bootstrap_with(&StaticConfigLoader::new(config), &args(&["rivetd"]), quiet);
    let Err(error) = result else {
        panic!("bootstrap should fail");
    };
    assert!(error.command_line().is_none());
    assert!(matches!(
        error,
        BootstrapError::Telemetry {
            source: TelemetryError::Filter { .. }
        }
    ));
}

#[rstest]
fn bootstrap_records_the_live_log_format(quiet: Arc<dyn HealthReporter>) {
    let daemon = bootstrap_with(
        &StaticConfigLoader::new(Config::default()),
        &args(&["rivetd"]),
        quiet,
    )
    .expect("bootstrap succeeds");
    assert_eq!(daemon.telemetry().format(), LogFormat::Compact);
}
