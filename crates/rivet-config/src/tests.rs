//! Unit tests for configuration defaults, parsing, and validation.

use rstest::rstest;

use super::*;

#[test]
fn defaults_match_documented_values() {
    let config = Config::default();
    assert_eq!(config.framing(), FramingMode::Delimited);
    assert!(config.skip_blank_lines);
    assert_eq!(config.max_frame_bytes, 16 * 1024 * 1024);
    assert_eq!(config.max_header_line_bytes, 8 * 1024);
    assert_eq!(config.scratch_retain_bytes, 64 * 1024);
    assert_eq!(config.log_filter(), "info");
    assert_eq!(config.log_format(), LogFormat::Compact);
}

#[rstest]
#[case("delimited", FramingMode::Delimited)]
#[case("content_length", FramingMode::ContentLength)]
#[case("Content_Length", FramingMode::ContentLength)]
fn framing_mode_parses_case_insensitively(#[case] text: &str, #[case] expected: FramingMode) {
    assert_eq!(text.parse::<FramingMode>(), Ok(expected));
}

#[test]
fn framing_mode_rejects_unknown_values() {
    assert!("lines".parse::<FramingMode>().is_err());
}

#[rstest]
#[case(LogFormat::Json, "json")]
#[case(LogFormat::Compact, "compact")]
fn log_format_displays_snake_case(#[case] format: LogFormat, #[case] expected: &str) {
    assert_eq!(format.to_string(), expected);
}

#[test]
fn command_line_flags_override_defaults() {
    let config = Config::resolve([
        "rivetd",
        "--framing",
        "content_length",
        "--max-frame-bytes",
        "1024",
        "--log-format",
        "json",
    ])
    .expect("flags should parse");
    assert_eq!(config.framing(), FramingMode::ContentLength);
    assert_eq!(config.max_frame_bytes, 1024);
    assert_eq!(config.max_header_line_bytes, DEFAULT_MAX_HEADER_LINE_BYTES);
    assert_eq!(config.log_format(), LogFormat::Json);
}

#[rstest]
#[case("--max-frame-bytes", "max_frame_bytes")]
#[case("--max-header-line-bytes", "max_header_line_bytes")]
fn zero_limits_are_rejected(#[case] flag: &str, #[case] field: &str) {
    let error = Config::resolve(["rivetd", flag, "0"]).expect_err("zero limit");
    assert!(
        matches!(error, ConfigError::ZeroLimit { field: name } if name == field),
        "unexpected error: {error}"
    );
}

#[test]
fn unknown_flags_surface_as_command_line_errors() {
    let error = Config::resolve(["rivetd", "--no-such-flag"]).expect_err("unknown flag");
    let cli = error.command_line().expect("clap error");
    assert_eq!(cli.kind(), clap::error::ErrorKind::UnknownArgument);
}

#[test]
fn help_requests_surface_as_command_line_errors() {
    let error = Config::resolve(["rivetd", "--help"]).expect_err("help");
    let cli = error.command_line().expect("clap error");
    assert_eq!(cli.kind(), clap::error::ErrorKind::DisplayHelp);
    assert!(!cli.use_stderr());
}

#[test]
fn validation_failures_are_not_command_line_errors() {
    let error = ConfigError::ZeroLimit {
        field: "max_frame_bytes",
    };
    assert!(error.command_line().is_none());
}

#[test]
fn missing_fields_deserialise_to_defaults() {
    let config: Config =
        serde_json::from_str(r#"{"framing":"content_length"}"#).expect("partial config");
    assert_eq!(config.framing(), FramingMode::ContentLength);
    assert_eq!(config.max_frame_bytes, DEFAULT_MAX_FRAME_BYTES);
}
