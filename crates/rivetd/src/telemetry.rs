//! Log output for the daemon.
//!
//! Stdout is the protocol channel, so every log line goes to stderr. The
//! subscriber is process-global and can only be installed once; a second
//! bootstrap in the same process keeps the first subscriber and reports which
//! format is actually live through [`Telemetry::Reused`].

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::Subscriber;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::fmt::{self, MakeWriter};

use rivet_config::{Config, LogFormat};

const TELEMETRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::telemetry");

/// Format of the subscriber installed by the first successful bootstrap.
static INSTALLED_FORMAT: OnceCell<LogFormat> = OnceCell::new();

/// Outcome of [`initialise`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Telemetry {
    /// This call installed the global subscriber.
    Installed {
        /// Format of the new subscriber.
        format: LogFormat,
    },
    /// An earlier call installed the subscriber; its settings stay in force.
    Reused {
        /// Format of the subscriber already in place.
        format: LogFormat,
    },
}

impl Telemetry {
    /// Format of the live subscriber.
    #[must_use]
    pub const fn format(self) -> LogFormat {
        match self {
            Self::Installed { format } | Self::Reused { format } => format,
        }
    }
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured log filter is not a valid directive list.
    #[error("invalid log filter '{directive}': {source}")]
    Filter {
        /// The directive text as configured.
        directive: String,
        /// Parser failure.
        #[source]
        source: ParseError,
    },
    /// Some other subscriber already owns the global default.
    #[error("another tracing subscriber is already installed: {0}")]
    Install(#[source] SetGlobalDefaultError),
}

/// Installs the stderr subscriber described by `config`.
///
/// Only the first successful call installs anything. The filter is still
/// parsed on later calls, so a bad `log_filter` is reported even when it
/// would not take effect.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] for a malformed filter and
/// [`TelemetryError::Install`] when a foreign subscriber was installed first.
pub fn initialise(config: &Config) -> Result<Telemetry, TelemetryError> {
    let filter = parse_filter(config.log_filter())?;
    if let Some(format) = INSTALLED_FORMAT.get() {
        return Ok(reused(*format, config.log_format()));
    }

    let mut installed = false;
    let format = INSTALLED_FORMAT.get_or_try_init(|| {
        let subscriber = build_subscriber(
            filter,
            config.log_format(),
            io::stderr,
            io::stderr().is_terminal(),
        );
        tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Install)?;
        installed = true;
        Ok::<_, TelemetryError>(config.log_format())
    })?;

    if installed {
        Ok(Telemetry::Installed { format: *format })
    } else {
        Ok(reused(*format, config.log_format()))
    }
}

fn reused(active: LogFormat, requested: LogFormat) -> Telemetry {
    if active != requested {
        tracing::debug!(
            target: TELEMETRY_TARGET,
            event = "telemetry_reused",
            active = %active,
            requested = %requested,
            "keeping the log format installed by an earlier bootstrap"
        );
    }
    Telemetry::Reused { format: active }
}

pub(crate) fn parse_filter(directive: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(directive).map_err(|source| TelemetryError::Filter {
        directive: directive.to_owned(),
        source,
    })
}

/// Builds a subscriber writing `format` lines through `writer`.
///
/// Timestamps are RFC 3339 in UTC. JSON output lifts event fields to the top
/// level so `event` sits beside `target` and `level`.
pub(crate) fn build_subscriber<W>(
    filter: EnvFilter,
    format: LogFormat,
    writer: W,
    ansi: bool,
) -> Box<dyn Subscriber + Send + Sync>
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(writer)
        .with_timer(fmt::time::UtcTime::rfc_3339());

    match format {
        LogFormat::Json => Box::new(builder.with_ansi(false).json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder.with_ansi(ansi).compact().finish()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex, PoisonError};

    use rstest::rstest;
    use serde_json::Value;

    use super::*;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            let bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner);
            String::from_utf8(bytes.clone()).expect("utf-8 log output")
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
            self.0
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend_from_slice(bytes);
            Ok(bytes.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'writer> MakeWriter<'writer> for Captured {
        type Writer = Self;

        fn make_writer(&'writer self) -> Self::Writer {
            self.clone()
        }
    }

    fn capture(directive: &str, format: LogFormat) -> String {
        let sink = Captured::default();
        let filter = parse_filter(directive).expect("valid filter");
        let subscriber = build_subscriber(filter, format, sink.clone(), false);
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "rivetd::session", event = "session_started", "serving");
            tracing::debug!(target: "rivetd::session", event = "frame_read", "frame");
        });
        sink.text()
    }

    #[test]
    fn json_lines_carry_event_fields_at_top_level() {
        let output = capture("info", LogFormat::Json);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 1, "unexpected output: {output}");
        let record: Value =
            serde_json::from_str(lines.first().copied().unwrap_or_default()).expect("json line");
        let field = |name: &str| record.get(name).and_then(Value::as_str).unwrap_or_default();
        assert_eq!(field("event"), "session_started");
        assert_eq!(field("target"), "rivetd::session");
        assert_eq!(field("level"), "INFO");
        assert!(field("timestamp").ends_with('Z'));
    }

    #[test]
    fn compact_lines_are_plain_text() {
        let output = capture("rivetd=debug", LogFormat::Compact);
        assert!(output.contains("session_started"));
        assert!(output.contains("frame_read"));
        assert!(!output.contains('\u{1b}'), "unexpected escape codes: {output:?}");
    }

    #[rstest]
    #[case("rivetd=loudest")]
    #[case("rivetd=debug,framing=verbose")]
    fn malformed_filters_name_the_directive(#[case] directive: &str) {
        let Err(error) = parse_filter(directive) else {
            panic!("'{directive}' should not parse");
        };
        assert!(matches!(
            &error,
            TelemetryError::Filter { directive: text, .. } if text == directive
        ));
        assert!(error.to_string().contains(directive));
    }

    #[test]
    fn later_initialisations_reuse_the_first_subscriber() {
        let first = initialise(&Config::default()).expect("first initialisation");
        let json = Config {
            log_format: LogFormat::Json,
            ..Config::default()
        };
        let second = initialise(&json).expect("second initialisation");
        assert_eq!(second, Telemetry::Reused { format: first.format() });
    }

    #[test]
    fn bad_filters_fail_even_after_installation() {
        initialise(&Config::default()).expect("first initialisation");
        let config = Config {
            log_filter: "rivetd=loudest".to_owned(),
            ..Config::default()
        };
        assert!(matches!(initialise(&config), Err(TelemetryError::Filter { .. })));
    }
}
