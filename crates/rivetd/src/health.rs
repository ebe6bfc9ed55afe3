//! Structured health reporting for daemon lifecycle events.

use std::sync::Arc;

use rivet_config::{Config, FramingMode};
use rivet_framing::{FramingError, StreamEnd};

use crate::bootstrap::BootstrapError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked before the framing loop starts reading.
    fn session_started(&self, framing: FramingMode);

    /// Invoked when the framing loop ends normally.
    fn session_finished(&self, end: StreamEnd);

    /// Invoked when the byte stream fails.
    fn session_failed(&self, error: &FramingError);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn session_started(&self, framing: FramingMode) {
        (**self).session_started(framing);
    }

    fn session_finished(&self, end: StreamEnd) {
        (**self).session_finished(end);
    }

    fn session_failed(&self, error: &FramingError) {
        (**self).session_failed(error);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting daemon bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            framing = %config.framing(),
            max_frame_bytes = config.max_frame_bytes,
            log_filter = %config.log_filter(),
            log_format = %config.log_format(),
            "daemon bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "daemon bootstrap failed"
        );
    }

    fn session_started(&self, framing: FramingMode) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "session_started",
            framing = %framing,
            "serving stdio"
        );
    }

    fn session_finished(&self, end: StreamEnd) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "session_finished",
            end = ?end,
            "stdio session finished"
        );
    }

    fn session_failed(&self, error: &FramingError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "session_failed",
            error = %error,
            "stdio session failed"
        );
    }
}
