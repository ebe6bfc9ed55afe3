//! Session logging collaborator.

use std::sync::Arc;

const LOGGER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");

/// Observer notified at pipeline lifecycle boundaries and around each
/// dispatch.
pub trait Logger: Send + Sync {
    /// Invoked when a pipeline session begins.
    fn start(&self, message: &str);

    /// Invoked for each dispatch event. `source` names the component,
    /// `operation` the step within it.
    fn log(&self, source: &str, operation: &str, message: &str);

    /// Invoked when a pipeline session ends.
    fn stop(&self, message: &str);
}

impl<T> Logger for Arc<T>
where
    T: Logger + ?Sized,
{
    fn start(&self, message: &str) {
        (**self).start(message);
    }

    fn log(&self, source: &str, operation: &str, message: &str) {
        (**self).log(source, operation, message);
    }

    fn stop(&self, message: &str) {
        (**self).stop(message);
    }
}

/// Default logger that records session events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl TracingLogger {
    /// Builds a new logger.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Logger for TracingLogger {
    fn start(&self, message: &str) {
        tracing::info!(
            target: LOGGER_TARGET,
            event = "session_started",
            detail = message,
            "pipeline session started"
        );
    }

    fn log(&self, source: &str, operation: &str, message: &str) {
        tracing::debug!(
            target: LOGGER_TARGET,
            event = "dispatch",
            source,
            operation,
            detail = message,
            "dispatch event"
        );
    }

    fn stop(&self, message: &str) {
        tracing::info!(
            target: LOGGER_TARGET,
            event = "session_stopped",
            detail = message,
            "pipeline session stopped"
        );
    }
}

/// Logger that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NopLogger;

impl Logger for NopLogger {
    fn start(&self, _message: &str) {}

    fn log(&self, _source: &str, _operation: &str, _message: &str) {}

    fn stop(&self, _message: &str) {}
}
