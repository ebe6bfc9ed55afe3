//! Daemon bootstrap orchestration.

use std::ffi::OsString;
use std::io::{BufRead, Write};
use std::sync::Arc;

use thiserror::Error;

use rivet_config::{Config, ConfigError};
use rivet_dispatch::{Pipeline, PipelineOptions, RegistrationError, Registry, TracingLogger};
use rivet_framing::{FramingError, StreamEnd};

use crate::health::HealthReporter;
use crate::methods;
use crate::telemetry::{self, Telemetry, TelemetryError};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration from the process arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the arguments, environment, or
    /// configuration file do not resolve to a valid configuration.
    fn load(&self, args: &[OsString]) -> Result<Config, ConfigError>;
}

/// Loader that delegates to [`Config::resolve`]: defaults, configuration
/// file, `RIVET_*` environment, then flags.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandLineConfigLoader;

impl ConfigLoader for CommandLineConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, ConfigError> {
        Config::resolve(args.iter().cloned())
    }
}

/// Loader that ignores the arguments and returns a fixed configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps `config`.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, ConfigError> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: ConfigError,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The built-in methods could not be registered.
    #[error("failed to register daemon methods: {source}")]
    Registry {
        /// Underlying registration error.
        #[source]
        source: RegistrationError,
    },
}

impl BootstrapError {
    /// The command-line parser's outcome when argument parsing stopped the
    /// bootstrap, including help requests.
    #[must_use]
    pub fn command_line(&self) -> Option<&clap::Error> {
        match self {
            Self::Configuration { source } => source.command_line(),
            Self::Telemetry { .. } | Self::Registry { .. } => None,
        }
    }
}

/// Result of a successful bootstrap invocation.
pub struct Daemon {
    config: Config,
    registry: Arc<Registry>,
    telemetry: Telemetry,
    reporter: Arc<dyn HealthReporter>,
}

impl Daemon {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The methods this daemon serves.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Whether this bootstrap installed the log subscriber or found one.
    #[must_use]
    pub const fn telemetry(&self) -> Telemetry {
        self.telemetry
    }

    /// Serves `reader` until the peer closes it or `shutdown` is called.
    ///
    /// Each call starts a fresh pipeline over the shared registry.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError`] when the byte stream fails.
    pub fn serve<R, W>(&self, reader: R, writer: &mut W) -> Result<StreamEnd, FramingError>
    where
        R: BufRead,
        W: Write + ?Sized,
    {
        self.reporter.session_started(self.config.framing());
        let mut pipeline = Pipeline::with_logger(
            Arc::clone(&self.registry),
            TracingLogger::new(),
            PipelineOptions::from(&self.config),
        );
        match rivet_framing::serve(&self.config, reader, writer, &mut pipeline) {
            Ok(end) => {
                self.reporter.session_finished(end);
                Ok(end)
            }
            Err(error) => {
                self.reporter.session_failed(&error);
                Err(error)
            }
        }
    }
}

/// Bootstraps the daemon using the supplied collaborators.
///
/// # Errors
///
/// Returns [`BootstrapError`] when configuration, telemetry, or method
/// registration fails. The reporter sees the failure first.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    args: &[OsString],
    reporter: Arc<dyn HealthReporter>,
) -> Result<Daemon, BootstrapError> {
    reporter.bootstrap_starting();

    let config = match loader.load(args) {
        Ok(config) => config,
        Err(source) => {
            let error = BootstrapError::Configuration { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let telemetry = match telemetry::initialise(&config) {
        Ok(telemetry) => telemetry,
        Err(source) => {
            let error = BootstrapError::Telemetry { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let registry = match methods::daemon_registry(&config) {
        Ok(registry) => registry.into_shared(),
        Err(source) => {
            let error = BootstrapError::Registry { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    reporter.bootstrap_succeeded(&config);
    Ok(Daemon {
        config,
        registry,
        telemetry,
        reporter,
    })
}
