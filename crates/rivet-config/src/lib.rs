//! Configuration shared by the rivet framing loops, dispatch pipeline, and
//! the `rivetd` daemon.
//!
//! [`Config`] derives [`OrthoConfig`], so values resolve from four layers
//! with increasing precedence: built-in defaults, a TOML configuration file,
//! `RIVET_*` environment variables, and command-line flags. The file is named
//! with `--config-path` or `RIVET_CONFIG_PATH`. The resolved value is
//! validated before it is handed out so the framing loops never see a
//! zero-sized limit.

mod defaults;
mod error;
mod mode;

use std::ffi::OsString;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_MAX_FRAME_BYTES, DEFAULT_MAX_HEADER_LINE_BYTES,
    DEFAULT_SCRATCH_RETAIN_BYTES, default_log_filter, default_log_format,
};
pub use error::ConfigError;
pub use mode::{FramingMode, FramingModeParseError, LogFormat, LogFormatParseError};

/// Resolved runtime configuration.
///
/// Each field maps to a kebab-case flag (`--max-frame-bytes`), an upper-case
/// environment variable (`RIVET_MAX_FRAME_BYTES`), and a snake-case file key
/// (`max_frame_bytes`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(prefix = "RIVET")]
pub struct Config {
    /// Stream framing served by the daemon.
    pub framing: FramingMode,
    /// Whether blank delimiter-framed lines are skipped silently.
    pub skip_blank_lines: bool,
    /// Largest frame body accepted, in bytes.
    pub max_frame_bytes: usize,
    /// Longest `Content-Length` header line accepted, in bytes.
    pub max_header_line_bytes: usize,
    /// Capacity each handler scratch scope keeps between dispatches.
    pub scratch_retain_bytes: usize,
    /// `tracing` filter directive.
    pub log_filter: String,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            framing: FramingMode::default(),
            skip_blank_lines: true,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            max_header_line_bytes: DEFAULT_MAX_HEADER_LINE_BYTES,
            scratch_retain_bytes: DEFAULT_SCRATCH_RETAIN_BYTES,
            log_filter: default_log_filter().to_owned(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Loads every configuration layer and validates the result.
    ///
    /// The first item of `args` is the program name, as with
    /// [`std::env::args_os`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] when a layer cannot be read or parsed
    /// (including `--help` requests), and [`ConfigError::ZeroLimit`] when a
    /// size limit resolves to zero.
    pub fn resolve<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let config = Self::load_from_iter(args)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the limits are usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroLimit`] naming the first limit set to zero.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.max_frame_bytes == 0 {
            return Err(ConfigError::ZeroLimit {
                field: "max_frame_bytes",
            });
        }
        if self.max_header_line_bytes == 0 {
            return Err(ConfigError::ZeroLimit {
                field: "max_header_line_bytes",
            });
        }
        Ok(())
    }

    /// Returns the configured framing mode.
    #[must_use]
    pub const fn framing(&self) -> FramingMode {
        self.framing
    }

    /// Returns the `tracing` filter directive.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Returns the log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

#[cfg(test)]
mod tests;
