//! Configuration failures.

use std::sync::Arc;

use ortho_config::OrthoError;
use thiserror::Error;

/// Errors raised while resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration layer could not be read or parsed.
    #[error(transparent)]
    Load(#[from] Arc<OrthoError>),

    /// A size limit was set to zero.
    #[error("{field} must be greater than zero")]
    ZeroLimit {
        /// Name of the offending setting.
        field: &'static str,
    },
}

impl ConfigError {
    /// The command-line parser's own outcome, when that is what stopped
    /// loading. Help requests and unknown flags surface here.
    #[must_use]
    pub fn command_line(&self) -> Option<&clap::Error> {
        let Self::Load(error) = self else {
            return None;
        };
        match error.as_ref() {
            OrthoError::CliParsing(error) => {
                let error: &clap::Error = error;
                Some(error)
            }
            _ => None,
        }
    }
}
