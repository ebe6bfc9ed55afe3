//! Methods served by the daemon.
//!
//! | method | params | reply |
//! |---|---|---|
//! | `echo` | `[text]` | `text` |
//! | `add` | `[left, right]` | the sum, or an `Overflow` error |
//! | `describe` | none | served method names and the active configuration |
//! | `shutdown` | none | no reply; the stream ends |

use std::sync::Arc;

use serde::Serialize;

use rivet_config::Config;
use rivet_dispatch::{DispatchResult, HandlerError, RegistrationError, Registry};

/// Names of the methods [`daemon_registry`] registers, in order.
pub const DAEMON_METHODS: [&str; 4] = ["echo", "add", "describe", "shutdown"];

#[derive(Debug, Serialize)]
struct Description {
    name: &'static str,
    version: &'static str,
    methods: [&'static str; 4],
    config: Config,
}

/// Builds the registry served by `rivetd`.
///
/// # Errors
///
/// Returns [`RegistrationError`] if two methods share a name.
pub fn daemon_registry(config: &Config) -> Result<Registry, RegistrationError> {
    let description = Arc::new(Description {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        methods: DAEMON_METHODS,
        config: config.clone(),
    });

    let mut builder = Registry::builder();
    builder
        .register("echo", |text: String| text)?
        .register("add", add)?
        .register_bound("describe", description, |description: &Description| {
            serde_json::to_value(description)
        })?
        .register("shutdown", || DispatchResult::EndStream)?;
    Ok(builder.build())
}

fn add(left: i64, right: i64) -> Result<i64, HandlerError> {
    left.checked_add(right)
        .ok_or_else(|| HandlerError::application("Overflow", format!("{left} + {right} overflows")))
}
