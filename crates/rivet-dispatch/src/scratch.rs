//! Per-handler scratch scope.
//!
//! Every handler entry owns one [`Scratch`] inside each pipeline. Handlers
//! registered with a scoped constructor borrow it for the duration of one
//! invocation; the pipeline resets it once the end-request hook has run, on
//! every exit path. Resetting clears contents but keeps capacity up to the
//! retain limit, so steady-state dispatch does not reallocate.

use rivet_config::{Config, DEFAULT_SCRATCH_RETAIN_BYTES};
use serde_json::Value;

/// Reusable working memory for one handler invocation.
#[derive(Debug)]
pub struct Scratch {
    bytes: Vec<u8>,
    text: String,
    values: Vec<Value>,
    retain_bytes: usize,
}

impl Default for Scratch {
    fn default() -> Self {
        Self::new(DEFAULT_SCRATCH_RETAIN_BYTES)
    }
}

impl Scratch {
    /// Creates an empty scope that keeps up to `retain_bytes` of buffer
    /// capacity across resets.
    #[must_use]
    pub const fn new(retain_bytes: usize) -> Self {
        Self {
            bytes: Vec::new(),
            text: String::new(),
            values: Vec::new(),
            retain_bytes,
        }
    }

    /// Byte buffer, empty at the start of each invocation.
    pub const fn bytes(&mut self) -> &mut Vec<u8> {
        &mut self.bytes
    }

    /// Text buffer, empty at the start of each invocation.
    pub const fn text(&mut self) -> &mut String {
        &mut self.text
    }

    /// JSON value pool, empty at the start of each invocation.
    pub const fn values(&mut self) -> &mut Vec<Value> {
        &mut self.values
    }

    /// Clears every buffer and trims capacity beyond the retain limit.
    pub fn reset(&mut self) {
        self.bytes.clear();
        self.text.clear();
        self.values.clear();
        if self.bytes.capacity() > self.retain_bytes {
            self.bytes.shrink_to(self.retain_bytes);
        }
        if self.text.capacity() > self.retain_bytes {
            self.text.shrink_to(self.retain_bytes);
        }
        let retained_values = self
            .retain_bytes
            .checked_div(size_of::<Value>())
            .unwrap_or_default();
        if self.values.capacity() > retained_values {
            self.values.shrink_to(retained_values);
        }
    }

    /// Returns `true` when every buffer is empty.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.bytes.is_empty() && self.text.is_empty() && self.values.is_empty()
    }

    /// Buffer capacity currently held, in bytes.
    #[must_use]
    pub fn retained_bytes(&self) -> usize {
        self.values
            .capacity()
            .saturating_mul(size_of::<Value>())
            .saturating_add(self.bytes.capacity())
            .saturating_add(self.text.capacity())
    }
}

/// Options for the scratch scopes a pipeline allocates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Capacity each scope keeps across resets.
    pub scratch_retain_bytes: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            scratch_retain_bytes: DEFAULT_SCRATCH_RETAIN_BYTES,
        }
    }
}

impl From<&Config> for PipelineOptions {
    fn from(config: &Config) -> Self {
        Self {
            scratch_retain_bytes: config.scratch_retain_bytes,
        }
    }
}
