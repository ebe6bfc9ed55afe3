//! Dispatch outcomes.

use serde_json::Value;
use serde_json::value::RawValue;

/// Outcome of dispatching one request.
#[derive(Debug, Clone, Default)]
pub enum DispatchResult {
    /// Nothing to send. Valid ids still get a `null` result.
    #[default]
    None,
    /// Serialized result payload.
    Result(Box<RawValue>),
    /// Error reply.
    Err {
        /// JSON-RPC error code.
        code: i32,
        /// Wire message.
        message: String,
        /// Optional structured detail.
        data: Option<Value>,
    },
    /// The handler asks the streaming session to stop. No reply is sent.
    EndStream,
}

impl DispatchResult {
    /// Returns `true` for [`DispatchResult::Err`].
    #[must_use]
    pub const fn is_err(&self) -> bool {
        matches!(self, Self::Err { .. })
    }

    /// Returns `true` for [`DispatchResult::EndStream`].
    #[must_use]
    pub const fn is_end_stream(&self) -> bool {
        matches!(self, Self::EndStream)
    }

    /// Returns the raw result text, if any.
    #[must_use]
    pub fn result_text(&self) -> Option<&str> {
        match self {
            Self::Result(raw) => Some(raw.get()),
            _ => None,
        }
    }

    /// Short label used in log lines.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Result(_) => "result",
            Self::Err { .. } => "error",
            Self::EndStream => "end_stream",
        }
    }
}

/// Summary of one dispatch round, consumed by the framing loops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStatus {
    /// Reply bytes were written to the pipeline output.
    pub replied: bool,
    /// A handler returned [`DispatchResult::EndStream`].
    pub end_stream: bool,
}

impl RunStatus {
    /// A round that wrote a reply and keeps the stream open.
    #[must_use]
    pub const fn replied() -> Self {
        Self {
            replied: true,
            end_stream: false,
        }
    }
}
