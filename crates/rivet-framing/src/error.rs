//! Framing failures.

use std::io;

use thiserror::Error;

/// Errors that end a framing loop.
///
/// Malformed frames never surface here; they are answered or discarded and
/// the loop carries on. Only a failing byte stream stops it.
#[derive(Debug, Error)]
pub enum FramingError {
    /// The underlying reader or writer failed.
    #[error("stream I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// How a framing loop finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The peer closed the stream.
    Closed,
    /// A handler returned `DispatchResult::EndStream`.
    Stopped,
}
