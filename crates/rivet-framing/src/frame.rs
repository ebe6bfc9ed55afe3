//! Frames handed out by the readers, and the matching writers.

use std::io::{self, Write};

use rivet_protocol::{Id, ParseFailure, compose_error};

/// One frame read from a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame<'a> {
    /// A complete frame body, without framing bytes.
    Body(&'a [u8]),
    /// A frame longer than the configured limit. Its bytes were drained.
    TooLarge {
        /// Declared or observed length of the discarded frame.
        length: usize,
    },
}

/// Writes one newline-delimited frame and flushes.
///
/// # Errors
///
/// Returns any error raised by `writer`.
pub fn write_delimited<W: Write + ?Sized>(writer: &mut W, body: &[u8]) -> io::Result<()> {
    writer.write_all(body)?;
    writer.write_all(b"\n")?;
    writer.flush()
}

/// Writes one `Content-Length` framed message and flushes.
///
/// # Errors
///
/// Returns any error raised by `writer`.
pub fn write_content_length<W: Write + ?Sized>(writer: &mut W, body: &[u8]) -> io::Result<()> {
    write!(writer, "Content-Length: {}\r\n\r\n", body.len())?;
    writer.write_all(body)?;
    writer.flush()
}

/// Error reply for a frame that never reached the parser.
pub(crate) fn failure_reply(failure: ParseFailure) -> String {
    compose_error(&Id::Null, failure.code().code(), &failure.to_string(), None)
}
