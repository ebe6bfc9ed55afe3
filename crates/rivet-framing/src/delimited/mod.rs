//! Newline-delimited framing.
//!
//! One JSON message per line. Each line is parsed and dispatched on its own,
//! so a malformed line is answered with an error and the next line is read
//! as usual. Lines longer than the frame limit are drained and answered with
//! `FrameTooLarge`.

use std::io::{BufRead, Write};
use std::str;

use rivet_config::{Config, DEFAULT_MAX_FRAME_BYTES};
use rivet_dispatch::{Logger, Pipeline};
use rivet_protocol::ParseFailure;

use crate::error::{FramingError, StreamEnd};
use crate::frame::{Frame, failure_reply, write_delimited};
use crate::line::{Line, read_line};

const DELIMITED_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::delimited");

/// Settings for [`serve_delimited`] and [`DelimitedReader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelimiterOptions {
    /// Skip blank lines instead of answering them with an error.
    pub skip_blank_lines: bool,
    /// Longest accepted line, excluding its terminator.
    pub max_frame_bytes: usize,
}

impl Default for DelimiterOptions {
    fn default() -> Self {
        Self {
            skip_blank_lines: true,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

impl From<&Config> for DelimiterOptions {
    fn from(config: &Config) -> Self {
        Self {
            skip_blank_lines: config.skip_blank_lines,
            max_frame_bytes: config.max_frame_bytes,
        }
    }
}

/// Reads newline-delimited frames from a buffered stream.
#[derive(Debug)]
pub struct DelimitedReader<R> {
    reader: R,
    buffer: Vec<u8>,
    max_frame_bytes: usize,
}

impl<R: BufRead> DelimitedReader<R> {
    /// Wraps `reader`, accepting lines of at most `max_frame_bytes`.
    pub const fn new(reader: R, max_frame_bytes: usize) -> Self {
        Self {
            reader,
            buffer: Vec::new(),
            max_frame_bytes,
        }
    }

    /// Reads the next line. Returns `None` at end of stream.
    ///
    /// Blank lines are returned as empty bodies.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError::Io`] if the underlying reader fails.
    pub fn next_frame(&mut self) -> Result<Option<Frame<'_>>, FramingError> {
        let line = read_line(&mut self.reader, &mut self.buffer, self.max_frame_bytes)?;
        Ok(line.map(|read| match read {
            Line::Fits => Frame::Body(&self.buffer),
            Line::TooLong { length } => Frame::TooLarge { length },
        }))
    }

    /// Returns the wrapped reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

/// Serves newline-delimited requests from `reader` until the stream closes
/// or a handler ends it.
///
/// Replies are written to `writer` one per line, in request order.
///
/// # Errors
///
/// Returns [`FramingError::Io`] if reading, writing, or composing fails.
pub fn serve_delimited<R, W, L>(
    reader: R,
    writer: &mut W,
    pipeline: &mut Pipeline<L>,
    options: DelimiterOptions,
) -> Result<StreamEnd, FramingError>
where
    R: BufRead,
    W: Write + ?Sized,
    L: Logger,
{
    let mut frames = DelimitedReader::new(reader, options.max_frame_bytes);
    let mut served = 0_u64;
    loop {
        let Some(frame) = frames.next_frame()? else {
            tracing::debug!(
                target: DELIMITED_TARGET,
                event = "stream_closed",
                frames = served,
                "delimited stream closed"
            );
            return Ok(StreamEnd::Closed);
        };
        served = served.saturating_add(1);

        let body = match frame {
            Frame::Body(body) => body,
            Frame::TooLarge { length } => {
                tracing::warn!(
                    target: DELIMITED_TARGET,
                    event = "frame_too_large",
                    length,
                    limit = options.max_frame_bytes,
                    "discarded oversize line"
                );
                write_delimited(writer, failure_reply(ParseFailure::FrameTooLarge).as_bytes())?;
                continue;
            }
        };
        if options.skip_blank_lines && body.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        let Ok(text) = str::from_utf8(body) else {
            write_delimited(writer, failure_reply(ParseFailure::SyntaxError).as_bytes())?;
            continue;
        };

        let status = pipeline.run_request(text)?;
        if status.replied {
            write_delimited(writer, pipeline.output())?;
        }
        if status.end_stream {
            tracing::debug!(
                target: DELIMITED_TARGET,
                event = "stream_stopped",
                frames = served,
                "handler ended the delimited stream"
            );
            return Ok(StreamEnd::Stopped);
        }
    }
}
