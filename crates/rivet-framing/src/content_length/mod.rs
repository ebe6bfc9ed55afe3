//! `Content-Length` framing with resynchronisation.
//!
//! A frame is a block of `Key: Value` header lines ended by a blank line,
//! followed by exactly `Content-Length` body bytes:
//!
//! ```text
//! Content-Length: 5\r\n
//! \r\n
//! hello
//! ```
//!
//! The reader is strict about the body once a valid header block has been
//! read and permissive about everything before it. A header block that is
//! malformed or lacks `Content-Length` is discarded, and scanning resumes
//! line by line for the next block. A line holding stray bytes followed by
//! `Content-Length:` is cut at the marker, so noise without a newline before
//! a frame is tolerated too.

use std::io::{self, BufRead, Read, Write};
use std::str;

use rivet_config::{Config, DEFAULT_MAX_FRAME_BYTES, DEFAULT_MAX_HEADER_LINE_BYTES};
use rivet_dispatch::{Logger, Pipeline};
use rivet_protocol::ParseFailure;

use crate::error::{FramingError, StreamEnd};
use crate::frame::{Frame, failure_reply, write_content_length};
use crate::line::{Line, read_line};

const CONTENT_LENGTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::content_length");

/// The only header the framing depends on. Matched case-sensitively.
pub const CONTENT_LENGTH_HEADER: &str = "Content-Length";

/// Settings for [`serve_content_length`] and [`ContentLengthReader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentLengthOptions {
    /// Largest accepted body.
    pub max_frame_bytes: usize,
    /// Longest accepted header line, excluding its terminator.
    pub max_header_line_bytes: usize,
}

impl Default for ContentLengthOptions {
    fn default() -> Self {
        Self {
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            max_header_line_bytes: DEFAULT_MAX_HEADER_LINE_BYTES,
        }
    }
}

impl From<&Config> for ContentLengthOptions {
    fn from(config: &Config) -> Self {
        Self {
            max_frame_bytes: config.max_frame_bytes,
            max_header_line_bytes: config.max_header_line_bytes,
        }
    }
}

/// Why a header block was thrown away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Discard {
    NotAHeader,
    LineTooLong,
    BadLength,
    MissingLength,
}

impl Discard {
    const fn reason(self) -> &'static str {
        match self {
            Self::NotAHeader => "not a header line",
            Self::LineTooLong => "header line too long",
            Self::BadLength => "invalid Content-Length value",
            Self::MissingLength => "header block without Content-Length",
        }
    }
}

/// Header lines collected for the frame being read.
#[derive(Debug, Default)]
struct HeaderBlock {
    headers: Vec<(String, String)>,
    content_length: Option<usize>,
}

impl HeaderBlock {
    fn clear(&mut self) {
        self.headers.clear();
        self.content_length = None;
    }

    const fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.content_length.is_none()
    }

    /// Records one header line.
    fn accept(&mut self, line: &[u8]) -> Result<(), Discard> {
        let text = str::from_utf8(line).map_err(|_| Discard::NotAHeader)?;
        let (name, value) = text.split_once(':').ok_or(Discard::NotAHeader)?;
        if !is_token(name) {
            return Err(Discard::NotAHeader);
        }
        let trimmed = value.trim();
        if name == CONTENT_LENGTH_HEADER {
            self.content_length = Some(parse_length(trimmed)?);
        }
        self.headers.push((name.to_owned(), trimmed.to_owned()));
        Ok(())
    }
}

/// `Content-Length` values are bare decimal digits; signs and spaces inside
/// the number are rejected.
fn parse_length(value: &str) -> Result<usize, Discard> {
    if value.is_empty() || !value.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(Discard::BadLength);
    }
    value.parse().map_err(|_| Discard::BadLength)
}

/// Header names are HTTP tokens.
fn is_token(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&byte))
}

/// Returns the suffix of `line` starting at an embedded `Content-Length:`
/// marker.
fn resync_point(line: &[u8]) -> Option<&[u8]> {
    let marker = b"Content-Length:";
    line.windows(marker.len())
        .position(|window| window == marker)
        .filter(|position| *position > 0)
        .and_then(|position| line.get(position..))
}

/// Reads `Content-Length` framed messages, resynchronising past noise.
#[derive(Debug)]
pub struct ContentLengthReader<R> {
    reader: R,
    line: Vec<u8>,
    body: Vec<u8>,
    block: HeaderBlock,
    options: ContentLengthOptions,
    discarded: usize,
}

impl<R: BufRead> ContentLengthReader<R> {
    /// Wraps `reader`.
    pub fn new(reader: R, options: ContentLengthOptions) -> Self {
        Self {
            reader,
            line: Vec::new(),
            body: Vec::new(),
            block: HeaderBlock::default(),
            options,
            discarded: 0,
        }
    }

    /// Headers of the frame most recently returned, in arrival order.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.block.headers
    }

    /// Total bytes discarded while resynchronising.
    #[must_use]
    pub const fn discarded_bytes(&self) -> usize {
        self.discarded
    }

    /// Reads the next frame. Returns `None` when the stream ends, including
    /// part-way through a header block or body.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError::Io`] if the underlying reader fails.
    pub fn next_frame(&mut self) -> Result<Option<Frame<'_>>, FramingError> {
        let Some(length) = self.read_header_block()? else {
            return Ok(None);
        };

        if length > self.options.max_frame_bytes {
            let wanted = u64::try_from(length).unwrap_or(u64::MAX);
            let drained = io::copy(&mut (&mut self.reader).take(wanted), &mut io::sink())?;
            if drained < wanted {
                return Ok(None);
            }
            return Ok(Some(Frame::TooLarge { length }));
        }

        self.body.clear();
        self.body.resize(length, 0);
        match self.reader.read_exact(&mut self.body) {
            Ok(()) => Ok(Some(Frame::Body(&self.body))),
            Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => {
                tracing::warn!(
                    target: CONTENT_LENGTH_TARGET,
                    event = "truncated_body",
                    length,
                    "stream ended inside a frame body"
                );
                Ok(None)
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Reads header lines until a block with a usable `Content-Length` ends.
    fn read_header_block(&mut self) -> Result<Option<usize>, FramingError> {
        self.block.clear();
        loop {
            let limit = self.options.max_header_line_bytes;
            let Some(line) = read_line(&mut self.reader, &mut self.line, limit)? else {
                return Ok(None);
            };
            let outcome = match line {
                Line::TooLong { length } => Err((Discard::LineTooLong, length)),
                Line::Fits if self.line.is_empty() => match self.block.content_length {
                    Some(length) => return Ok(Some(length)),
                    None if self.block.is_empty() => Ok(()),
                    None => Err((Discard::MissingLength, 0)),
                },
                Line::Fits => self.accept_line(),
            };
            if let Err((discard, length)) = outcome {
                self.discard(discard, length);
            }
        }
    }

    /// Accepts the buffered line as a header. A line with bytes before an
    /// embedded `Content-Length:` marker is cut at the marker first.
    fn accept_line(&mut self) -> Result<(), (Discard, usize)> {
        if let Some(suffix) = resync_point(&self.line) {
            let skipped = self.line.len().saturating_sub(suffix.len());
            let header = suffix.to_vec();
            self.discard(Discard::NotAHeader, skipped);
            return self
                .block
                .accept(&header)
                .map_err(|discard| (discard, header.len()));
        }
        self.block
            .accept(&self.line)
            .map_err(|discard| (discard, self.line.len()))
    }

    fn discard(&mut self, discard: Discard, length: usize) {
        let headers: usize = self
            .block
            .headers
            .iter()
            .map(|(name, value)| name.len().saturating_add(value.len()))
            .sum();
        let dropped = length.saturating_add(headers);
        self.discarded = self.discarded.saturating_add(dropped);
        self.block.clear();
        tracing::warn!(
            target: CONTENT_LENGTH_TARGET,
            event = "header_discarded",
            reason = discard.reason(),
            bytes = dropped,
            "discarding bytes until the next header block"
        );
    }

    /// Returns the wrapped reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

/// Serves `Content-Length` framed requests from `reader` until the stream
/// closes or a handler ends it.
///
/// Each reply is written with its own `Content-Length` header.
///
/// # Errors
///
/// Returns [`FramingError::Io`] if reading, writing, or composing fails.
pub fn serve_content_length<R, W, L>(
    reader: R,
    writer: &mut W,
    pipeline: &mut Pipeline<L>,
    options: ContentLengthOptions,
) -> Result<StreamEnd, FramingError>
where
    R: BufRead,
    W: Write + ?Sized,
    L: Logger,
{
    let mut frames = ContentLengthReader::new(reader, options);
    loop {
        let Some(frame) = frames.next_frame()? else {
            tracing::debug!(
                target: CONTENT_LENGTH_TARGET,
                event = "stream_closed",
                "content-length stream closed"
            );
            return Ok(StreamEnd::Closed);
        };

        let body = match frame {
            Frame::Body(body) => body,
            Frame::TooLarge { length } => {
                tracing::warn!(
                    target: CONTENT_LENGTH_TARGET,
                    event = "frame_too_large",
                    length,
                    limit = options.max_frame_bytes,
                    "discarded oversize body"
                );
                let reply = failure_reply(ParseFailure::FrameTooLarge);
                write_content_length(writer, reply.as_bytes())?;
                continue;
            }
        };
        let Ok(text) = str::from_utf8(body) else {
            let reply = failure_reply(ParseFailure::SyntaxError);
            write_content_length(writer, reply.as_bytes())?;
            continue;
        };

        let status = pipeline.run_request(text)?;
        if status.replied {
            write_content_length(writer, pipeline.output())?;
        }
        if status.end_stream {
            tracing::debug!(
                target: CONTENT_LENGTH_TARGET,
                event = "stream_stopped",
                "handler ended the content-length stream"
            );
            return Ok(StreamEnd::Stopped);
        }
    }
}
