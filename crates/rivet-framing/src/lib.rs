//! Byte-stream framing for rivet dispatch pipelines.
//!
//! Two framings are provided. [`serve_delimited`] reads one JSON message per
//! line. [`serve_content_length`] reads LSP-style header blocks and
//! resynchronises past noise between frames. Both hand each frame to a
//! [`Pipeline`] and write its reply back using the same framing, and neither
//! stops on a malformed frame: only a failing stream or a handler returning
//! `EndStream` ends the loop.
//!
//! [`serve`] picks the framing named by a [`Config`].

mod content_length;
mod delimited;
mod error;
mod frame;
mod line;

use std::io::{BufRead, Write};

use rivet_config::{Config, FramingMode};
use rivet_dispatch::{Logger, Pipeline};

pub use content_length::{
    CONTENT_LENGTH_HEADER, ContentLengthOptions, ContentLengthReader, serve_content_length,
};
pub use delimited::{DelimitedReader, DelimiterOptions, serve_delimited};
pub use error::{FramingError, StreamEnd};
pub use frame::{Frame, write_content_length, write_delimited};

/// Serves `reader` with the framing selected by `config`.
///
/// # Errors
///
/// Returns [`FramingError::Io`] if the stream fails.
pub fn serve<R, W, L>(
    config: &Config,
    reader: R,
    writer: &mut W,
    pipeline: &mut Pipeline<L>,
) -> Result<StreamEnd, FramingError>
where
    R: BufRead,
    W: Write + ?Sized,
    L: Logger,
{
    match config.framing() {
        FramingMode::Delimited => serve_delimited(reader, writer, pipeline, config.into()),
        FramingMode::ContentLength => {
            serve_content_length(reader, writer, pipeline, config.into())
        }
    }
}
