//! Wire composition for responses, requests, and batches.
//!
//! Every message is rendered through a [`fmt::Display`] frame, so the same
//! code backs both the streaming [`MessageWriter`] and the `compose_*`
//! helpers that return owned strings. Streaming writes go straight to the
//! sink piece by piece; result payloads are never copied into an
//! intermediate buffer.

use std::fmt;
use std::io::{self, Write};

use serde::Serialize;
use serde_json::Value;
use serde_json::value::RawValue;

use crate::id::Id;
use crate::request::Params;
use crate::response::Response;

/// Writes `value` as JSON into a formatter.
fn write_json<T: Serialize + ?Sized>(f: &mut fmt::Formatter<'_>, value: &T) -> fmt::Result {
    let text = serde_json::to_string(value).map_err(|_| fmt::Error)?;
    f.write_str(&text)
}

struct ResultFrame<'a> {
    id: &'a Id,
    result: &'a dyn fmt::Display,
}

impl fmt::Display for ResultFrame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            r#"{{"jsonrpc":"2.0","result":{},"id":{}}}"#,
            self.result, self.id
        )
    }
}

struct ErrorFrame<'a> {
    id: &'a Id,
    code: i32,
    message: &'a str,
    data: Option<&'a Value>,
}

impl fmt::Display for ErrorFrame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            r#"{{"jsonrpc":"2.0","id":{},"error":{{"code":{},"message":"#,
            self.id, self.code
        )?;
        write_json(f, self.message)?;
        if let Some(data) = self.data {
            write!(f, r#","data":{data}"#)?;
        }
        f.write_str("}}")
    }
}

struct RequestFrame<'a> {
    method: &'a str,
    params: &'a Params,
    id: &'a Id,
}

impl fmt::Display for RequestFrame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(r#"{"jsonrpc":"2.0","method":"#)?;
        write_json(f, self.method)?;
        match self.params {
            Params::Absent => {}
            Params::Array(items) => {
                f.write_str(r#","params":"#)?;
                write_json(f, items)?;
            }
            Params::Object(map) => {
                f.write_str(r#","params":"#)?;
                write_json(f, map)?;
            }
        }
        if *self.id != Id::Absent {
            write!(f, r#","id":{}"#, self.id)?;
        }
        f.write_str("}")
    }
}

/// Streams JSON-RPC messages to an output sink.
///
/// The writer does no framing of its own; callers add delimiters or
/// `Content-Length` headers around what it produces.
#[derive(Debug)]
pub struct MessageWriter<W> {
    inner: W,
}

impl<W: Write> MessageWriter<W> {
    /// Wraps an output sink.
    pub const fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Writes a success response carrying a pre-serialized result.
    ///
    /// # Errors
    ///
    /// Returns any error raised by the underlying sink.
    pub fn write_result(&mut self, id: &Id, result: &RawValue) -> io::Result<()> {
        write!(
            self.inner,
            "{}",
            ResultFrame {
                id,
                result: &result,
            }
        )
    }

    /// Writes an error response.
    ///
    /// # Errors
    ///
    /// Returns any error raised by the underlying sink.
    pub fn write_error(
        &mut self,
        id: &Id,
        code: i32,
        message: &str,
        data: Option<&Value>,
    ) -> io::Result<()> {
        write!(
            self.inner,
            "{}",
            ErrorFrame {
                id,
                code,
                message,
                data,
            }
        )
    }

    /// Writes a request, or a notification when `id` is [`Id::Absent`].
    ///
    /// # Errors
    ///
    /// Returns any error raised by the underlying sink.
    pub fn write_request(&mut self, method: &str, params: &Params, id: &Id) -> io::Result<()> {
        write!(self.inner, "{}", RequestFrame { method, params, id })
    }

    /// Writes a parsed or constructed response value.
    ///
    /// A response with neither member set is written as a `null` result.
    ///
    /// # Errors
    ///
    /// Returns any error raised by the underlying sink.
    pub fn write_response(&mut self, response: &Response) -> io::Result<()> {
        if let Some(error) = &response.error {
            return self.write_error(
                &response.id,
                error.code,
                &error.message,
                error.data.as_ref(),
            );
        }
        let result = response.result.as_ref().unwrap_or(&Value::Null);
        write!(
            self.inner,
            "{}",
            ResultFrame {
                id: &response.id,
                result,
            }
        )
    }

    /// Opens a batch array. Members are separated by `", "`.
    ///
    /// # Errors
    ///
    /// Returns any error raised by the underlying sink.
    pub fn begin_batch(&mut self) -> io::Result<BatchComposer<'_, W>> {
        self.inner.write_all(b"[")?;
        Ok(BatchComposer {
            writer: self,
            members: 0,
        })
    }

    /// Returns the underlying sink.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Consumes the writer and returns the underlying sink.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// An open batch array on a [`MessageWriter`].
///
/// Call [`BatchComposer::member`] before writing each member, then
/// [`BatchComposer::finish`] to close the array. A batch with no members
/// renders as `[]`.
#[derive(Debug)]
pub struct BatchComposer<'a, W> {
    writer: &'a mut MessageWriter<W>,
    members: usize,
}

impl<W: Write> BatchComposer<'_, W> {
    /// Prepares the sink for the next member and returns the writer to
    /// compose it with.
    ///
    /// # Errors
    ///
    /// Returns any error raised by the underlying sink.
    pub fn member(&mut self) -> io::Result<&mut MessageWriter<W>> {
        if self.members > 0 {
            self.writer.inner.write_all(b", ")?;
        }
        self.members += 1;
        Ok(&mut *self.writer)
    }

    /// Returns how many members have been started.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.members
    }

    /// Returns `true` when no member has been started.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.members == 0
    }

    /// Closes the batch array.
    ///
    /// # Errors
    ///
    /// Returns any error raised by the underlying sink.
    pub fn finish(self) -> io::Result<()> {
        self.writer.inner.write_all(b"]")
    }
}

/// Renders a success response.
#[must_use]
pub fn compose_result(id: &Id, result: &RawValue) -> String {
    ResultFrame {
        id,
        result: &result,
    }
    .to_string()
}

/// Renders an error response.
#[must_use]
pub fn compose_error(id: &Id, code: i32, message: &str, data: Option<&Value>) -> String {
    ErrorFrame {
        id,
        code,
        message,
        data,
    }
    .to_string()
}

/// Renders a request, or a notification when `id` is [`Id::Absent`].
#[must_use]
pub fn compose_request(method: &str, params: &Params, id: &Id) -> String {
    RequestFrame { method, params, id }.to_string()
}
