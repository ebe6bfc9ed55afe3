//! Two-pass parsing of requests, responses, and batches.
//!
//! The syntactic pass reads the text as JSON of the expected envelope shape.
//! Its failures are classified by kind: truncated input and envelope shape
//! violations map to `InvalidRequest`, numeric overflow and depth exhaustion
//! map to `InternalError`, and everything else is a `ParseError`. The
//! semantic pass runs only on a well-formed envelope and stops at the first
//! failure, checking the version, then the params shape, then the method.
//!
//! A request whose checks fail is still returned, with its error attached and
//! the identifier recovered from the raw JSON, so a reply can be addressed.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use serde_json::error::Category;
use serde_json::value::RawValue;
use thiserror::Error;

use crate::error_code::ErrorCode;
use crate::id::Id;
use crate::request::{Params, Request, RequestError};
use crate::response::{Response, ResponseError};

/// Classified reason a message failed parsing or validation.
///
/// The display form is the wire message written into error replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseFailure {
    /// The input ended before a complete JSON value was read.
    #[error("UnexpectedEndOfInput")]
    UnexpectedEndOfInput,
    /// The input is not JSON.
    #[error("SyntaxError")]
    SyntaxError,
    /// A required envelope member is missing.
    #[error("MissingField")]
    MissingField,
    /// An envelope member appears more than once.
    #[error("DuplicateField")]
    DuplicateField,
    /// The envelope carries a member JSON-RPC does not define.
    #[error("UnknownField")]
    UnknownField,
    /// A sequence had the wrong number of elements.
    #[error("LengthMismatch")]
    LengthMismatch,
    /// An envelope member has the wrong JSON type.
    #[error("InvalidType")]
    InvalidType,
    /// An envelope member has an unacceptable value.
    #[error("InvalidValue")]
    InvalidValue,
    /// A number does not fit the target integer type.
    #[error("Overflow")]
    Overflow,
    /// Nesting exceeded the parser's depth limit.
    #[error("DepthLimitExceeded")]
    DepthLimitExceeded,
    /// A frame exceeded the configured size limit.
    #[error("FrameTooLarge")]
    FrameTooLarge,
    /// The `jsonrpc` member is not `"2.0"`.
    #[error("InvalidVersion")]
    InvalidVersion,
    /// The `params` member is a scalar.
    #[error("InvalidParams")]
    InvalidParams,
    /// The `method` member is empty.
    #[error("EmptyMethod")]
    EmptyMethod,
}

impl ParseFailure {
    /// Returns the JSON-RPC code this failure is reported with.
    #[must_use]
    pub const fn code(self) -> ErrorCode {
        match self {
            Self::UnexpectedEndOfInput
            | Self::MissingField
            | Self::DuplicateField
            | Self::UnknownField
            | Self::LengthMismatch
            | Self::InvalidType
            | Self::InvalidValue
            | Self::InvalidVersion
            | Self::EmptyMethod => ErrorCode::InvalidRequest,
            Self::Overflow | Self::DepthLimitExceeded | Self::FrameTooLarge => {
                ErrorCode::InternalError
            }
            Self::InvalidParams => ErrorCode::InvalidParams,
            Self::SyntaxError => ErrorCode::ParseError,
        }
    }

    /// Classifies a `serde_json` failure.
    #[must_use]
    pub fn classify(error: &serde_json::Error) -> Self {
        let text = error.to_string();
        if text.contains("out of range") {
            return Self::Overflow;
        }
        if text.contains("recursion limit exceeded") {
            return Self::DepthLimitExceeded;
        }
        match error.classify() {
            Category::Eof => Self::UnexpectedEndOfInput,
            Category::Syntax | Category::Io => Self::SyntaxError,
            Category::Data => classify_data(&text),
        }
    }
}

fn classify_data(text: &str) -> ParseFailure {
    const KINDS: [(&str, ParseFailure); 5] = [
        ("missing field", ParseFailure::MissingField),
        ("duplicate field", ParseFailure::DuplicateField),
        ("unknown field", ParseFailure::UnknownField),
        ("invalid length", ParseFailure::LengthMismatch),
        ("invalid type", ParseFailure::InvalidType),
    ];
    KINDS
        .iter()
        .find(|(prefix, _)| text.starts_with(prefix))
        .map_or(ParseFailure::InvalidValue, |(_, kind)| *kind)
}

/// Outcome of parsing request text.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedRequest {
    /// A single request object, possibly carrying a validation error.
    Single(Request),
    /// A batch; each element is validated independently.
    Batch(Vec<Request>),
    /// The text could not be read as JSON at all.
    Invalid(RequestError),
}

/// Outcome of parsing response text.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedResponse {
    /// A single response object, possibly carrying a parse error.
    Single(Response),
    /// A batch of responses.
    Batch(Vec<Response>),
    /// The text could not be read as JSON at all.
    Invalid(RequestError),
}

/// A message read from a channel that multiplexes requests and responses.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// The object carried a `method` member.
    Request(Request),
    /// The object carried no `method` member.
    Response(Response),
}

/// Outcome of parsing text that may hold either requests or responses.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedMessage {
    /// A single message.
    Single(Message),
    /// A batch of messages, classified element by element.
    Batch(Vec<Message>),
    /// The text could not be read as JSON at all.
    Invalid(RequestError),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RequestEnvelope {
    jsonrpc: String,
    method: String,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default)]
    id: Id,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ResponseEnvelope {
    jsonrpc: String,
    #[serde(default)]
    id: Id,
    #[serde(default, deserialize_with = "present")]
    result: Option<Value>,
    #[serde(default)]
    error: Option<ResponseError>,
}

/// Keeps an explicit `null` distinguishable from a missing member.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

/// Parses request text: a single request object or a batch.
///
/// An empty batch `[]` is valid and yields zero elements.
#[must_use]
pub fn parse_request(text: &str) -> ParsedRequest {
    if !is_batch(text) {
        return match read_value(text) {
            Ok(value) => ParsedRequest::Single(request_from_text(text, &value)),
            Err(error) => ParsedRequest::Invalid(error),
        };
    }
    match read_batch(text) {
        Ok(items) => ParsedRequest::Batch(
            items
                .into_iter()
                .map(|item| parse_batch_element(item.get(), request_from_text, Request::invalid))
                .collect(),
        ),
        Err(error) => ParsedRequest::Invalid(error),
    }
}

/// Parses response text: a single response object or a batch.
#[must_use]
pub fn parse_response(text: &str) -> ParsedResponse {
    if !is_batch(text) {
        return match read_value(text) {
            Ok(value) => ParsedResponse::Single(response_from_text(text, &value)),
            Err(error) => ParsedResponse::Invalid(error),
        };
    }
    match read_batch(text) {
        Ok(items) => ParsedResponse::Batch(
            items
                .into_iter()
                .map(|item| parse_batch_element(item.get(), response_from_text, Response::invalid))
                .collect(),
        ),
        Err(error) => ParsedResponse::Invalid(error),
    }
}

/// Parses text from a channel carrying both requests and responses.
///
/// Each top-level object is classified by a structural heuristic: an object
/// with a `method` member is a request, anything else is a response. This is
/// a best-effort disambiguation that only holds when both directions share a
/// single channel with no other discriminator; JSON-RPC itself does not
/// guarantee it.
#[must_use]
pub fn parse_message(text: &str) -> ParsedMessage {
    if !is_batch(text) {
        return match read_value(text) {
            Ok(value) => ParsedMessage::Single(message_from_text(text, &value)),
            Err(error) => ParsedMessage::Invalid(error),
        };
    }
    match read_batch(text) {
        Ok(items) => ParsedMessage::Batch(
            items
                .into_iter()
                .map(|item| {
                    parse_batch_element(item.get(), message_from_text, |error| {
                        Message::Request(Request::invalid(error))
                    })
                })
                .collect(),
        ),
        Err(error) => ParsedMessage::Invalid(error),
    }
}

fn message_from_text(text: &str, value: &Value) -> Message {
    let has_method = value
        .as_object()
        .is_some_and(|object| object.contains_key("method"));
    if has_method {
        Message::Request(request_from_text(text, value))
    } else {
        Message::Response(response_from_text(text, value))
    }
}

fn is_batch(text: &str) -> bool {
    text.trim_start().starts_with('[')
}

fn read_value(text: &str) -> Result<Value, RequestError> {
    serde_json::from_str(text)
        .map_err(|error| RequestError::new(ParseFailure::classify(&error), Id::Null))
}

fn read_batch(text: &str) -> Result<Vec<&RawValue>, RequestError> {
    serde_json::from_str(text)
        .map_err(|error| RequestError::new(ParseFailure::classify(&error), Id::Null))
}

fn parse_batch_element<T>(
    text: &str,
    build: impl Fn(&str, &Value) -> T,
    invalid: impl Fn(RequestError) -> T,
) -> T {
    match read_value(text) {
        Ok(value) => build(text, &value),
        Err(error) => invalid(error),
    }
}

fn request_from_text(text: &str, value: &Value) -> Request {
    let salvaged = Id::salvage(value);
    let envelope: RequestEnvelope = match serde_json::from_str(text) {
        Ok(envelope) => envelope,
        Err(error) => {
            return Request::invalid(RequestError::new(ParseFailure::classify(&error), salvaged));
        }
    };
    validate_request(envelope)
}

fn validate_request(envelope: RequestEnvelope) -> Request {
    let RequestEnvelope {
        jsonrpc,
        method,
        params,
        id,
    } = envelope;

    let classified = Params::from_value(params.unwrap_or(Value::Null));
    let failure = if jsonrpc != crate::JSONRPC_VERSION {
        Some(ParseFailure::InvalidVersion)
    } else if classified.is_err() {
        Some(ParseFailure::InvalidParams)
    } else if method.is_empty() {
        Some(ParseFailure::EmptyMethod)
    } else {
        None
    };

    Request {
        version: jsonrpc,
        method,
        params: classified.unwrap_or_default(),
        error: failure.map(|kind| RequestError::new(kind, id.clone())),
        id,
    }
}

fn response_from_text(text: &str, value: &Value) -> Response {
    let salvaged = Id::salvage(value);
    let envelope: ResponseEnvelope = match serde_json::from_str(text) {
        Ok(envelope) => envelope,
        Err(error) => {
            return Response::invalid(RequestError::new(ParseFailure::classify(&error), salvaged));
        }
    };
    let ResponseEnvelope {
        jsonrpc,
        id,
        result,
        error,
    } = envelope;
    let parse_error = (jsonrpc != crate::JSONRPC_VERSION)
        .then(|| RequestError::new(ParseFailure::InvalidVersion, id.clone()));
    Response {
        version: jsonrpc,
        id,
        result,
        error,
        parse_error,
    }
}
