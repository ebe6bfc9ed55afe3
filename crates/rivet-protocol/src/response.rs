//! Response values.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error_code::ErrorCode;
use crate::id::Id;
use crate::request::RequestError;

/// The `error` member of a failed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResponseError {
    /// Numeric error code.
    pub code: i32,
    /// Human-readable message.
    pub message: String,
    /// Optional structured detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ResponseError {
    /// Builds an error object from a well-known code, using the code's name
    /// as the message.
    #[must_use]
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code: code.code(),
            message: code.name().to_owned(),
            data: None,
        }
    }

    /// Returns the well-known code, if this error carries one.
    #[must_use]
    pub const fn error_code(&self) -> Option<ErrorCode> {
        ErrorCode::from_code(self.code)
    }
}

/// A parsed JSON-RPC response.
///
/// Exactly one of `result` and `error` is meaningful. A `result` of JSON
/// `null` is kept as `Some(Value::Null)` so it stays distinguishable from a
/// missing member.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Value of the `jsonrpc` member.
    pub version: String,
    /// Identifier of the request this answers.
    pub id: Id,
    /// Success payload.
    pub result: Option<Value>,
    /// Failure payload.
    pub error: Option<ResponseError>,
    /// Set when the response itself failed parsing or validation.
    pub parse_error: Option<RequestError>,
}

impl Response {
    /// Builds a success response.
    #[must_use]
    pub fn success(id: Id, result: Value) -> Self {
        Self {
            version: crate::JSONRPC_VERSION.to_owned(),
            id,
            result: Some(result),
            error: None,
            parse_error: None,
        }
    }

    /// Builds an error response.
    #[must_use]
    pub fn failure(id: Id, error: ResponseError) -> Self {
        Self {
            version: crate::JSONRPC_VERSION.to_owned(),
            id,
            result: None,
            error: Some(error),
            parse_error: None,
        }
    }

    /// Builds a response that carries only a parse failure.
    #[must_use]
    pub fn invalid(parse_error: RequestError) -> Self {
        Self {
            version: String::new(),
            id: parse_error.id.clone(),
            result: None,
            error: None,
            parse_error: Some(parse_error),
        }
    }

    /// Returns `true` when the peer reported a failure.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
