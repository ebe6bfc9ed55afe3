//! Request values and the errors attached to them.

use serde_json::{Map, Value};

use crate::error_code::ErrorCode;
use crate::id::Id;
use crate::parser::ParseFailure;

/// Parameters carried by a request.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Params {
    /// No `params` member (or an explicit `null`).
    #[default]
    Absent,
    /// Positional parameters.
    Array(Vec<Value>),
    /// Named parameters.
    Object(Map<String, Value>),
}

impl Params {
    /// Classifies a JSON value as request parameters.
    ///
    /// # Errors
    ///
    /// Returns the original value when it is a scalar, which JSON-RPC does
    /// not allow as `params`.
    pub fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Null => Ok(Self::Absent),
            Value::Array(items) => Ok(Self::Array(items)),
            Value::Object(map) => Ok(Self::Object(map)),
            scalar => Err(scalar),
        }
    }

    /// Converts the parameters back into a JSON value, mapping
    /// [`Params::Absent`] to `null`.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Absent => Value::Null,
            Self::Array(items) => Value::Array(items),
            Self::Object(map) => Value::Object(map),
        }
    }

    /// Borrowing variant of [`Params::into_value`].
    #[must_use]
    pub fn to_value(&self) -> Value {
        self.clone().into_value()
    }

    /// Returns `true` when no `params` member was supplied.
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

/// Failure recorded against a request during parsing or validation.
///
/// The error stays attached to its [`Request`] rather than aborting the parse,
/// so the pipeline can still address a reply to `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestError {
    /// JSON-RPC code the failure maps to.
    pub code: ErrorCode,
    /// Wire message; the name of the failure kind.
    pub message: String,
    /// Identifier recovered from the offending message.
    pub id: Id,
}

impl RequestError {
    /// Builds an error from a classified parse failure.
    #[must_use]
    pub fn new(failure: ParseFailure, id: Id) -> Self {
        Self {
            code: failure.code(),
            message: failure.to_string(),
            id,
        }
    }
}

/// A parsed JSON-RPC request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Value of the `jsonrpc` member.
    pub version: String,
    /// Method name.
    pub method: String,
    /// Request parameters.
    pub params: Params,
    /// Request identifier.
    pub id: Id,
    /// Set when the request failed parsing or validation.
    pub error: Option<RequestError>,
}

impl Request {
    /// Builds a valid request.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Params, id: Id) -> Self {
        Self {
            version: crate::JSONRPC_VERSION.to_owned(),
            method: method.into(),
            params,
            id,
            error: None,
        }
    }

    /// Builds a request that carries only a failure and the salvaged id.
    #[must_use]
    pub fn invalid(error: RequestError) -> Self {
        Self {
            version: String::new(),
            method: String::new(),
            params: Params::Absent,
            id: error.id.clone(),
            error: Some(error),
        }
    }

    /// Returns `true` when no response should be emitted for a successful
    /// dispatch of this request.
    #[must_use]
    pub const fn is_notification(&self) -> bool {
        self.id.is_notification()
    }

    /// Returns `true` when parsing or validation failed.
    #[must_use]
    pub const fn has_error(&self) -> bool {
        self.error.is_some()
    }
}
