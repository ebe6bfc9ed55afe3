//! Error types for registration, parameter marshaling, and handler failures.
//!
//! Handlers never deal in wire codes. They fail with a [`HandlerError`] and
//! the pipeline maps it onto a JSON-RPC error reply through
//! [`HandlerError::to_dispatch_result`].

use rivet_protocol::ErrorCode;
use serde_json::Value;
use strum::IntoStaticStr;
use thiserror::Error;

use crate::result::DispatchResult;

/// Errors raised while registering handlers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// The method name is empty.
    #[error("method name must not be empty")]
    EmptyMethodName,

    /// The method name uses the reserved hook prefix without being a hook.
    #[error("method '{name}' uses the reserved 'rpc.' prefix")]
    InvalidMethodName {
        /// Rejected name.
        name: String,
    },

    /// A handler is already registered under this name.
    #[error("method '{name}' is already registered")]
    DuplicateMethod {
        /// Rejected name.
        name: String,
    },
}

/// Failures converting request parameters into handler arguments.
///
/// The variant name doubles as the wire message of the resulting
/// `InvalidParams` reply.
#[derive(Debug, Clone, PartialEq, Eq, Error, IntoStaticStr)]
pub enum ParamError {
    /// Positional arity does not match the handler.
    #[error("expected {expected} positional params, got {actual}")]
    MismatchedParamCounts {
        /// Parameters the handler declares.
        expected: usize,
        /// Parameters the request supplied.
        actual: usize,
    },

    /// A JSON value cannot be coerced into the declared native type.
    #[error("cannot convert JSON {found} into {expected}")]
    InvalidJsonValueType {
        /// Native type name.
        expected: &'static str,
        /// JSON kind that was supplied.
        found: &'static str,
    },

    /// Named params were sent to a handler without a structured parameter.
    #[error("named params are not accepted by this method")]
    NamedParamsNotAccepted,

    /// Positional or absent params were sent to a structured handler.
    #[error("expected named params")]
    ExpectedNamedParams,

    /// A structured parameter failed to deserialise.
    #[error("invalid named params: {message}")]
    InvalidObject {
        /// Deserialiser message.
        message: String,
    },
}

impl ParamError {
    /// Returns the variant name used as the wire message.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.into()
    }
}

/// Failures raised by handlers.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Parameters could not be marshaled into handler arguments.
    #[error(transparent)]
    Params(#[from] ParamError),

    /// No handler or fallback accepted the method.
    #[error("method not found")]
    MethodNotFound,

    /// The handler hit an internal fault.
    #[error("internal error: {message}")]
    Internal {
        /// Diagnostic detail.
        message: String,
    },

    /// The handler chose an explicit wire error.
    #[error("{message} ({code})")]
    Rpc {
        /// JSON-RPC error code.
        code: i32,
        /// Wire message.
        message: String,
        /// Optional structured detail.
        data: Option<Value>,
    },

    /// The handler's return value could not be serialised.
    #[error("failed to serialize reply: {0}")]
    Serialize(#[from] serde_json::Error),

    /// An application error, reported as a server error named `name`.
    #[error("{name}: {message}")]
    Application {
        /// Short error name used as the wire message.
        name: String,
        /// Diagnostic detail.
        message: String,
    },
}

impl HandlerError {
    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates an explicit wire error.
    pub fn rpc(code: i32, message: impl Into<String>) -> Self {
        Self::Rpc {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Creates an application error reported as a server error.
    pub fn application(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Application {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Returns the wire code this error maps to.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::Params(_) => ErrorCode::InvalidParams.code(),
            Self::MethodNotFound => ErrorCode::MethodNotFound.code(),
            Self::Internal { .. } => ErrorCode::InternalError.code(),
            Self::Rpc { code, .. } => *code,
            Self::Serialize(_) | Self::Application { .. } => ErrorCode::ServerError.code(),
        }
    }

    /// Maps the error onto the reply the pipeline sends.
    ///
    /// | variant | code | message |
    /// |---|---|---|
    /// | `Params` | -32602 | param error name, detail in `data` |
    /// | `MethodNotFound` | -32601 | `MethodNotFound` |
    /// | `Internal` | -32603 | `InternalError`, detail in `data` |
    /// | `Rpc` | given | given |
    /// | `Serialize` | -32000 | `SerializeFailed`, detail in `data` |
    /// | `Application` | -32000 | the application error name, detail in `data` |
    #[must_use]
    pub fn to_dispatch_result(&self) -> DispatchResult {
        let (message, data) = match self {
            Self::Params(error) => (error.name().to_owned(), Some(error.to_string())),
            Self::MethodNotFound => (ErrorCode::MethodNotFound.name().to_owned(), None),
            Self::Internal { message } => (
                ErrorCode::InternalError.name().to_owned(),
                Some(message.clone()),
            ),
            Self::Rpc { message, data, .. } => {
                return DispatchResult::Err {
                    code: self.code(),
                    message: message.clone(),
                    data: data.clone(),
                };
            }
            Self::Serialize(error) => ("SerializeFailed".to_owned(), Some(error.to_string())),
            Self::Application { name, message } => {
                (name.clone(), (!message.is_empty()).then(|| message.clone()))
            }
        };
        DispatchResult::Err {
            code: self.code(),
            message,
            data: data.map(Value::String),
        }
    }
}
