//! Fixed JSON-RPC 2.0 error codes.

use strum::{Display, IntoStaticStr};

/// Error codes defined by the JSON-RPC 2.0 specification.
///
/// The display form is the variant name, which is also the `message` written
/// on the wire when no more specific message is available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, IntoStaticStr)]
pub enum ErrorCode {
    /// No error.
    #[default]
    None,
    /// Invalid JSON was received.
    ParseError,
    /// The JSON sent is not a valid request object.
    InvalidRequest,
    /// The method does not exist or is not available.
    MethodNotFound,
    /// Invalid method parameters.
    InvalidParams,
    /// Internal JSON-RPC error.
    InternalError,
    /// Implementation-defined server error.
    ServerError,
}

impl ErrorCode {
    /// Returns the numeric wire value.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::None => 0,
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::ServerError => -32000,
        }
    }

    /// Returns the variant name used as the default wire message.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Maps a numeric wire value back onto a known code.
    ///
    /// Codes inside the reserved server range (`-32099..=-32000`) all map to
    /// [`ErrorCode::ServerError`].
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            -32700 => Some(Self::ParseError),
            -32600 => Some(Self::InvalidRequest),
            -32601 => Some(Self::MethodNotFound),
            -32602 => Some(Self::InvalidParams),
            -32603 => Some(Self::InternalError),
            -32099..=-32000 => Some(Self::ServerError),
            _ => None,
        }
    }
}
