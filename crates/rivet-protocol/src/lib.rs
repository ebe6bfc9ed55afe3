//! JSON-RPC 2.0 message model, parser, and wire composer.
//!
//! The crate turns JSON text into typed [`Request`] and [`Response`] values and
//! writes them back out as JSON-RPC 2.0 wire text. Parsing never fails
//! outright: malformed input is classified into a [`RequestError`] carrying the JSON-RPC
//! [`ErrorCode`] it maps to, together with whatever [`Id`] could be salvaged,
//! so the caller can still address an error reply to the peer.
//!
//! Parsing runs in two passes. The syntactic pass checks that the text is JSON
//! of the expected envelope shape; the semantic pass then applies the JSON-RPC
//! rules in a fixed order (version, params shape, method).
//!
//! ```
//! use rivet_protocol::{Id, ParsedRequest, parse_request};
//!
//! let parsed = parse_request(r#"{"jsonrpc":"2.0","method":"echo","params":["hi"],"id":1}"#);
//! let ParsedRequest::Single(request) = parsed else {
//!     panic!("expected a single request");
//! };
//! assert_eq!(request.method, "echo");
//! assert_eq!(request.id, Id::Number(1));
//! assert!(request.error.is_none());
//! ```

mod composer;
mod error_code;
mod id;
mod parser;
mod request;
mod response;

pub use composer::{
    BatchComposer, MessageWriter, compose_error, compose_request, compose_result,
};
pub use error_code::ErrorCode;
pub use id::Id;
pub use parser::{
    Message, ParseFailure, ParsedMessage, ParsedRequest, ParsedResponse, parse_message,
    parse_request, parse_response,
};
pub use request::{Params, Request, RequestError};
pub use response::{Response, ResponseError};

/// The only protocol version accepted on the wire.
pub const JSONRPC_VERSION: &str = "2.0";

/// Re-exported so callers can build JSON text fragments without naming
/// `serde_json` directly.
pub use serde_json::value::RawValue;
