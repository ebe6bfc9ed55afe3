//! Conversion of handler return values into dispatch outcomes.

use serde::Serialize;
use serde_json::Value;
use serde_json::value::{RawValue, to_raw_value};

use crate::error::HandlerError;
use crate::params::Json;
use crate::result::DispatchResult;

/// A handler return value.
///
/// `()` produces [`DispatchResult::None`]. Values serialise into
/// [`DispatchResult::Result`]. A `Box<RawValue>` is passed through without
/// re-serialisation and a [`DispatchResult`] is returned as-is. `Result`
/// routes its error through [`HandlerError`].
pub trait IntoReply {
    /// Converts the return value.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError`] when the handler failed or its value could not
    /// be serialised.
    fn into_reply(self) -> Result<DispatchResult, HandlerError>;
}

fn serialize<T: Serialize + ?Sized>(value: &T) -> Result<DispatchResult, HandlerError> {
    Ok(DispatchResult::Result(to_raw_value(value)?))
}

impl IntoReply for () {
    fn into_reply(self) -> Result<DispatchResult, HandlerError> {
        Ok(DispatchResult::None)
    }
}

impl IntoReply for DispatchResult {
    fn into_reply(self) -> Result<DispatchResult, HandlerError> {
        Ok(self)
    }
}

impl IntoReply for Box<RawValue> {
    fn into_reply(self) -> Result<DispatchResult, HandlerError> {
        Ok(DispatchResult::Result(self))
    }
}

macro_rules! serialized_reply {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoReply for $ty {
                fn into_reply(self) -> Result<DispatchResult, HandlerError> {
                    serialize(&self)
                }
            }
        )*
    };
}

serialized_reply!(bool, i32, i64, u32, u64, f64, String, &'static str, Value);

impl<T: Serialize> IntoReply for Vec<T> {
    fn into_reply(self) -> Result<DispatchResult, HandlerError> {
        serialize(&self)
    }
}

impl<T: Serialize> IntoReply for Option<T> {
    fn into_reply(self) -> Result<DispatchResult, HandlerError> {
        serialize(&self)
    }
}

impl<T: Serialize> IntoReply for Json<T> {
    fn into_reply(self) -> Result<DispatchResult, HandlerError> {
        serialize(&self.0)
    }
}

impl<T, E> IntoReply for Result<T, E>
where
    T: IntoReply,
    E: Into<HandlerError>,
{
    fn into_reply(self) -> Result<DispatchResult, HandlerError> {
        self.map_err(Into::into).and_then(IntoReply::into_reply)
    }
}
