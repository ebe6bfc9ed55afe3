//! Marshaling of JSON-RPC params into native handler arguments.
//!
//! A handler's argument list is classified when it is registered, through
//! the [`Arguments`] impl chosen for its parameter tuple:
//!
//! - no arguments;
//! - exactly one [`Param`]: a [`Primitive`], a raw [`Value`] passthrough, or
//!   a structured [`Json<T>`] object;
//! - two or more [`Primitive`] arguments matched positionally.
//!
//! Primitives coerce from JSON as follows; every other combination fails
//! with [`ParamError::InvalidJsonValueType`].
//!
//! | native | accepted JSON |
//! |---|---|
//! | `bool` | bool; integer or float other than zero; the string `"true"` |
//! | `i64` | integer; string holding a base-10 integer |
//! | `f64` | number; string holding a float |
//! | `String` | string |
//! | [`Stringified`] | any value, strings as-is and the rest in JSON form |
//! | `Option<P>` | `null` or a missing argument as `None`, else as `P` |

use std::num::FpCategory;

use rivet_protocol::Params;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::ParamError;

/// Parameter shape of a registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamShape {
    /// The handler takes no arguments.
    None,
    /// The handler receives the params value unchanged.
    Raw,
    /// The handler takes one structured object deserialised from named params.
    Object,
    /// The handler takes this many positional primitives.
    Flat(usize),
}

impl ParamShape {
    /// Returns `true` when the handler takes no arguments.
    #[must_use]
    pub const fn is_none(self) -> bool {
        matches!(self, Self::None)
    }
}

/// Structured-object parameter or reply, carried through `serde`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    /// Returns the wrapped value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

/// String argument that accepts any JSON value.
///
/// Strings pass through unchanged; every other value is rendered as JSON
/// text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Stringified(pub String);

/// A native type a single JSON value can be coerced into.
pub trait Primitive: Sized {
    /// Native type name used in error messages.
    const NAME: &'static str;

    /// Converts one JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::InvalidJsonValueType`] when the value cannot be
    /// coerced.
    fn from_json(value: &Value) -> Result<Self, ParamError>;

    /// Produces the value for an argument the request did not supply.
    ///
    /// Only optional arguments accept a missing value.
    fn from_missing() -> Option<Self> {
        None
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn mismatch<P: Primitive>(value: &Value) -> ParamError {
    ParamError::InvalidJsonValueType {
        expected: P::NAME,
        found: json_kind(value),
    }
}

impl Primitive for bool {
    const NAME: &'static str = "bool";

    fn from_json(value: &Value) -> Result<Self, ParamError> {
        match value {
            Value::Bool(flag) => Ok(*flag),
            Value::Number(number) => Ok(number
                .as_f64()
                .is_some_and(|float| float.classify() != FpCategory::Zero)),
            Value::String(text) => Ok(text == "true"),
            other => Err(mismatch::<Self>(other)),
        }
    }
}

impl Primitive for i64 {
    const NAME: &'static str = "i64";

    fn from_json(value: &Value) -> Result<Self, ParamError> {
        match value {
            Value::Number(number) => number.as_i64().ok_or_else(|| mismatch::<Self>(value)),
            Value::String(text) => text.trim().parse().map_err(|_| mismatch::<Self>(value)),
            other => Err(mismatch::<Self>(other)),
        }
    }
}

impl Primitive for f64 {
    const NAME: &'static str = "f64";

    fn from_json(value: &Value) -> Result<Self, ParamError> {
        match value {
            Value::Number(number) => number.as_f64().ok_or_else(|| mismatch::<Self>(value)),
            Value::String(text) => text.trim().parse().map_err(|_| mismatch::<Self>(value)),
            other => Err(mismatch::<Self>(other)),
        }
    }
}

impl Primitive for String {
    const NAME: &'static str = "string";

    fn from_json(value: &Value) -> Result<Self, ParamError> {
        match value {
            Value::String(text) => Ok(text.clone()),
            other => Err(mismatch::<Self>(other)),
        }
    }
}

impl Primitive for Stringified {
    const NAME: &'static str = "string";

    fn from_json(value: &Value) -> Result<Self, ParamError> {
        Ok(Self(match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }))
    }
}

impl<P: Primitive> Primitive for Option<P> {
    const NAME: &'static str = P::NAME;

    fn from_json(value: &Value) -> Result<Self, ParamError> {
        match value {
            Value::Null => Ok(None),
            other => P::from_json(other).map(Some),
        }
    }

    fn from_missing() -> Option<Self> {
        Some(None)
    }
}

/// The single argument of a one-argument handler.
pub trait Param: Sized {
    /// Shape recorded at registration.
    const SHAPE: ParamShape;

    /// Builds the argument from the request params.
    ///
    /// # Errors
    ///
    /// Returns a [`ParamError`] when the params do not fit the argument.
    fn from_params(params: &Params) -> Result<Self, ParamError>;
}

/// Converts the single positional or missing argument of a one-primitive
/// handler.
fn single_primitive<P: Primitive>(params: &Params) -> Result<P, ParamError> {
    match params {
        Params::Absent => P::from_missing().ok_or(ParamError::MismatchedParamCounts {
            expected: 1,
            actual: 0,
        }),
        Params::Array(items) => match items.as_slice() {
            [value] => P::from_json(value),
            other => Err(ParamError::MismatchedParamCounts {
                expected: 1,
                actual: other.len(),
            }),
        },
        Params::Object(_) => Err(ParamError::NamedParamsNotAccepted),
    }
}

macro_rules! primitive_param {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Param for $ty {
                const SHAPE: ParamShape = ParamShape::Flat(1);

                fn from_params(params: &Params) -> Result<Self, ParamError> {
                    single_primitive(params)
                }
            }
        )*
    };
}

primitive_param!(bool, i64, f64, String, Stringified);

impl<P: Primitive> Param for Option<P> {
    const SHAPE: ParamShape = ParamShape::Flat(1);

    fn from_params(params: &Params) -> Result<Self, ParamError> {
        single_primitive(params)
    }
}

impl Param for Value {
    const SHAPE: ParamShape = ParamShape::Raw;

    fn from_params(params: &Params) -> Result<Self, ParamError> {
        Ok(params.to_value())
    }
}

impl<T: DeserializeOwned> Param for Json<T> {
    const SHAPE: ParamShape = ParamShape::Object;

    fn from_params(params: &Params) -> Result<Self, ParamError> {
        let Params::Object(map) = params else {
            return Err(ParamError::ExpectedNamedParams);
        };
        deserialize_object(map).map(Self)
    }
}

fn deserialize_object<T: DeserializeOwned>(map: &Map<String, Value>) -> Result<T, ParamError> {
    serde_json::from_value(Value::Object(map.clone())).map_err(|error| ParamError::InvalidObject {
        message: error.to_string(),
    })
}

/// A handler's full argument list.
///
/// Implemented for `()`, for `(A,)` where `A: Param`, and for tuples of two
/// to six [`Primitive`] types.
pub trait Arguments: Sized {
    /// Shape recorded at registration.
    const SHAPE: ParamShape;

    /// Builds the argument list from the request params.
    ///
    /// # Errors
    ///
    /// Returns a [`ParamError`] when the params do not fit the argument list.
    fn extract(params: &Params) -> Result<Self, ParamError>;
}

/// Returns the positional values for a flat argument list of exactly `N`
/// entries.
fn positional<const N: usize>(params: &Params) -> Result<&[Value; N], ParamError> {
    let items: &[Value] = match params {
        Params::Absent => &[],
        Params::Array(items) => items,
        Params::Object(_) => return Err(ParamError::NamedParamsNotAccepted),
    };
    items
        .try_into()
        .map_err(|_| ParamError::MismatchedParamCounts {
            expected: N,
            actual: items.len(),
        })
}

impl Arguments for () {
    const SHAPE: ParamShape = ParamShape::None;

    fn extract(params: &Params) -> Result<Self, ParamError> {
        positional::<0>(params).map(|_| ())
    }
}

impl<A: Param> Arguments for (A,) {
    const SHAPE: ParamShape = A::SHAPE;

    fn extract(params: &Params) -> Result<Self, ParamError> {
        A::from_params(params).map(|argument| (argument,))
    }
}

macro_rules! flat_arguments {
    ($count:literal; $($ty:ident $value:ident),+) => {
        impl<$($ty: Primitive),+> Arguments for ($($ty,)+) {
            const SHAPE: ParamShape = ParamShape::Flat($count);

            fn extract(params: &Params) -> Result<Self, ParamError> {
                let [$($value),+] = positional::<$count>(params)?;
                Ok(($(<$ty>::from_json($value)?,)+))
            }
        }
    };
}

flat_arguments!(2; A1 a1, A2 a2);
flat_arguments!(3; A1 a1, A2 a2, A3 a3);
flat_arguments!(4; A1 a1, A2 a2, A3 a3, A4 a4);
flat_arguments!(5; A1 a1, A2 a2, A3 a3, A4 a4, A5 a5);
flat_arguments!(6; A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6);
