//! Request identifiers.

use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Identifier correlating a request with its response.
///
/// Only [`Id::Number`] and [`Id::String`] address a peer. [`Id::Absent`] (no
/// `id` member at all) and [`Id::Null`] (`"id": null`) both mark a request as
/// a notification; they are kept apart for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Id {
    /// The `id` member was not present.
    #[default]
    Absent,
    /// The `id` member was present and `null`.
    Null,
    /// Integer identifier.
    Number(i64),
    /// String identifier.
    String(String),
}

impl Id {
    /// Returns `true` when the identifier can address a response.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Number(_) | Self::String(_))
    }

    /// Returns `true` when no response is expected for this identifier.
    #[must_use]
    pub const fn is_notification(&self) -> bool {
        !self.is_valid()
    }

    /// Recovers an identifier from a loosely-typed JSON object.
    ///
    /// Used when a request failed validation but the caller still needs to
    /// address an error reply. Anything other than an integer or string `id`
    /// yields [`Id::Null`]; a value that is not an object yields
    /// [`Id::Absent`].
    #[must_use]
    pub fn salvage(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::Absent;
        };
        match object.get("id") {
            None => Self::Absent,
            Some(Value::String(text)) => Self::String(text.clone()),
            Some(Value::Number(number)) => number.as_i64().map_or(Self::Null, Self::Number),
            Some(_) => Self::Null,
        }
    }
}

impl From<i64> for Id {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Id {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// Renders the identifier as it appears on the wire.
impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent | Self::Null => f.write_str("null"),
            Self::Number(number) => write!(f, "{number}"),
            Self::String(text) => {
                let quoted = serde_json::to_string(text).map_err(|_| fmt::Error)?;
                f.write_str(&quoted)
            }
        }
    }
}

impl Serialize for Id {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Absent | Self::Null => serializer.serialize_unit(),
            Self::Number(number) => serializer.serialize_i64(*number),
            Self::String(text) => serializer.serialize_str(text),
        }
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(IdVisitor)
    }
}

/// Smallest float magnitude outside `i64`: 2^63.
const I64_FLOAT_BOUND: f64 = 9_223_372_036_854_775_808.0;

struct IdVisitor;

impl<'de> Visitor<'de> for IdVisitor {
    type Value = Id;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("an integer, a string, or null")
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Id, E> {
        Ok(Id::Number(value))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Id, E> {
        i64::try_from(value)
            .map(Id::Number)
            .map_err(|_| E::custom("id number out of range"))
    }

    /// Integer literals beyond `u64` or below `i64::MIN` arrive as floats.
    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Id, E> {
        if value.is_finite() && value.abs() >= I64_FLOAT_BOUND {
            return Err(E::custom("id number out of range"));
        }
        Err(E::invalid_type(de::Unexpected::Float(value), &self))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Id, E> {
        Ok(Id::String(value.to_owned()))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<Id, E> {
        Ok(Id::String(value))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Id, E> {
        Ok(Id::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Id, E> {
        Ok(Id::Null)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    #[case(Id::Absent, "null")]
    #[case(Id::Null, "null")]
    #[case(Id::Number(-7), "-7")]
    #[case(Id::from("a\"b"), r#""a\"b""#)]
    fn renders_wire_form(#[case] id: Id, #[case] expected: &str) {
        assert_eq!(id.to_string(), expected);
    }

    #[test]
    fn absent_and_null_are_notifications() {
        assert!(Id::Absent.is_notification());
        assert!(Id::Null.is_notification());
        assert!(Id::Number(0).is_valid());
        assert!(Id::from("x").is_valid());
    }

    #[test]
    fn deserialises_null_as_null() {
        let id: Id = serde_json::from_str("null").expect("null id");
        assert_eq!(id, Id::Null);
    }

    #[test]
    fn rejects_float_ids() {
        let result: Result<Id, _> = serde_json::from_str("1.5");
        assert!(result.is_err());
    }

    #[rstest]
    #[case("18446744073709551615")]
    #[case("18446744073709551616")]
    #[case("-9223372036854775809")]
    fn rejects_ids_beyond_i64(#[case] text: &str) {
        let error = serde_json::from_str::<Id>(text).expect_err("overflow");
        assert!(error.to_string().contains("out of range"), "{error}");
    }

    #[test]
    fn accepts_i64_minimum() {
        let id: Id = serde_json::from_str("-9223372036854775808").expect("i64::MIN");
        assert_eq!(id, Id::Number(i64::MIN));
    }

    #[rstest]
    #[case("1.0")]
    #[case("1e3")]
    fn small_floats_are_invalid_types(#[case] text: &str) {
        let error = serde_json::from_str::<Id>(text).expect_err("float id");
        assert!(error.to_string().contains("invalid type"), "{error}");
    }

    #[rstest]
    #[case(json!({"id": 3}), Id::Number(3))]
    #[case(json!({"id": "x"}), Id::from("x"))]
    #[case(json!({"id": null}), Id::Null)]
    #[case(json!({"id": [1]}), Id::Null)]
    #[case(json!({"method": "m"}), Id::Absent)]
    #[case(json!(42), Id::Absent)]
    fn salvages_identifier(#[case] value: Value, #[case] expected: Id) {
        assert_eq!(Id::salvage(&value), expected);
    }
}
