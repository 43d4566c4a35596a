// src/core/serialization.rs
//! Generic JSON serialization engine.
//!
//! Types opt in through [`Serializable`] and [`Deserializable`]; the free
//! functions [`serialize`] and [`deserialize`] are the entry points used by
//! the request layer and by collaborators. Collections recurse element-wise
//! and tag failures with the failing key or index, so an error deep inside a
//! payload reports the full path to the offending element.

use crate::error::SerializationError;
use crate::types::NotionId;
use indexmap::IndexMap;
use serde_json::{Map, Number, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::{BuildHasher, Hash};
use uuid::Uuid;

/// Converts a value into its JSON wire form.
pub trait Serializable {
    fn serialize(&self) -> Result<Value, SerializationError>;
}

/// Builds a value from its JSON wire form.
pub trait Deserializable: Sized {
    fn deserialize(value: &Value) -> Result<Self, SerializationError>;
}

pub fn serialize<T: Serializable + ?Sized>(value: &T) -> Result<Value, SerializationError> {
    value.serialize()
}

pub fn deserialize<T: Deserializable>(value: &Value) -> Result<T, SerializationError> {
    T::deserialize(value)
}

/// Tries each alternative left-to-right and returns the first success.
///
/// When every alternative fails, the returned error nests each failure
/// under the alternative's name.
pub fn deserialize_union<T>(
    value: &Value,
    alternatives: &[(&str, fn(&Value) -> Result<T, SerializationError>)],
) -> Result<T, SerializationError> {
    let mut failures = Vec::with_capacity(alternatives.len());
    for (name, attempt) in alternatives {
        match attempt(value) {
            Ok(parsed) => return Ok(parsed),
            Err(err) => failures.push((*name, err)),
        }
    }

    let names: Vec<&str> = alternatives.iter().map(|(name, _)| *name).collect();
    let mut err = SerializationError::new("value matches none of the union alternatives")
        .with_var("alternatives", names)
        .with_value(value);
    for (name, cause) in failures {
        err = err.with_cause(name, cause);
    }
    Err(err)
}

/// Accepts only one of the `allowed` strings and returns the matching one.
pub fn deserialize_literal<'a>(
    value: &Value,
    allowed: &[&'a str],
) -> Result<&'a str, SerializationError> {
    value
        .as_str()
        .and_then(|text| allowed.iter().find(|candidate| **candidate == text))
        .copied()
        .ok_or_else(|| {
            SerializationError::new("value is not one of the allowed literals")
                .with_var("allowed", allowed)
                .with_value(value)
        })
}

fn type_mismatch(expected: &str, value: &Value) -> SerializationError {
    SerializationError::new(format!("expected {}, got {}", expected, json_type_name(value)))
        .with_value(value)
}

/// Name of the JSON type of `value`, for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// Passthrough and optional values
// ---------------------------------------------------------------------------

impl Serializable for Value {
    fn serialize(&self) -> Result<Value, SerializationError> {
        Ok(self.clone())
    }
}

impl Deserializable for Value {
    fn deserialize(value: &Value) -> Result<Self, SerializationError> {
        Ok(value.clone())
    }
}

impl<T: Serializable> Serializable for Option<T> {
    fn serialize(&self) -> Result<Value, SerializationError> {
        match self {
            Some(inner) => inner.serialize(),
            None => Ok(Value::Null),
        }
    }
}

impl<T: Deserializable> Deserializable for Option<T> {
    fn deserialize(value: &Value) -> Result<Self, SerializationError> {
        match value {
            Value::Null => Ok(None),
            other => T::deserialize(other).map(Some),
        }
    }
}

impl<T: Serializable + ?Sized> Serializable for &T {
    fn serialize(&self) -> Result<Value, SerializationError> {
        (**self).serialize()
    }
}

impl<T: Serializable + ?Sized> Serializable for Box<T> {
    fn serialize(&self) -> Result<Value, SerializationError> {
        (**self).serialize()
    }
}

impl<T: Deserializable> Deserializable for Box<T> {
    fn deserialize(value: &Value) -> Result<Self, SerializationError> {
        T::deserialize(value).map(Box::new)
    }
}

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

impl Serializable for bool {
    fn serialize(&self) -> Result<Value, SerializationError> {
        Ok(Value::Bool(*self))
    }
}

impl Deserializable for bool {
    fn deserialize(value: &Value) -> Result<Self, SerializationError> {
        value.as_bool().ok_or_else(|| type_mismatch("a boolean", value))
    }
}

impl Serializable for str {
    fn serialize(&self) -> Result<Value, SerializationError> {
        Ok(Value::String(self.to_string()))
    }
}

impl Serializable for String {
    fn serialize(&self) -> Result<Value, SerializationError> {
        Ok(Value::String(self.clone()))
    }
}

impl Deserializable for String {
    fn deserialize(value: &Value) -> Result<Self, SerializationError> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| type_mismatch("a string", value))
    }
}

macro_rules! integer_serialization {
    ($($int:ty),* $(,)?) => {$(
        impl Serializable for $int {
            fn serialize(&self) -> Result<Value, SerializationError> {
                Ok(Value::from(*self))
            }
        }

        impl Deserializable for $int {
            fn deserialize(value: &Value) -> Result<Self, SerializationError> {
                let Value::Number(number) = value else {
                    return Err(type_mismatch("an integer", value));
                };
                number
                    .as_i64()
                    .and_then(|n| <$int>::try_from(n).ok())
                    .or_else(|| number.as_u64().and_then(|n| <$int>::try_from(n).ok()))
                    .ok_or_else(|| {
                        SerializationError::new(concat!(
                            "number does not fit in ",
                            stringify!($int)
                        ))
                        .with_value(value)
                    })
            }
        }
    )*};
}

integer_serialization!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

macro_rules! float_serialization {
    ($($float:ty),* $(,)?) => {$(
        impl Serializable for $float {
            fn serialize(&self) -> Result<Value, SerializationError> {
                Number::from_f64(f64::from(*self))
                    .map(Value::Number)
                    .ok_or_else(|| {
                        SerializationError::new("non-finite floats have no JSON form")
                            .with_var("value", self)
                    })
            }
        }

        impl Deserializable for $float {
            fn deserialize(value: &Value) -> Result<Self, SerializationError> {
                value
                    .as_f64()
                    .map(|n| n as $float)
                    .ok_or_else(|| type_mismatch("a number", value))
            }
        }
    )*};
}

float_serialization!(f32, f64);

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

impl Serializable for Uuid {
    fn serialize(&self) -> Result<Value, SerializationError> {
        Ok(Value::String(self.as_hyphenated().to_string()))
    }
}

impl Deserializable for Uuid {
    fn deserialize(value: &Value) -> Result<Self, SerializationError> {
        let text = value.as_str().ok_or_else(|| type_mismatch("a UUID string", value))?;
        Uuid::try_parse(text).map_err(|e| {
            SerializationError::new(format!("invalid UUID: {}", e)).with_value(value)
        })
    }
}

impl Serializable for NotionId {
    fn serialize(&self) -> Result<Value, SerializationError> {
        Ok(Value::String(self.to_dashed()))
    }
}

impl Deserializable for NotionId {
    fn deserialize(value: &Value) -> Result<Self, SerializationError> {
        let text = value.as_str().ok_or_else(|| type_mismatch("an id string", value))?;
        NotionId::parse(text)
            .map_err(|e| SerializationError::new(e.to_string()).with_value(value))
    }
}

// ---------------------------------------------------------------------------
// Sequences
// ---------------------------------------------------------------------------

fn serialize_items<'a, T, I>(items: I) -> Result<Value, SerializationError>
where
    T: Serializable + 'a,
    I: IntoIterator<Item = &'a T>,
{
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| item.serialize().map_err(|e| e.at(index)))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

fn deserialize_items<T, C>(value: &Value) -> Result<C, SerializationError>
where
    T: Deserializable,
    C: FromIterator<T>,
{
    value
        .as_array()
        .ok_or_else(|| type_mismatch("an array", value))?
        .iter()
        .enumerate()
        .map(|(index, item)| T::deserialize(item).map_err(|e| e.at(index)))
        .collect()
}

impl<T: Serializable> Serializable for [T] {
    fn serialize(&self) -> Result<Value, SerializationError> {
        serialize_items(self)
    }
}

impl<T: Serializable> Serializable for Vec<T> {
    fn serialize(&self) -> Result<Value, SerializationError> {
        serialize_items(self)
    }
}

impl<T: Deserializable> Deserializable for Vec<T> {
    fn deserialize(value: &Value) -> Result<Self, SerializationError> {
        deserialize_items(value)
    }
}

impl<T: Serializable, S> Serializable for HashSet<T, S> {
    fn serialize(&self) -> Result<Value, SerializationError> {
        serialize_items(self)
    }
}

impl<T, S> Deserializable for HashSet<T, S>
where
    T: Deserializable + Eq + Hash,
    S: BuildHasher + Default,
{
    fn deserialize(value: &Value) -> Result<Self, SerializationError> {
        deserialize_items(value)
    }
}

impl<T: Serializable> Serializable for BTreeSet<T> {
    fn serialize(&self) -> Result<Value, SerializationError> {
        serialize_items(self)
    }
}

impl<T: Deserializable + Ord> Deserializable for BTreeSet<T> {
    fn deserialize(value: &Value) -> Result<Self, SerializationError> {
        deserialize_items(value)
    }
}

// ---------------------------------------------------------------------------
// Mappings (string keys, insertion order preserved where the map keeps it)
// ---------------------------------------------------------------------------

fn serialize_entries<'a, T, I>(entries: I) -> Result<Value, SerializationError>
where
    T: Serializable + 'a,
    I: IntoIterator<Item = (&'a String, &'a T)>,
{
    let mut map = Map::new();
    for (key, item) in entries {
        let serialized = item.serialize().map_err(|e| e.at(key.as_str()))?;
        map.insert(key.clone(), serialized);
    }
    Ok(Value::Object(map))
}

fn deserialize_entries<T, C>(value: &Value) -> Result<C, SerializationError>
where
    T: Deserializable,
    C: FromIterator<(String, T)>,
{
    value
        .as_object()
        .ok_or_else(|| type_mismatch("an object", value))?
        .iter()
        .map(|(key, item)| {
            T::deserialize(item)
                .map(|parsed| (key.clone(), parsed))
                .map_err(|e| e.at(key.as_str()))
        })
        .collect()
}

impl<T: Serializable, S> Serializable for IndexMap<String, T, S> {
    fn serialize(&self) -> Result<Value, SerializationError> {
        serialize_entries(self)
    }
}

impl<T: Deserializable, S: BuildHasher + Default> Deserializable for IndexMap<String, T, S> {
    fn deserialize(value: &Value) -> Result<Self, SerializationError> {
        deserialize_entries(value)
    }
}

impl<T: Serializable, S> Serializable for HashMap<String, T, S> {
    fn serialize(&self) -> Result<Value, SerializationError> {
        serialize_entries(self)
    }
}

impl<T: Deserializable, S: BuildHasher + Default> Deserializable for HashMap<String, T, S> {
    fn deserialize(value: &Value) -> Result<Self, SerializationError> {
        deserialize_entries(value)
    }
}

impl<T: Serializable> Serializable for BTreeMap<String, T> {
    fn serialize(&self) -> Result<Value, SerializationError> {
        serialize_entries(self)
    }
}

impl<T: Deserializable> Deserializable for BTreeMap<String, T> {
    fn deserialize(value: &Value) -> Result<Self, SerializationError> {
        deserialize_entries(value)
    }
}

// ---------------------------------------------------------------------------
// Declaration helpers
// ---------------------------------------------------------------------------

/// Implements both capabilities for a single-field tuple struct by
/// unwrapping to the inner type, converting it, and rewrapping.
#[macro_export]
macro_rules! newtype_serialization {
    ($newtype:ty, $inner:ty) => {
        impl $crate::core::Serializable for $newtype {
            fn serialize(
                &self,
            ) -> ::std::result::Result<::serde_json::Value, $crate::error::SerializationError> {
                $crate::core::Serializable::serialize(&self.0)
            }
        }

        impl $crate::core::Deserializable for $newtype {
            fn deserialize(
                value: &::serde_json::Value,
            ) -> ::std::result::Result<Self, $crate::error::SerializationError> {
                <$inner as $crate::core::Deserializable>::deserialize(value).map(Self)
            }
        }
    };
}

/// Implements both capabilities for a `serde`-derived enum, whose wire
/// form is its underlying string value.
#[macro_export]
macro_rules! serde_enum_serialization {
    ($($enum:ty),* $(,)?) => {$(
        impl $crate::core::Serializable for $enum {
            fn serialize(
                &self,
            ) -> ::std::result::Result<::serde_json::Value, $crate::error::SerializationError> {
                ::serde_json::to_value(self).map_err(|e| {
                    $crate::error::SerializationError::new(e.to_string())
                        .with_var("type", stringify!($enum))
                })
            }
        }

        impl $crate::core::Deserializable for $enum {
            fn deserialize(
                value: &::serde_json::Value,
            ) -> ::std::result::Result<Self, $crate::error::SerializationError> {
                <$enum as ::serde::Deserialize>::deserialize(value).map_err(|e| {
                    $crate::error::SerializationError::new(format!(
                        "not a valid {}: {}",
                        stringify!($enum),
                        e
                    ))
                    .with_value(value)
                })
            }
        }
    )*};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PathSegment;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[derive(Debug, PartialEq)]
    struct Expression(String);

    crate::newtype_serialization!(Expression, String);

    #[test]
    fn test_primitives_pass_through() {
        assert_eq!(serialize(&true).unwrap(), json!(true));
        assert_eq!(serialize("abc").unwrap(), json!("abc"));
        assert_eq!(serialize(&42i64).unwrap(), json!(42));
        assert_eq!(serialize(&1.5f64).unwrap(), json!(1.5));
        assert_eq!(serialize(&Option::<i32>::None).unwrap(), Value::Null);
    }

    #[test]
    fn test_booleans_are_not_numbers() {
        assert!(deserialize::<i64>(&json!(true)).is_err());
        assert!(deserialize::<bool>(&json!(1)).is_err());
        assert_eq!(deserialize::<f64>(&json!(3)).unwrap(), 3.0);
    }

    #[test]
    fn test_integer_range_is_checked() {
        assert_eq!(deserialize::<u8>(&json!(255)).unwrap(), 255);
        assert!(deserialize::<u8>(&json!(256)).is_err());
        assert!(deserialize::<u32>(&json!(-1)).is_err());
        assert!(deserialize::<i64>(&json!(1.5)).is_err());
    }

    #[test]
    fn test_non_finite_float_is_rejected() {
        let err = serialize(&f64::NAN).unwrap_err();
        assert!(err.description().contains("non-finite"));
    }

    #[test]
    fn test_null_input_and_any_target_pass_through() {
        assert_eq!(deserialize::<Option<String>>(&Value::Null).unwrap(), None);
        let raw = json!({"anything": [1, 2, {"x": null}]});
        assert_eq!(deserialize::<Value>(&raw).unwrap(), raw);
    }

    #[test]
    fn test_mapping_keeps_keys_and_tags_errors() {
        let parsed: IndexMap<String, i32> =
            deserialize(&json!({"b": 2, "a": 1})).unwrap();
        assert_eq!(parsed.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(serialize(&parsed).unwrap(), json!({"b": 2, "a": 1}));

        let err = deserialize::<BTreeMap<String, i32>>(&json!({"ok": 1, "bad": "x"}))
            .unwrap_err();
        assert_eq!(err.path(), vec![PathSegment::Key("bad".into())]);
    }

    #[test]
    fn test_nested_collection_path_is_innermost_first() {
        let err = deserialize::<Vec<Vec<bool>>>(&json!([[true], [false, 0]])).unwrap_err();
        assert_eq!(
            err.inverted_path(),
            &[PathSegment::Index(1), PathSegment::Index(1)]
        );
        assert_eq!(err.path_string(), "[1][1]");
    }

    #[test]
    fn test_sets_become_lists() {
        let set: BTreeSet<String> = ["b".to_string(), "a".to_string()].into_iter().collect();
        assert_eq!(serialize(&set).unwrap(), json!(["a", "b"]));
        let parsed: HashSet<u32> = deserialize(&json!([1, 2, 2])).unwrap();
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn test_uuid_is_dashed() {
        let uuid = Uuid::try_parse("550e8400e29b41d4a716446655440000").unwrap();
        assert_eq!(
            serialize(&uuid).unwrap(),
            json!("550e8400-e29b-41d4-a716-446655440000")
        );
        assert_eq!(
            deserialize::<Uuid>(&json!("550e8400-e29b-41d4-a716-446655440000")).unwrap(),
            uuid
        );
        assert!(deserialize::<Uuid>(&json!("nope")).is_err());
    }

    #[test]
    fn test_newtype_unwraps_and_rewraps() {
        let parsed: Expression = deserialize(&json!("e=mc^2")).unwrap();
        assert_eq!(parsed, Expression("e=mc^2".to_string()));
        assert_eq!(serialize(&parsed).unwrap(), json!("e=mc^2"));
        assert!(deserialize::<Expression>(&json!(7)).is_err());
    }

    #[test]
    fn test_literal() {
        let allowed = ["today", "now"];
        assert_eq!(deserialize_literal(&json!("now"), &allowed).unwrap(), "now");
        let err = deserialize_literal(&json!("later"), &allowed).unwrap_err();
        assert!(err.vars().contains_key("allowed"));
    }

    #[test]
    fn test_union_first_success_wins() {
        #[derive(Debug, PartialEq)]
        enum NumberOrText {
            Number(i64),
            Text(String),
        }

        let alternatives: [(&str, fn(&Value) -> Result<NumberOrText, SerializationError>); 2] = [
            ("number", |v| i64::deserialize(v).map(NumberOrText::Number)),
            ("text", |v| String::deserialize(v).map(NumberOrText::Text)),
        ];

        assert_eq!(
            deserialize_union(&json!(5), &alternatives).unwrap(),
            NumberOrText::Number(5)
        );
        assert_eq!(
            deserialize_union(&json!("5"), &alternatives).unwrap(),
            NumberOrText::Text("5".into())
        );

        let err = deserialize_union(&json!([5]), &alternatives).unwrap_err();
        let labels: Vec<&str> = err.causes().iter().map(|(label, _)| label.as_str()).collect();
        assert_eq!(labels, vec!["number", "text"]);
    }
}
