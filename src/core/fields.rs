// src/core/fields.rs
//! Field-by-field access to JSON objects for hand-written dataclass shapes.
//!
//! [`Fields`] reads declared fields out of an incoming object; every nested
//! failure is tagged with the field's key. [`ObjectWriter`] is the
//! serialization counterpart and skips unset optional fields.

use super::serialization::{json_type_name, Deserializable, Serializable};
use crate::error::SerializationError;
use serde_json::{Map, Value};

/// Read-only view over the fields of one JSON object.
#[derive(Debug, Clone, Copy)]
pub struct Fields<'a> {
    type_name: &'static str,
    map: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    /// Fails unless `value` is a JSON object.
    pub fn of(value: &'a Value, type_name: &'static str) -> Result<Self, SerializationError> {
        match value {
            Value::Object(map) => Ok(Self { type_name, map }),
            other => Err(SerializationError::new(format!(
                "{} must be an object, got {}",
                type_name,
                json_type_name(other)
            ))
            .with_value(other)),
        }
    }

    /// A field that must be present.
    pub fn required<T: Deserializable>(&self, key: &str) -> Result<T, SerializationError> {
        let value = self.map.get(key).ok_or_else(|| {
            SerializationError::new(format!("{} is missing field '{}'", self.type_name, key))
                .with_var("keys", self.keys())
        })?;
        T::deserialize(value).map_err(|e| e.at(key))
    }

    /// A field that may be absent or `null`; either way it stays unset.
    pub fn optional<T: Deserializable>(&self, key: &str) -> Result<Option<T>, SerializationError> {
        match self.map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => T::deserialize(value).map(Some).map_err(|e| e.at(key)),
        }
    }

    /// A field with a declared default.
    pub fn or_default<T: Deserializable + Default>(
        &self,
        key: &str,
    ) -> Result<T, SerializationError> {
        Ok(self.optional(key)?.unwrap_or_default())
    }

    /// A field that must hold exactly `expected`.
    pub fn expect_str(&self, key: &str, expected: &str) -> Result<(), SerializationError> {
        let found: String = self.required(key)?;
        if found == expected {
            Ok(())
        } else {
            Err(SerializationError::new(format!(
                "{} expects '{}' to be '{}'",
                self.type_name, key, expected
            ))
            .with_var("found", found)
            .at(key))
        }
    }

    pub fn raw(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn keys(&self) -> Vec<&'a str> {
        self.map.keys().map(String::as_str).collect()
    }
}

/// Builds a JSON object field by field.
#[derive(Debug, Default, Clone)]
pub struct ObjectWriter {
    map: Map<String, Value>,
}

impl ObjectWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field<T: Serializable + ?Sized>(
        mut self,
        key: &str,
        value: &T,
    ) -> Result<Self, SerializationError> {
        let serialized = value.serialize().map_err(|e| e.at(key))?;
        self.map.insert(key.to_string(), serialized);
        Ok(self)
    }

    /// Writes the field only when it is set.
    pub fn optional<T: Serializable>(
        self,
        key: &str,
        value: &Option<T>,
    ) -> Result<Self, SerializationError> {
        match value {
            Some(inner) => self.field(key, inner),
            None => Ok(self),
        }
    }

    pub fn raw(mut self, key: &str, value: Value) -> Self {
        self.map.insert(key.to_string(), value);
        self
    }

    pub fn finish(self) -> Value {
        Value::Object(self.map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PathSegment;
    use serde_json::json;

    #[test]
    fn test_required_and_optional_fields() {
        let value = json!({"name": "Ada", "age": null, "tags": ["x"]});
        let fields = Fields::of(&value, "Person").unwrap();

        assert_eq!(fields.required::<String>("name").unwrap(), "Ada");
        assert_eq!(fields.optional::<u32>("age").unwrap(), None);
        assert_eq!(fields.optional::<u32>("height").unwrap(), None);
        assert_eq!(fields.or_default::<Vec<String>>("tags").unwrap(), vec!["x"]);
        assert_eq!(fields.or_default::<Vec<String>>("other").unwrap(), Vec::<String>::new());

        let err = fields.required::<String>("email").unwrap_err();
        assert!(err.description().contains("missing field 'email'"));
    }

    #[test]
    fn test_field_errors_carry_the_key() {
        let value = json!({"items": [1, "bad", 3]});
        let fields = Fields::of(&value, "Holder").unwrap();
        let err = fields.required::<Vec<i64>>("items").unwrap_err();
        assert_eq!(
            err.path(),
            vec![PathSegment::Key("items".into()), PathSegment::Index(1)]
        );
    }

    #[test]
    fn test_non_object_is_rejected() {
        let err = Fields::of(&json!([1]), "Holder").unwrap_err();
        assert!(err.description().starts_with("Holder must be an object"));
    }

    #[test]
    fn test_writer_skips_unset_optionals() {
        let written = ObjectWriter::new()
            .field("name", "Ada")
            .and_then(|w| w.optional("age", &Option::<u32>::None))
            .and_then(|w| w.optional("height", &Some(170u32)))
            .map(|w| w.raw("extra", json!(true)).finish())
            .unwrap();
        assert_eq!(written, json!({"name": "Ada", "height": 170, "extra": true}));
    }
}
