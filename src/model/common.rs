//! Small value shapes shared by spans and property values.

use crate::core::{
    DateOrDateTime, Deserializable, Fields, ObjectWriter, Serializable,
};
use crate::error::SerializationError;
use crate::types::{Color, NotionId};
use serde_json::Value;

/// Text styling of a rich-text span.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Annotations {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub underline: bool,
    pub code: bool,
    pub color: Color,
}

impl Serializable for Annotations {
    fn serialize(&self) -> Result<Value, SerializationError> {
        Ok(ObjectWriter::new()
            .field("bold", &self.bold)?
            .field("italic", &self.italic)?
            .field("strikethrough", &self.strikethrough)?
            .field("underline", &self.underline)?
            .field("code", &self.code)?
            .field("color", &self.color)?
            .finish())
    }
}

impl Deserializable for Annotations {
    fn deserialize(value: &Value) -> Result<Self, SerializationError> {
        let fields = Fields::of(value, "Annotations")?;
        Ok(Self {
            bold: fields.or_default("bold")?,
            italic: fields.or_default("italic")?,
            strikethrough: fields.or_default("strikethrough")?,
            underline: fields.or_default("underline")?,
            code: fields.or_default("code")?,
            color: fields.or_default("color")?,
        })
    }
}

/// A date, or a date range, with an optional IANA zone name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateOrDateTime,
    pub end: Option<DateOrDateTime>,
    pub time_zone: Option<String>,
}

impl DateRange {
    pub fn new(start: impl Into<DateOrDateTime>) -> Self {
        Self {
            start: start.into(),
            end: None,
            time_zone: None,
        }
    }

    pub fn until(mut self, end: impl Into<DateOrDateTime>) -> Self {
        self.end = Some(end.into());
        self
    }
}

impl Serializable for DateRange {
    fn serialize(&self) -> Result<Value, SerializationError> {
        Ok(ObjectWriter::new()
            .field("start", &self.start)?
            .field("end", &self.end)?
            .optional("time_zone", &self.time_zone)?
            .finish())
    }
}

impl Deserializable for DateRange {
    fn deserialize(value: &Value) -> Result<Self, SerializationError> {
        let fields = Fields::of(value, "DateRange")?;
        Ok(Self {
            start: fields.required("start")?,
            end: fields.optional("end")?,
            time_zone: fields.optional("time_zone")?,
        })
    }
}

/// An option of a select or multi-select property.
///
/// `id` is assigned by the server and never sent back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub name: String,
    pub color: Option<Color>,
    id: Option<String>,
}

impl SelectOption {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: None,
            id: None,
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_server_fields(mut self, id: Option<String>) -> Self {
        self.id = id;
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

impl Serializable for SelectOption {
    fn serialize(&self) -> Result<Value, SerializationError> {
        Ok(ObjectWriter::new()
            .field("name", &self.name)?
            .optional("color", &self.color)?
            .finish())
    }
}

impl Deserializable for SelectOption {
    fn deserialize(value: &Value) -> Result<Self, SerializationError> {
        let fields = Fields::of(value, "SelectOption")?;
        let option = Self {
            name: fields.required("name")?,
            color: fields.optional("color")?,
            id: None,
        };
        Ok(option.with_server_fields(fields.optional("id")?))
    }
}

/// One target of a relation property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RelationRef {
    pub id: NotionId,
}

impl Serializable for RelationRef {
    fn serialize(&self) -> Result<Value, SerializationError> {
        Ok(ObjectWriter::new().field("id", &self.id)?.finish())
    }
}

impl Deserializable for RelationRef {
    fn deserialize(value: &Value) -> Result<Self, SerializationError> {
        let fields = Fields::of(value, "RelationRef")?;
        Ok(Self {
            id: fields.required("id")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Person,
    Bot,
}

crate::serde_enum_serialization!(UserType);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{deserialize, serialize};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_annotations_default_missing_flags() {
        let parsed: Annotations = deserialize(&json!({"bold": true, "color": "red"})).unwrap();
        assert_eq!(
            parsed,
            Annotations {
                bold: true,
                color: Color::Red,
                ..Annotations::default()
            }
        );
        assert_eq!(deserialize::<Annotations>(&serialize(&parsed).unwrap()).unwrap(), parsed);
    }

    #[test]
    fn test_date_range_round_trip() {
        let range = DateRange::new(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap())
            .until(NaiveDate::from_ymd_opt(2023, 1, 7).unwrap());
        let written = serialize(&range).unwrap();
        assert_eq!(written, json!({"start": "2023-01-01", "end": "2023-01-07"}));
        assert_eq!(deserialize::<DateRange>(&written).unwrap(), range);
    }

    #[test]
    fn test_select_option_id_is_server_only() {
        let parsed: SelectOption =
            deserialize(&json!({"id": "abc", "name": "Reading", "color": "blue"})).unwrap();
        assert_eq!(parsed.id(), Some("abc"));
        assert_eq!(
            serialize(&parsed).unwrap(),
            json!({"name": "Reading", "color": "blue"})
        );
    }

    #[test]
    fn test_user_type_wire_names() {
        assert_eq!(serialize(&UserType::Bot).unwrap(), json!("bot"));
        assert!(deserialize::<UserType>(&json!("robot")).is_err());
    }
}
