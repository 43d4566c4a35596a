//! Page property values.
//!
//! Only the property types automation needs are modeled; any other type is
//! kept as raw JSON through [`PageProperty::Unknown`].

use super::common::{DateRange, RelationRef, SelectOption};
use super::rich_text::{plain_text, Span};
use crate::core::{
    deserialize_union, resolve, DateOrDateTime, Deserializable, Fields, KeychainRegistry, MasterType,
    ObjectWriter, Serializable, Variant,
};
use crate::error::SerializationError;
use once_cell::sync::Lazy;
use serde_json::Value;

macro_rules! property_variant {
    ($(#[$meta:meta])* $variant:ident($value:ty) => $property:ident, $key:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $variant {
            pub value: $value,
            id: Option<String>,
        }

        impl $variant {
            pub fn new(value: $value) -> Self {
                Self { value, id: None }
            }

            /// Property id assigned by the server.
            pub fn id(&self) -> Option<&str> {
                self.id.as_deref()
            }
        }

        impl Serializable for $variant {
            fn serialize(&self) -> Result<Value, SerializationError> {
                Ok(ObjectWriter::new()
                    .field("type", $key)?
                    .field($key, &self.value)?
                    .finish())
            }
        }

        impl Deserializable for $variant {
            fn deserialize(value: &Value) -> Result<Self, SerializationError> {
                let fields = Fields::of(value, stringify!($variant))?;
                fields.expect_str("type", $key)?;
                Ok(Self {
                    value: fields.required($key)?,
                    id: fields.optional("id")?,
                })
            }
        }

        impl Variant<PropertyValue> for $variant {
            const KEYCHAIN: &'static [&'static str] = &[$key];
        }

        impl From<$variant> for PropertyValue {
            fn from(variant: $variant) -> Self {
                PropertyValue::$property(variant)
            }
        }
    };
}

property_variant!(TitleProperty(Vec<Span>) => Title, "title");
property_variant!(RichTextProperty(Vec<Span>) => RichText, "rich_text");
property_variant!(NumberProperty(Option<f64>) => Number, "number");
property_variant!(CheckboxProperty(bool) => Checkbox, "checkbox");
property_variant!(DateProperty(Option<DateRange>) => Date, "date");
property_variant!(
    /// Related pages; lists longer than 25 entries arrive truncated.
    RelationProperty(Vec<RelationRef>) => Relation, "relation"
);
property_variant!(SelectProperty(Option<SelectOption>) => Select, "select");
property_variant!(MultiSelectProperty(Vec<SelectOption>) => MultiSelect, "multi_select");
property_variant!(UrlProperty(Option<String>) => Url, "url");

/// A property value of a supported type.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Title(TitleProperty),
    RichText(RichTextProperty),
    Number(NumberProperty),
    Checkbox(CheckboxProperty),
    Date(DateProperty),
    Relation(RelationProperty),
    Select(SelectProperty),
    MultiSelect(MultiSelectProperty),
    Url(UrlProperty),
}

impl PropertyValue {
    pub fn title(spans: Vec<Span>) -> Self {
        TitleProperty::new(spans).into()
    }

    /// Human-readable rendering used by the command line.
    pub fn display(&self) -> String {
        match self {
            PropertyValue::Title(p) => plain_text(&p.value),
            PropertyValue::RichText(p) => plain_text(&p.value),
            PropertyValue::Number(p) => p.value.map(|n| n.to_string()).unwrap_or_default(),
            PropertyValue::Checkbox(p) => p.value.to_string(),
            PropertyValue::Date(p) => p
                .value
                .as_ref()
                .map(|range| match &range.end {
                    Some(end) => format!("{} → {}", date_text(&range.start), date_text(end)),
                    None => date_text(&range.start),
                })
                .unwrap_or_default(),
            PropertyValue::Relation(p) => p
                .value
                .iter()
                .map(|r| r.id.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            PropertyValue::Select(p) => p
                .value
                .as_ref()
                .map(|o| o.name.clone())
                .unwrap_or_default(),
            PropertyValue::MultiSelect(p) => p
                .value
                .iter()
                .map(|o| o.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            PropertyValue::Url(p) => p.value.clone().unwrap_or_default(),
        }
    }
}

fn date_text(value: &DateOrDateTime) -> String {
    match value {
        DateOrDateTime::Date(date) => date.format("%Y-%m-%d").to_string(),
        DateOrDateTime::DateTime(datetime) => datetime.to_rfc3339(),
    }
}

static PROPERTY_REGISTRY: Lazy<KeychainRegistry<PropertyValue>> = Lazy::new(|| {
    KeychainRegistry::with_variants(PropertyValue::NAME, "type", |registry| {
        registry.register_variant::<TitleProperty>()?;
        registry.register_variant::<RichTextProperty>()?;
        registry.register_variant::<NumberProperty>()?;
        registry.register_variant::<CheckboxProperty>()?;
        registry.register_variant::<DateProperty>()?;
        registry.register_variant::<RelationProperty>()?;
        registry.register_variant::<SelectProperty>()?;
        registry.register_variant::<MultiSelectProperty>()?;
        registry.register_variant::<UrlProperty>()
    })
});

impl MasterType for PropertyValue {
    const NAME: &'static str = "PropertyValue";

    fn registry() -> &'static KeychainRegistry<Self> {
        &PROPERTY_REGISTRY
    }
}

impl Serializable for PropertyValue {
    fn serialize(&self) -> Result<Value, SerializationError> {
        match self {
            PropertyValue::Title(p) => p.serialize(),
            PropertyValue::RichText(p) => p.serialize(),
            PropertyValue::Number(p) => p.serialize(),
            PropertyValue::Checkbox(p) => p.serialize(),
            PropertyValue::Date(p) => p.serialize(),
            PropertyValue::Relation(p) => p.serialize(),
            PropertyValue::Select(p) => p.serialize(),
            PropertyValue::MultiSelect(p) => p.serialize(),
            PropertyValue::Url(p) => p.serialize(),
        }
    }
}

impl Deserializable for PropertyValue {
    fn deserialize(value: &Value) -> Result<Self, SerializationError> {
        resolve(value)
    }
}

/// One entry of a page's `properties` map.
#[derive(Debug, Clone, PartialEq)]
pub enum PageProperty {
    Known(PropertyValue),
    /// A property type without a model, kept verbatim.
    Unknown(Value),
}

impl PageProperty {
    pub fn known(&self) -> Option<&PropertyValue> {
        match self {
            PageProperty::Known(value) => Some(value),
            PageProperty::Unknown(_) => None,
        }
    }

    /// The property's `type`, for known and unknown values alike.
    pub fn kind(&self) -> Option<String> {
        match self {
            PageProperty::Known(value) => value
                .serialize()
                .ok()
                .and_then(|v| v.get("type").and_then(Value::as_str).map(str::to_string)),
            PageProperty::Unknown(raw) => raw.get("type").and_then(Value::as_str).map(str::to_string),
        }
    }
}

fn known_property(value: &Value) -> Result<PageProperty, SerializationError> {
    PropertyValue::deserialize(value).map(PageProperty::Known)
}

fn unknown_property(value: &Value) -> Result<PageProperty, SerializationError> {
    let fields = Fields::of(value, "PageProperty")?;
    let kind: String = fields.required("type")?;
    if PropertyValue::registry()
        .keychains()
        .any(|keychain| keychain.values() == [kind.as_str()])
    {
        return Err(SerializationError::new("malformed value of a modeled property type")
            .with_var("type", kind));
    }
    Ok(PageProperty::Unknown(value.clone()))
}

impl Serializable for PageProperty {
    fn serialize(&self) -> Result<Value, SerializationError> {
        match self {
            PageProperty::Known(value) => value.serialize(),
            PageProperty::Unknown(raw) => Ok(raw.clone()),
        }
    }
}

impl Deserializable for PageProperty {
    /// A modeled type must parse; anything else is kept raw.
    fn deserialize(value: &Value) -> Result<Self, SerializationError> {
        deserialize_union(
            value,
            &[("known", known_property), ("unknown", unknown_property)],
        )
    }
}

impl From<PropertyValue> for PageProperty {
    fn from(value: PropertyValue) -> Self {
        PageProperty::Known(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{deserialize, serialize, Keychain};
    use crate::types::NotionId;
    use chrono::NaiveDate;
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_properties_round_trip_and_match_keychains() {
        let id = NotionId::parse("550e8400e29b41d4a716446655440000").unwrap();
        let samples: Vec<PropertyValue> = vec![
            PropertyValue::title(vec![Span::text("Week 12")]),
            RichTextProperty::new(vec![Span::text("notes")]).into(),
            NumberProperty::new(Some(3.5)).into(),
            CheckboxProperty::new(true).into(),
            DateProperty::new(Some(DateRange::new(
                NaiveDate::from_ymd_opt(2023, 3, 20).unwrap(),
            )))
            .into(),
            RelationProperty::new(vec![RelationRef { id }]).into(),
            SelectProperty::new(Some(SelectOption::new("Done"))).into(),
            MultiSelectProperty::new(vec![SelectOption::new("a"), SelectOption::new("b")]).into(),
            UrlProperty::new(None).into(),
        ];
        let registered: Vec<&Keychain> = PropertyValue::registry().keychains().collect();
        for (value, keychain) in samples.iter().zip(registered) {
            let written = serialize(value).unwrap();
            assert_eq!(&Keychain::from_shape(&written, "type").unwrap(), keychain);
            assert_eq!(&deserialize::<PropertyValue>(&written).unwrap(), value);
        }
    }

    #[test]
    fn test_page_properties_keep_unknown_types() {
        let raw = json!({
            "Name": {"id": "title", "type": "title", "title": [
                {"type": "text", "text": {"content": "Daily", "link": null}, "plain_text": "Daily"}
            ]},
            "Created": {"id": "abc", "type": "created_time", "created_time": "2023-01-01T00:00:00.000Z"},
            "Done": {"id": "def", "type": "checkbox", "checkbox": false}
        });
        let parsed: IndexMap<String, PageProperty> = deserialize(&raw).unwrap();
        assert_eq!(parsed["Name"].known().unwrap().display(), "Daily");
        assert_eq!(parsed["Created"].kind().as_deref(), Some("created_time"));
        assert!(matches!(parsed["Created"], PageProperty::Unknown(_)));
        let PageProperty::Known(PropertyValue::Title(title)) = &parsed["Name"] else {
            panic!("expected a title");
        };
        assert_eq!(title.id(), Some("title"));
    }

    #[test]
    fn test_malformed_known_type_is_an_error() {
        let raw = json!({"Done": {"type": "checkbox", "checkbox": "yes"}});
        let err = deserialize::<IndexMap<String, PageProperty>>(&raw).unwrap_err();
        assert_eq!(err.path_string(), "Done");
        let labels: Vec<&str> = err.causes().iter().map(|(label, _)| label.as_str()).collect();
        assert_eq!(labels, vec!["known", "unknown"]);
    }
}
