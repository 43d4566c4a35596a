//! Rich-text spans: the `Span` master type and its variants.
//!
//! Every span nests its payload under its discriminator chain, e.g. a date
//! mention is `{"type": "mention", "mention": {"type": "date", "date": {...}}}`.
//! `annotations` is client-supplied; `plain_text` and `href` are computed by
//! the server, read on deserialization and never written back.

use super::common::{Annotations, DateRange};
use crate::core::{
    deserialize_literal, resolve, Deserializable, Fields, Keychain, KeychainRegistry, MasterType,
    ObjectWriter, Serializable, Variant,
};
use crate::error::SerializationError;
use crate::types::NotionId;
use once_cell::sync::Lazy;
use serde_json::Value;

/// Fields every span carries next to its payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpanCommon {
    pub annotations: Option<Annotations>,
    plain_text: Option<String>,
    href: Option<String>,
}

impl SpanCommon {
    pub fn with_annotations(annotations: Annotations) -> Self {
        Self {
            annotations: Some(annotations),
            ..Self::default()
        }
    }

    /// Second build phase: values only the server computes.
    pub fn with_server_fields(mut self, plain_text: Option<String>, href: Option<String>) -> Self {
        self.plain_text = plain_text;
        self.href = href;
        self
    }

    pub fn plain_text(&self) -> Option<&str> {
        self.plain_text.as_deref()
    }

    pub fn href(&self) -> Option<&str> {
        self.href.as_deref()
    }

    fn read(fields: &Fields<'_>) -> Result<Self, SerializationError> {
        let common = Self {
            annotations: fields.optional("annotations")?,
            ..Self::default()
        };
        Ok(common.with_server_fields(fields.optional("plain_text")?, fields.optional("href")?))
    }
}

/// Shape of one span variant below its discriminator chain.
trait SpanPayload: Sized {
    const CHAIN: &'static [&'static str];
    const NAME: &'static str;

    fn common(&self) -> &SpanCommon;

    fn write_payload(&self) -> Result<Value, SerializationError>;

    fn read_payload(payload: &Value, common: SpanCommon) -> Result<Self, SerializationError>;
}

fn write_span<P: SpanPayload>(span: &P) -> Result<Value, SerializationError> {
    let (outer, inner) = P::CHAIN
        .split_first()
        .ok_or_else(|| SerializationError::new("span has no discriminator chain"))?;
    let mut nested = span.write_payload()?;
    for name in inner.iter().rev() {
        nested = ObjectWriter::new()
            .field("type", *name)?
            .raw(name, nested)
            .finish();
    }
    Ok(ObjectWriter::new()
        .field("type", *outer)?
        .raw(outer, nested)
        .optional("annotations", &span.common().annotations)?
        .finish())
}

fn read_span<P: SpanPayload>(value: &Value) -> Result<P, SerializationError> {
    let common = SpanCommon::read(&Fields::of(value, P::NAME)?)?;

    let mut current = value;
    for (depth, name) in P::CHAIN.iter().enumerate() {
        let located = Fields::of(current, P::NAME)
            .and_then(|fields| {
                fields.expect_str("type", name)?;
                fields.raw(name).ok_or_else(|| {
                    SerializationError::new(format!("{} is missing field '{}'", P::NAME, name))
                })
            })
            .map_err(|e| {
                P::CHAIN[..depth]
                    .iter()
                    .rev()
                    .fold(e, |e, parent| e.at(*parent))
            })?;
        current = located;
    }

    P::read_payload(current, common).map_err(|e| P::CHAIN.iter().rev().fold(e, |e, name| e.at(*name)))
}

macro_rules! span_variant {
    ($variant:ident => $span:ident) => {
        impl Serializable for $variant {
            fn serialize(&self) -> Result<Value, SerializationError> {
                write_span(self)
            }
        }

        impl Deserializable for $variant {
            fn deserialize(value: &Value) -> Result<Self, SerializationError> {
                read_span(value)
            }
        }

        impl Variant<Span> for $variant {
            const KEYCHAIN: &'static [&'static str] = <$variant as SpanPayload>::CHAIN;
        }

        impl From<$variant> for Span {
            fn from(variant: $variant) -> Self {
                Span::$span(variant)
            }
        }
    };
}

/// Plain text, optionally linked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    pub content: String,
    pub link: Option<String>,
    pub common: SpanCommon,
}

impl TextSpan {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            link: None,
            common: SpanCommon::default(),
        }
    }

    pub fn linked(mut self, url: impl Into<String>) -> Self {
        self.link = Some(url.into());
        self
    }
}

impl SpanPayload for TextSpan {
    const CHAIN: &'static [&'static str] = &["text"];
    const NAME: &'static str = "TextSpan";

    fn common(&self) -> &SpanCommon {
        &self.common
    }

    fn write_payload(&self) -> Result<Value, SerializationError> {
        let link = match &self.link {
            Some(url) => ObjectWriter::new().field("url", url)?.finish(),
            None => Value::Null,
        };
        Ok(ObjectWriter::new()
            .field("content", &self.content)?
            .raw("link", link)
            .finish())
    }

    fn read_payload(payload: &Value, common: SpanCommon) -> Result<Self, SerializationError> {
        let fields = Fields::of(payload, Self::NAME)?;
        let link = match fields.raw("link") {
            None | Some(Value::Null) => None,
            Some(link) => Some(
                Fields::of(link, "Link")
                    .and_then(|link| link.required::<String>("url"))
                    .map_err(|e| e.at("link"))?,
            ),
        };
        Ok(Self {
            content: fields.required("content")?,
            link,
            common,
        })
    }
}

span_variant!(TextSpan => Text);

/// An inline LaTeX expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquationSpan {
    pub expression: String,
    pub common: SpanCommon,
}

impl SpanPayload for EquationSpan {
    const CHAIN: &'static [&'static str] = &["equation"];
    const NAME: &'static str = "EquationSpan";

    fn common(&self) -> &SpanCommon {
        &self.common
    }

    fn write_payload(&self) -> Result<Value, SerializationError> {
        Ok(ObjectWriter::new()
            .field("expression", &self.expression)?
            .finish())
    }

    fn read_payload(payload: &Value, common: SpanCommon) -> Result<Self, SerializationError> {
        Ok(Self {
            expression: Fields::of(payload, Self::NAME)?.required("expression")?,
            common,
        })
    }
}

span_variant!(EquationSpan => Equation);

/// Mention of a workspace user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserMention {
    pub user_id: NotionId,
    pub common: SpanCommon,
}

impl SpanPayload for UserMention {
    const CHAIN: &'static [&'static str] = &["mention", "user"];
    const NAME: &'static str = "UserMention";

    fn common(&self) -> &SpanCommon {
        &self.common
    }

    fn write_payload(&self) -> Result<Value, SerializationError> {
        Ok(ObjectWriter::new()
            .field("object", "user")?
            .field("id", &self.user_id)?
            .finish())
    }

    fn read_payload(payload: &Value, common: SpanCommon) -> Result<Self, SerializationError> {
        Ok(Self {
            user_id: Fields::of(payload, Self::NAME)?.required("id")?,
            common,
        })
    }
}

span_variant!(UserMention => UserMention);

/// Mention of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMention {
    pub page_id: NotionId,
    pub common: SpanCommon,
}

impl SpanPayload for PageMention {
    const CHAIN: &'static [&'static str] = &["mention", "page"];
    const NAME: &'static str = "PageMention";

    fn common(&self) -> &SpanCommon {
        &self.common
    }

    fn write_payload(&self) -> Result<Value, SerializationError> {
        Ok(ObjectWriter::new().field("id", &self.page_id)?.finish())
    }

    fn read_payload(payload: &Value, common: SpanCommon) -> Result<Self, SerializationError> {
        Ok(Self {
            page_id: Fields::of(payload, Self::NAME)?.required("id")?,
            common,
        })
    }
}

span_variant!(PageMention => PageMention);

/// Mention of a database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseMention {
    pub database_id: NotionId,
    pub common: SpanCommon,
}

impl SpanPayload for DatabaseMention {
    const CHAIN: &'static [&'static str] = &["mention", "database"];
    const NAME: &'static str = "DatabaseMention";

    fn common(&self) -> &SpanCommon {
        &self.common
    }

    fn write_payload(&self) -> Result<Value, SerializationError> {
        Ok(ObjectWriter::new().field("id", &self.database_id)?.finish())
    }

    fn read_payload(payload: &Value, common: SpanCommon) -> Result<Self, SerializationError> {
        Ok(Self {
            database_id: Fields::of(payload, Self::NAME)?.required("id")?,
            common,
        })
    }
}

span_variant!(DatabaseMention => DatabaseMention);

/// Mention of a date or date range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateMention {
    pub date: DateRange,
    pub common: SpanCommon,
}

impl DateMention {
    pub fn new(date: DateRange) -> Self {
        Self {
            date,
            common: SpanCommon::default(),
        }
    }
}

impl SpanPayload for DateMention {
    const CHAIN: &'static [&'static str] = &["mention", "date"];
    const NAME: &'static str = "DateMention";

    fn common(&self) -> &SpanCommon {
        &self.common
    }

    fn write_payload(&self) -> Result<Value, SerializationError> {
        self.date.serialize()
    }

    fn read_payload(payload: &Value, common: SpanCommon) -> Result<Self, SerializationError> {
        Ok(Self {
            date: DateRange::deserialize(payload)?,
            common,
        })
    }
}

span_variant!(DateMention => DateMention);

/// Placeholder date resolved when a template is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateDate {
    Today,
    Now,
}

crate::serde_enum_serialization!(TemplateDate);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDateMention {
    pub value: TemplateDate,
    pub common: SpanCommon,
}

impl SpanPayload for TemplateDateMention {
    const CHAIN: &'static [&'static str] = &["mention", "template_mention", "template_mention_date"];
    const NAME: &'static str = "TemplateDateMention";

    fn common(&self) -> &SpanCommon {
        &self.common
    }

    fn write_payload(&self) -> Result<Value, SerializationError> {
        self.value.serialize()
    }

    fn read_payload(payload: &Value, common: SpanCommon) -> Result<Self, SerializationError> {
        Ok(Self {
            value: <TemplateDate as Deserializable>::deserialize(payload)?,
            common,
        })
    }
}

span_variant!(TemplateDateMention => TemplateDateMention);

/// Placeholder for whoever applies the template; the only value is `"me"`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TemplateUserMention {
    pub common: SpanCommon,
}

impl SpanPayload for TemplateUserMention {
    const CHAIN: &'static [&'static str] = &["mention", "template_mention", "template_mention_user"];
    const NAME: &'static str = "TemplateUserMention";

    fn common(&self) -> &SpanCommon {
        &self.common
    }

    fn write_payload(&self) -> Result<Value, SerializationError> {
        Ok(Value::from("me"))
    }

    fn read_payload(payload: &Value, common: SpanCommon) -> Result<Self, SerializationError> {
        deserialize_literal(payload, &["me"])?;
        Ok(Self { common })
    }
}

span_variant!(TemplateUserMention => TemplateUserMention);

/// Mention rendering a preview of an external URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkPreviewMention {
    pub url: String,
    pub common: SpanCommon,
}

impl SpanPayload for LinkPreviewMention {
    const CHAIN: &'static [&'static str] = &["mention", "link_preview"];
    const NAME: &'static str = "LinkPreviewMention";

    fn common(&self) -> &SpanCommon {
        &self.common
    }

    fn write_payload(&self) -> Result<Value, SerializationError> {
        Ok(ObjectWriter::new().field("url", &self.url)?.finish())
    }

    fn read_payload(payload: &Value, common: SpanCommon) -> Result<Self, SerializationError> {
        Ok(Self {
            url: Fields::of(payload, Self::NAME)?.required("url")?,
            common,
        })
    }
}

span_variant!(LinkPreviewMention => LinkPreviewMention);

/// A span whose discriminator chain is not modeled, kept verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownSpan {
    pub keychain: Keychain,
    pub raw: Value,
    pub common: SpanCommon,
}

impl UnknownSpan {
    fn read(value: &Value, keychain: Keychain) -> Result<Self, SerializationError> {
        let common = SpanCommon::read(&Fields::of(value, "UnknownSpan")?)?;
        Ok(Self {
            keychain,
            raw: value.clone(),
            common,
        })
    }

    /// The stored payload without the server-computed fields.
    fn write(&self) -> Value {
        let mut raw = self.raw.clone();
        if let Some(object) = raw.as_object_mut() {
            object.remove("plain_text");
            object.remove("href");
        }
        raw
    }
}

/// Any rich-text span.
#[derive(Debug, Clone, PartialEq)]
pub enum Span {
    Text(TextSpan),
    Equation(EquationSpan),
    UserMention(UserMention),
    PageMention(PageMention),
    DatabaseMention(DatabaseMention),
    DateMention(DateMention),
    TemplateDateMention(TemplateDateMention),
    TemplateUserMention(TemplateUserMention),
    LinkPreviewMention(LinkPreviewMention),
    Unknown(UnknownSpan),
}

impl Span {
    pub fn text(content: impl Into<String>) -> Self {
        Span::Text(TextSpan::new(content))
    }

    pub fn common(&self) -> &SpanCommon {
        match self {
            Span::Text(span) => &span.common,
            Span::Equation(span) => &span.common,
            Span::UserMention(span) => &span.common,
            Span::PageMention(span) => &span.common,
            Span::DatabaseMention(span) => &span.common,
            Span::DateMention(span) => &span.common,
            Span::TemplateDateMention(span) => &span.common,
            Span::TemplateUserMention(span) => &span.common,
            Span::LinkPreviewMention(span) => &span.common,
            Span::Unknown(span) => &span.common,
        }
    }

    /// The server's plain text, or the span's own text for locally built spans.
    pub fn plain_text(&self) -> String {
        if let Some(plain) = self.common().plain_text() {
            return plain.to_string();
        }
        match self {
            Span::Text(span) => span.content.clone(),
            Span::Equation(span) => span.expression.clone(),
            Span::LinkPreviewMention(span) => span.url.clone(),
            _ => String::new(),
        }
    }
}

/// Concatenated plain text of a span list.
pub fn plain_text(spans: &[Span]) -> String {
    spans.iter().map(Span::plain_text).collect()
}

fn user_mention(value: &Value) -> Result<Span, SerializationError> {
    UserMention::deserialize(value).map(Span::UserMention)
}

static SPAN_REGISTRY: Lazy<KeychainRegistry<Span>> = Lazy::new(|| {
    KeychainRegistry::with_variants(Span::NAME, "type", |registry| {
        registry.register_variant::<TextSpan>()?;
        registry.register_variant::<EquationSpan>()?;
        registry.register_variant::<UserMention>()?;
        // Mentions may embed the full user object, which carries its own "type".
        registry.register(Keychain::new(["mention", "user", "person"]), user_mention)?;
        registry.register(Keychain::new(["mention", "user", "bot"]), user_mention)?;
        registry.register_variant::<PageMention>()?;
        registry.register_variant::<DatabaseMention>()?;
        registry.register_variant::<DateMention>()?;
        registry.register_variant::<TemplateDateMention>()?;
        registry.register_variant::<TemplateUserMention>()?;
        registry.register_variant::<LinkPreviewMention>()
    })
});

impl MasterType for Span {
    const NAME: &'static str = "Span";

    fn registry() -> &'static KeychainRegistry<Self> {
        &SPAN_REGISTRY
    }
}

impl Serializable for Span {
    fn serialize(&self) -> Result<Value, SerializationError> {
        match self {
            Span::Text(span) => span.serialize(),
            Span::Equation(span) => span.serialize(),
            Span::UserMention(span) => span.serialize(),
            Span::PageMention(span) => span.serialize(),
            Span::DatabaseMention(span) => span.serialize(),
            Span::DateMention(span) => span.serialize(),
            Span::TemplateDateMention(span) => span.serialize(),
            Span::TemplateUserMention(span) => span.serialize(),
            Span::LinkPreviewMention(span) => span.serialize(),
            Span::Unknown(span) => Ok(span.write()),
        }
    }
}

impl Deserializable for Span {
    /// Unmodeled span types are kept raw; malformed modeled ones are errors.
    fn deserialize(value: &Value) -> Result<Self, SerializationError> {
        let registry = Span::registry();
        if let Ok(keychain) = Keychain::from_shape(value, registry.key()) {
            if !registry.knows(&keychain) {
                log::debug!("keeping unmodeled span {} as raw JSON", keychain);
                return UnknownSpan::read(value, keychain).map(Span::Unknown);
            }
        }
        resolve(value)
    }
}
