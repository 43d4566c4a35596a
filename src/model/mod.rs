//! Concrete Notion shapes: the four entity kinds and the values they carry.

pub mod common;
pub mod parent;
pub mod property;
pub mod rich_text;

pub use common::{Annotations, DateRange, RelationRef, SelectOption, UserType};
pub use parent::Parent;
pub use property::{PageProperty, PropertyValue};
pub use rich_text::{plain_text, Span, SpanCommon, UnknownSpan};

use crate::api::{RetrieveBlock, RetrieveDatabase, RetrievePage, RetrieveUser};
use crate::core::{
    resolve, Coalesce, Deserializable, EntityKind, Fields, IdentityMap, Keychain,
    KeychainRegistry, MasterType, NotionClient, Record, ResponseData, Serializable, Snapshot,
};
use crate::error::{AppError, SerializationError};
use crate::types::NotionId;
use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::sync::Arc;

/// Fills every unset field from the preview; all listed fields are `Option`s.
macro_rules! coalesce_fields {
    ($attrs:ty { $($field:ident),* $(,)? }) => {
        impl Coalesce for $attrs {
            fn coalesce_from(&mut self, preview: &Self) {
                $(
                    if self.$field.is_none() {
                        self.$field = preview.$field.clone();
                    }
                )*
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageKind;

/// Attributes of a page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageAttrs {
    pub parent: Option<Parent>,
    pub properties: Option<IndexMap<String, PageProperty>>,
    pub archived: Option<bool>,
    pub url: Option<String>,
    pub created_time: Option<DateTime<FixedOffset>>,
    pub last_edited_time: Option<DateTime<FixedOffset>>,
}

impl PageAttrs {
    /// Plain text of the page's title property, if the page has one.
    pub fn title(&self) -> Option<String> {
        self.properties.as_ref()?.values().find_map(|property| match property {
            PageProperty::Known(PropertyValue::Title(title)) => Some(plain_text(&title.value)),
            _ => None,
        })
    }

    pub fn property(&self, name: &str) -> Option<&PageProperty> {
        self.properties.as_ref()?.get(name)
    }
}

impl Deserializable for PageAttrs {
    fn deserialize(value: &Value) -> Result<Self, SerializationError> {
        let fields = Fields::of(value, "page")?;
        Ok(Self {
            parent: fields.optional("parent")?,
            properties: fields.optional("properties")?,
            archived: fields.optional("archived")?,
            url: fields.optional("url")?,
            created_time: fields.optional("created_time")?,
            last_edited_time: fields.optional("last_edited_time")?,
        })
    }
}

coalesce_fields!(PageAttrs {
    parent,
    properties,
    archived,
    url,
    created_time,
    last_edited_time,
});

impl EntityKind for PageKind {
    const OBJECT: &'static str = "page";
    type Attrs = PageAttrs;

    fn retrieve(client: &NotionClient, id: NotionId) -> Result<Arc<Snapshot<Self>>, AppError> {
        client.execute(&RetrievePage::new(id)).map(Record::into_snapshot)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseKind;

/// Attributes of a database. The property schema is kept as raw JSON.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatabaseAttrs {
    pub parent: Option<Parent>,
    pub title: Option<Vec<Span>>,
    pub description: Option<Vec<Span>>,
    pub properties: Option<IndexMap<String, Value>>,
    pub archived: Option<bool>,
    pub is_inline: Option<bool>,
    pub url: Option<String>,
    pub created_time: Option<DateTime<FixedOffset>>,
    pub last_edited_time: Option<DateTime<FixedOffset>>,
}

impl DatabaseAttrs {
    pub fn title_text(&self) -> Option<String> {
        self.title.as_deref().map(plain_text)
    }
}

impl Deserializable for DatabaseAttrs {
    fn deserialize(value: &Value) -> Result<Self, SerializationError> {
        let fields = Fields::of(value, "database")?;
        Ok(Self {
            parent: fields.optional("parent")?,
            title: fields.optional("title")?,
            description: fields.optional("description")?,
            properties: fields.optional("properties")?,
            archived: fields.optional("archived")?,
            is_inline: fields.optional("is_inline")?,
            url: fields.optional("url")?,
            created_time: fields.optional("created_time")?,
            last_edited_time: fields.optional("last_edited_time")?,
        })
    }
}

coalesce_fields!(DatabaseAttrs {
    parent,
    title,
    description,
    properties,
    archived,
    is_inline,
    url,
    created_time,
    last_edited_time,
});

impl EntityKind for DatabaseKind {
    const OBJECT: &'static str = "database";
    type Attrs = DatabaseAttrs;

    fn retrieve(client: &NotionClient, id: NotionId) -> Result<Arc<Snapshot<Self>>, AppError> {
        client.execute(&RetrieveDatabase::new(id)).map(Record::into_snapshot)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockKind;

/// Attributes of a block; the type-specific payload is kept as raw JSON.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockAttrs {
    pub parent: Option<Parent>,
    pub block_type: Option<String>,
    pub has_children: Option<bool>,
    pub archived: Option<bool>,
    pub content: Option<Value>,
    pub created_time: Option<DateTime<FixedOffset>>,
    pub last_edited_time: Option<DateTime<FixedOffset>>,
}

impl BlockAttrs {
    /// Plain text of the block's `rich_text`, for text-bearing block types.
    pub fn text(&self) -> Option<String> {
        let spans: Vec<Span> = self
            .content
            .as_ref()?
            .get("rich_text")
            .and_then(|rich_text| Vec::<Span>::deserialize(rich_text).ok())?;
        Some(plain_text(&spans))
    }
}

impl Deserializable for BlockAttrs {
    fn deserialize(value: &Value) -> Result<Self, SerializationError> {
        let fields = Fields::of(value, "block")?;
        let block_type: Option<String> = fields.optional("type")?;
        let content = block_type
            .as_deref()
            .and_then(|kind| fields.raw(kind))
            .cloned();
        Ok(Self {
            parent: fields.optional("parent")?,
            block_type,
            has_children: fields.optional("has_children")?,
            archived: fields.optional("archived")?,
            content,
            created_time: fields.optional("created_time")?,
            last_edited_time: fields.optional("last_edited_time")?,
        })
    }
}

coalesce_fields!(BlockAttrs {
    parent,
    block_type,
    has_children,
    archived,
    content,
    created_time,
    last_edited_time,
});

impl EntityKind for BlockKind {
    const OBJECT: &'static str = "block";
    type Attrs = BlockAttrs;

    fn retrieve(client: &NotionClient, id: NotionId) -> Result<Arc<Snapshot<Self>>, AppError> {
        client.execute(&RetrieveBlock::new(id)).map(Record::into_snapshot)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserKind;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserAttrs {
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub user_type: Option<UserType>,
    pub email: Option<String>,
}

impl Deserializable for UserAttrs {
    fn deserialize(value: &Value) -> Result<Self, SerializationError> {
        let fields = Fields::of(value, "user")?;
        let email = match fields.raw("person") {
            Some(person @ Value::Object(_)) => Fields::of(person, "person")?
                .optional("email")
                .map_err(|e| e.at("person"))?,
            _ => None,
        };
        Ok(Self {
            name: fields.optional("name")?,
            avatar_url: fields.optional("avatar_url")?,
            user_type: fields.optional("type")?,
            email,
        })
    }
}

coalesce_fields!(UserAttrs {
    name,
    avatar_url,
    user_type,
    email,
});

impl EntityKind for UserKind {
    const OBJECT: &'static str = "user";
    type Attrs = UserAttrs;

    fn retrieve(client: &NotionClient, id: NotionId) -> Result<Arc<Snapshot<Self>>, AppError> {
        client.execute(&RetrieveUser::new(id)).map(Record::into_snapshot)
    }
}

/// A record of any kind, as returned by mixed listings such as search.
#[derive(Debug, Clone)]
pub enum AnyObject {
    Page(Record<PageKind>),
    Database(Record<DatabaseKind>),
    Block(Record<BlockKind>),
    User(Record<UserKind>),
}

impl AnyObject {
    pub fn id(&self) -> NotionId {
        match self {
            AnyObject::Page(snapshot) => snapshot.id(),
            AnyObject::Database(snapshot) => snapshot.id(),
            AnyObject::Block(snapshot) => snapshot.id(),
            AnyObject::User(snapshot) => snapshot.id(),
        }
    }

    pub fn object(&self) -> &'static str {
        match self {
            AnyObject::Page(_) => PageKind::OBJECT,
            AnyObject::Database(_) => DatabaseKind::OBJECT,
            AnyObject::Block(_) => BlockKind::OBJECT,
            AnyObject::User(_) => UserKind::OBJECT,
        }
    }

    pub fn raw(&self) -> &Value {
        match self {
            AnyObject::Page(snapshot) => snapshot.raw(),
            AnyObject::Database(snapshot) => snapshot.raw(),
            AnyObject::Block(snapshot) => snapshot.raw(),
            AnyObject::User(snapshot) => snapshot.raw(),
        }
    }

    /// Display title for pages and databases.
    pub fn title(&self) -> Option<String> {
        match self {
            AnyObject::Page(snapshot) => snapshot.attrs().title(),
            AnyObject::Database(snapshot) => snapshot.attrs().title_text(),
            AnyObject::Block(snapshot) => snapshot.attrs().text(),
            AnyObject::User(snapshot) => snapshot.attrs().name.clone(),
        }
    }

    /// Merges the snapshot into its entity and returns the winning one.
    fn register(self, identities: &IdentityMap) -> Self {
        match self {
            AnyObject::Page(r) => AnyObject::Page(r.register(identities)),
            AnyObject::Database(r) => AnyObject::Database(r.register(identities)),
            AnyObject::Block(r) => AnyObject::Block(r.register(identities)),
            AnyObject::User(r) => AnyObject::User(r.register(identities)),
        }
    }
}

fn any_page(value: &Value) -> Result<AnyObject, SerializationError> {
    Snapshot::from_json(value).map(|s| AnyObject::Page(Record::detached(s)))
}

fn any_database(value: &Value) -> Result<AnyObject, SerializationError> {
    Snapshot::from_json(value).map(|s| AnyObject::Database(Record::detached(s)))
}

fn any_block(value: &Value) -> Result<AnyObject, SerializationError> {
    Snapshot::from_json(value).map(|s| AnyObject::Block(Record::detached(s)))
}

fn any_user(value: &Value) -> Result<AnyObject, SerializationError> {
    Snapshot::from_json(value).map(|s| AnyObject::User(Record::detached(s)))
}

static OBJECT_REGISTRY: Lazy<KeychainRegistry<AnyObject>> = Lazy::new(|| {
    KeychainRegistry::with_variants(AnyObject::NAME, "object", |registry| {
        registry.register(Keychain::new([PageKind::OBJECT]), any_page)?;
        registry.register(Keychain::new([DatabaseKind::OBJECT]), any_database)?;
        registry.register(Keychain::new([BlockKind::OBJECT]), any_block)?;
        registry.register(Keychain::new([UserKind::OBJECT]), any_user)
    })
});

impl MasterType for AnyObject {
    const NAME: &'static str = "AnyObject";

    fn registry() -> &'static KeychainRegistry<Self> {
        &OBJECT_REGISTRY
    }
}

impl Serializable for AnyObject {
    /// The payload the snapshot was built from.
    fn serialize(&self) -> Result<Value, SerializationError> {
        Ok(self.raw().clone())
    }
}

impl Deserializable for AnyObject {
    fn deserialize(value: &Value) -> Result<Self, SerializationError> {
        resolve(value)
    }
}

impl ResponseData for AnyObject {
    fn from_response(value: &Value, identities: &IdentityMap) -> Result<Self, SerializationError> {
        Ok(AnyObject::deserialize(value)?.register(identities))
    }
}
