//! Where a page, database or block lives.

use crate::core::{
    resolve, Deserializable, Fields, Keychain, KeychainRegistry, MasterType, ObjectWriter,
    Serializable,
};
use crate::error::SerializationError;
use crate::types::NotionId;
use once_cell::sync::Lazy;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parent {
    Page(NotionId),
    Database(NotionId),
    Block(NotionId),
    Workspace,
}

impl Parent {
    /// Discriminator value on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Parent::Page(_) => "page_id",
            Parent::Database(_) => "database_id",
            Parent::Block(_) => "block_id",
            Parent::Workspace => "workspace",
        }
    }

    pub fn id(&self) -> Option<NotionId> {
        match self {
            Parent::Page(id) | Parent::Database(id) | Parent::Block(id) => Some(*id),
            Parent::Workspace => None,
        }
    }
}

fn parent_id(value: &Value, key: &str) -> Result<NotionId, SerializationError> {
    Fields::of(value, "Parent")?.required(key)
}

fn page_parent(value: &Value) -> Result<Parent, SerializationError> {
    parent_id(value, "page_id").map(Parent::Page)
}

fn database_parent(value: &Value) -> Result<Parent, SerializationError> {
    parent_id(value, "database_id").map(Parent::Database)
}

fn block_parent(value: &Value) -> Result<Parent, SerializationError> {
    parent_id(value, "block_id").map(Parent::Block)
}

fn workspace_parent(value: &Value) -> Result<Parent, SerializationError> {
    let workspace: bool = Fields::of(value, "Parent")?.or_default("workspace")?;
    if workspace {
        Ok(Parent::Workspace)
    } else {
        Err(SerializationError::new("workspace parent must set 'workspace' to true").at("workspace"))
    }
}

static PARENT_REGISTRY: Lazy<KeychainRegistry<Parent>> = Lazy::new(|| {
    KeychainRegistry::with_variants(Parent::NAME, "type", |registry| {
        registry.register(Keychain::new(["page_id"]), page_parent)?;
        registry.register(Keychain::new(["database_id"]), database_parent)?;
        registry.register(Keychain::new(["block_id"]), block_parent)?;
        registry.register(Keychain::new(["workspace"]), workspace_parent)
    })
});

impl MasterType for Parent {
    const NAME: &'static str = "Parent";

    fn registry() -> &'static KeychainRegistry<Self> {
        &PARENT_REGISTRY
    }
}

impl Serializable for Parent {
    fn serialize(&self) -> Result<Value, SerializationError> {
        let writer = ObjectWriter::new().field("type", self.kind())?;
        Ok(match self.id() {
            Some(id) => writer.field(self.kind(), &id)?,
            None => writer.field(self.kind(), &true)?,
        }
        .finish())
    }
}

impl Deserializable for Parent {
    fn deserialize(value: &Value) -> Result<Self, SerializationError> {
        resolve(value)
    }
}
