// src/api/pages.rs
//! Page endpoints.
//!
//! Property values are written through the same serializers that read them,
//! so server-only fields such as option ids never reach a request body.

use crate::core::{Method, ObjectWriter, Record, RequestBuilder, SingleRequestBuilder};
use crate::error::SerializationError;
use crate::model::{PageKind, PageProperty, Parent};
use crate::types::NotionId;
use indexmap::IndexMap;
use serde_json::Value;

/// `GET pages/{id}`
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievePage {
    pub id: NotionId,
}

impl RetrievePage {
    pub fn new(id: NotionId) -> Self {
        Self { id }
    }
}

impl RequestBuilder for RetrievePage {
    fn method(&self) -> Method {
        Method::Get
    }

    fn path(&self) -> String {
        format!("pages/{}", self.id)
    }
}

impl SingleRequestBuilder for RetrievePage {
    type Output = Record<PageKind>;
}

/// `POST pages`
#[derive(Debug, Clone, PartialEq)]
pub struct CreatePage {
    pub parent: Parent,
    pub properties: IndexMap<String, PageProperty>,
    /// Block objects appended as the page body, sent verbatim.
    pub children: Vec<Value>,
}

impl CreatePage {
    pub fn new(parent: Parent) -> Self {
        Self {
            parent,
            properties: IndexMap::new(),
            children: Vec::new(),
        }
    }

    pub fn property(mut self, name: impl Into<String>, value: impl Into<PageProperty>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn child(mut self, block: Value) -> Self {
        self.children.push(block);
        self
    }
}

impl RequestBuilder for CreatePage {
    fn method(&self) -> Method {
        Method::Post
    }

    fn path(&self) -> String {
        "pages".to_string()
    }

    fn body(&self) -> Result<Option<Value>, SerializationError> {
        let mut writer = ObjectWriter::new()
            .field("parent", &self.parent)?
            .field("properties", &self.properties)?;
        if !self.children.is_empty() {
            writer = writer.field("children", &self.children)?;
        }
        Ok(Some(writer.finish()))
    }
}

impl SingleRequestBuilder for CreatePage {
    type Output = Record<PageKind>;
}

/// `PATCH pages/{id}`: only the listed properties change.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatePage {
    pub id: NotionId,
    pub properties: IndexMap<String, PageProperty>,
    pub archived: Option<bool>,
}

impl UpdatePage {
    pub fn new(id: NotionId) -> Self {
        Self {
            id,
            properties: IndexMap::new(),
            archived: None,
        }
    }

    pub fn property(mut self, name: impl Into<String>, value: impl Into<PageProperty>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn archived(mut self, archived: bool) -> Self {
        self.archived = Some(archived);
        self
    }
}

impl RequestBuilder for UpdatePage {
    fn method(&self) -> Method {
        Method::Patch
    }

    fn path(&self) -> String {
        format!("pages/{}", self.id)
    }

    fn body(&self) -> Result<Option<Value>, SerializationError> {
        let writer = ObjectWriter::new().optional("archived", &self.archived)?;
        let writer = if self.properties.is_empty() {
            writer
        } else {
            writer.field("properties", &self.properties)?
        };
        Ok(Some(writer.finish()))
    }
}

impl SingleRequestBuilder for UpdatePage {
    type Output = Record<PageKind>;
}
