// src/api/databases.rs
//! Database endpoints.
//!
//! [`QueryDatabase`] pages through the rows of a database; filters and sorts
//! are passed through as raw JSON.

use crate::core::{
    Method, ObjectWriter, PaginatedRequestBuilder, Record, RequestBuilder, SingleRequestBuilder,
};
use crate::error::SerializationError;
use crate::model::{DatabaseKind, PageKind};
use crate::types::NotionId;
use serde_json::Value;

/// `GET databases/{id}`
#[derive(Debug, Clone, PartialEq)]
pub struct RetrieveDatabase {
    pub id: NotionId,
}

impl RetrieveDatabase {
    pub fn new(id: NotionId) -> Self {
        Self { id }
    }
}

impl RequestBuilder for RetrieveDatabase {
    fn method(&self) -> Method {
        Method::Get
    }

    fn path(&self) -> String {
        format!("databases/{}", self.id)
    }
}

impl SingleRequestBuilder for RetrieveDatabase {
    type Output = Record<DatabaseKind>;
}

/// `POST databases/{id}/query`, yielding the matching pages.
///
/// `filter` and `sorts` use Notion's query syntax and are sent verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDatabase {
    pub id: NotionId,
    pub filter: Option<Value>,
    pub sorts: Vec<Value>,
}

impl QueryDatabase {
    pub fn new(id: NotionId) -> Self {
        Self {
            id,
            filter: None,
            sorts: Vec::new(),
        }
    }

    pub fn filter(mut self, filter: Value) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn sort(mut self, sort: Value) -> Self {
        self.sorts.push(sort);
        self
    }
}

impl RequestBuilder for QueryDatabase {
    fn method(&self) -> Method {
        Method::Post
    }

    fn path(&self) -> String {
        format!("databases/{}/query", self.id)
    }

    fn body(&self) -> Result<Option<Value>, SerializationError> {
        let mut writer = ObjectWriter::new().optional("filter", &self.filter)?;
        if !self.sorts.is_empty() {
            writer = writer.field("sorts", &self.sorts)?;
        }
        Ok(Some(writer.finish()))
    }
}

impl PaginatedRequestBuilder for QueryDatabase {
    type Element = Record<PageKind>;
}
