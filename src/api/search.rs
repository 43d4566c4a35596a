// src/api/search.rs
//! Title search across pages and databases.

use crate::core::{Method, ObjectWriter, PaginatedRequestBuilder, RequestBuilder};
use crate::error::SerializationError;
use crate::model::AnyObject;
use serde_json::{json, Value};

/// Restricts a search to one object type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchFilter {
    Page,
    Database,
}

impl SearchFilter {
    fn as_str(&self) -> &'static str {
        match self {
            SearchFilter::Page => "page",
            SearchFilter::Database => "database",
        }
    }
}

/// `POST search` over page and database titles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Search {
    pub query: Option<String>,
    pub filter: Option<SearchFilter>,
}

impl Search {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            filter: None,
        }
    }

    pub fn only(mut self, filter: SearchFilter) -> Self {
        self.filter = Some(filter);
        self
    }
}

impl RequestBuilder for Search {
    fn method(&self) -> Method {
        Method::Post
    }

    fn path(&self) -> String {
        "search".to_string()
    }

    fn body(&self) -> Result<Option<Value>, SerializationError> {
        let mut writer = ObjectWriter::new().optional("query", &self.query)?;
        if let Some(filter) = self.filter {
            writer = writer.raw(
                "filter",
                json!({"property": "object", "value": filter.as_str()}),
            );
        }
        Ok(Some(writer.finish()))
    }
}

impl PaginatedRequestBuilder for Search {
    type Element = AnyObject;
}
