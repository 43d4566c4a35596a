// src/api/blocks.rs
//! Block endpoints: retrieve, list children, append children, delete.

use crate::core::{
    Method, ObjectWriter, PaginatedRequestBuilder, Record, RequestBuilder, SingleRequestBuilder,
};
use crate::error::SerializationError;
use crate::model::BlockKind;
use crate::types::NotionId;
use serde_json::Value;

/// `GET blocks/{id}`
#[derive(Debug, Clone, PartialEq)]
pub struct RetrieveBlock {
    pub id: NotionId,
}

impl RetrieveBlock {
    pub fn new(id: NotionId) -> Self {
        Self { id }
    }
}

impl RequestBuilder for RetrieveBlock {
    fn method(&self) -> Method {
        Method::Get
    }

    fn path(&self) -> String {
        format!("blocks/{}", self.id)
    }
}

impl SingleRequestBuilder for RetrieveBlock {
    type Output = Record<BlockKind>;
}

/// `GET blocks/{id}/children`; also lists the body of a page.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrieveBlockChildren {
    pub id: NotionId,
}

impl RetrieveBlockChildren {
    pub fn new(id: NotionId) -> Self {
        Self { id }
    }
}

impl RequestBuilder for RetrieveBlockChildren {
    fn method(&self) -> Method {
        Method::Get
    }

    fn path(&self) -> String {
        format!("blocks/{}/children", self.id)
    }
}

impl PaginatedRequestBuilder for RetrieveBlockChildren {
    type Element = Record<BlockKind>;
}

/// `PATCH blocks/{id}/children`, answering with the parent's first children.
#[derive(Debug, Clone, PartialEq)]
pub struct AppendBlockChildren {
    pub id: NotionId,
    pub children: Vec<Value>,
}

impl AppendBlockChildren {
    pub fn new(id: NotionId, children: Vec<Value>) -> Self {
        Self { id, children }
    }
}

impl RequestBuilder for AppendBlockChildren {
    fn method(&self) -> Method {
        Method::Patch
    }

    fn path(&self) -> String {
        format!("blocks/{}/children", self.id)
    }

    fn body(&self) -> Result<Option<Value>, SerializationError> {
        Ok(Some(
            ObjectWriter::new()
                .field("children", &self.children)?
                .finish(),
        ))
    }
}

impl SingleRequestBuilder for AppendBlockChildren {
    type Output = Vec<Record<BlockKind>>;
}

/// `DELETE blocks/{id}`; the answer is the archived block.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteBlock {
    pub id: NotionId,
}

impl DeleteBlock {
    pub fn new(id: NotionId) -> Self {
        Self { id }
    }
}

impl RequestBuilder for DeleteBlock {
    fn method(&self) -> Method {
        Method::Delete
    }

    fn path(&self) -> String {
        format!("blocks/{}", self.id)
    }
}

impl SingleRequestBuilder for DeleteBlock {
    type Output = Record<BlockKind>;
}
