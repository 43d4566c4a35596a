// src/lib.rs
//! notion-df library: a typed core for automating a Notion workspace.
//!
//! # Public API
//!
//! The library exposes types organized by concern:
//! - **Error handling**: `AppError`, `SerializationError`, `RequestError`
//! - **Serialization**: `serialize`, `deserialize` and the keychain resolver
//! - **Entities**: `IdentityMap`, `Entity`, `Snapshot`
//! - **Requests**: `NotionClient`, the endpoint types in [`api`], `Paginator`
//! - **Domain model**: spans, parents, property values, entity attributes

pub mod api;
pub mod backup;
pub mod config;
pub mod constants;
pub mod core;
pub mod error;
pub mod model;
pub mod types;

// --- Error Handling ---
pub use crate::error::{
    AppError, NotionErrorCode, PathSegment, RegistryError, RequestError, SerializationError,
};
pub use crate::types::ValidationError;

// --- Core ---
pub use crate::core::{
    deserialize, serialize, ApiVersion, Deserializable, Entity, EntityKind, IdentityMap,
    NotionClient, Paginator, Record, RetryPolicy, Serializable, Snapshot,
};

// --- Domain Model ---
pub use crate::model::{
    AnyObject, BlockKind, DatabaseKind, PageKind, PageProperty, Parent, PropertyValue, Span,
    UserKind,
};

// --- Domain Types ---
pub use crate::types::{ApiKey, Color, NotionId};
