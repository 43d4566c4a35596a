// src/core/mod.rs
//! The reusable core: JSON (de)serialization, keychain resolution, entities
//! and the request layer. Concrete Notion shapes live in [`crate::model`],
//! concrete endpoints in [`crate::api`].

mod client;
mod entity;
mod fields;
mod pagination;
mod request;
mod resolver;
mod retry;
mod serialization;
pub mod time;
mod transport;

pub use client::NotionClient;
pub use entity::{Coalesce, Entity, EntityKind, IdentityMap, Record, Snapshot};
pub use fields::{Fields, ObjectWriter};
pub use pagination::Paginator;
pub use request::{
    ApiVersion, Method, PaginatedRequestBuilder, Pinned, Request, RequestBuilder, ResponseData,
    SingleRequestBuilder,
};
pub use resolver::{resolve, Constructor, Keychain, KeychainRegistry, MasterType, Variant};
pub use retry::RetryPolicy;
pub use serialization::{
    deserialize, deserialize_literal, deserialize_union, json_type_name, serialize,
    Deserializable, Serializable,
};
pub use time::DateOrDateTime;
pub use transport::{HttpTransport, RawResponse, Transport, TransportError};
