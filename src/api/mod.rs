// src/api/mod.rs
//! Concrete Notion endpoints, one request type per call.
//!
//! Each type only describes its call; [`crate::core::NotionClient::execute`]
//! and [`crate::core::NotionClient::paginate`] run it.

mod blocks;
mod databases;
mod pages;
mod search;
mod users;

pub use blocks::{AppendBlockChildren, DeleteBlock, RetrieveBlock, RetrieveBlockChildren};
pub use databases::{QueryDatabase, RetrieveDatabase};
pub use pages::{CreatePage, RetrievePage, UpdatePage};
pub use search::{Search, SearchFilter};
pub use users::{ListUsers, RetrieveUser};
