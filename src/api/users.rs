// src/api/users.rs
//! Workspace members and bots.

use crate::core::{Method, PaginatedRequestBuilder, Record, RequestBuilder, SingleRequestBuilder};
use crate::model::UserKind;
use crate::types::NotionId;

/// `GET users/{id}`
#[derive(Debug, Clone, PartialEq)]
pub struct RetrieveUser {
    pub id: NotionId,
}

impl RetrieveUser {
    pub fn new(id: NotionId) -> Self {
        Self { id }
    }
}

impl RequestBuilder for RetrieveUser {
    fn method(&self) -> Method {
        Method::Get
    }

    fn path(&self) -> String {
        format!("users/{}", self.id)
    }
}

impl SingleRequestBuilder for RetrieveUser {
    type Output = Record<UserKind>;
}

/// `GET users`: every member and bot of the workspace.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ListUsers;

impl RequestBuilder for ListUsers {
    fn method(&self) -> Method {
        Method::Get
    }

    fn path(&self) -> String {
        "users".to_string()
    }
}

impl PaginatedRequestBuilder for ListUsers {
    type Element = Record<UserKind>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_user_paths() {
        let id = NotionId::parse("6b1f0e2a9c3d4e5f8a7b6c5d4e3f2a1b").unwrap();
        assert_eq!(
            RetrieveUser::new(id).path(),
            "users/6b1f0e2a-9c3d-4e5f-8a7b-6c5d4e3f2a1b"
        );
        assert_eq!(ListUsers.path(), "users");
        assert_eq!(ListUsers.method(), Method::Get);
        assert!(ListUsers.query().is_empty());
    }
}
