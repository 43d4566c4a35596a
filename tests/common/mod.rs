//! Scripted transport and payload builders shared by the integration tests.

#![allow(dead_code)]

use notion_df::core::{RawResponse, Request, RetryPolicy, Transport, TransportError};
use notion_df::{ApiKey, IdentityMap, NotionClient};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

pub const TOKEN: &str = "secret_abcdefghijklmnopqrstuvwxyz0123";

/// Replays canned replies in order and records every request it receives.
#[derive(Clone, Default)]
pub struct Script {
    replies: Arc<Mutex<VecDeque<Result<RawResponse, TransportError>>>>,
    routes: Arc<Mutex<HashMap<String, RawResponse>>>,
    requests: Arc<Mutex<Vec<Request>>>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, status: u16, body: Value) -> Self {
        self.replies
            .lock()
            .push_back(Ok(RawResponse::new(status, body.to_string())));
        self
    }

    /// Answers every request for `path` with the same reply, in any order.
    pub fn route(self, path: impl Into<String>, status: u16, body: Value) -> Self {
        self.routes
            .lock()
            .insert(path.into(), RawResponse::new(status, body.to_string()));
        self
    }

    /// A reply whose body is not necessarily JSON.
    pub fn reply_raw(self, status: u16, body: &str) -> Self {
        self.replies.lock().push_back(Ok(RawResponse::new(status, body)));
        self
    }

    pub fn fail(self, error: TransportError) -> Self {
        self.replies.lock().push_back(Err(error));
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().clone()
    }

    /// A client with its own identity map, talking to this script.
    pub fn client(&self) -> NotionClient {
        NotionClient::with_transport(ApiKey::new(TOKEN).unwrap(), self.clone())
            .with_retry(RetryPolicy::default())
            .with_identity_map(Arc::new(IdentityMap::new()))
    }
}

impl Transport for Script {
    fn send(&self, request: &Request) -> Result<RawResponse, TransportError> {
        self.requests.lock().push(request.clone());
        if let Some(routed) = self.routes.lock().get(&request.path) {
            return Ok(routed.clone());
        }
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted reply left for {}", request))
    }
}

/// Deterministic id for the n-th fixture object.
pub fn id(n: usize) -> String {
    let hex = format!("{:032x}", n + 1);
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

pub fn page(n: usize, title: &str) -> Value {
    json!({
        "object": "page",
        "id": id(n),
        "created_time": "2023-03-01T09:00:00.000Z",
        "last_edited_time": "2023-03-02T10:30:00.000Z",
        "archived": false,
        "url": format!("https://www.notion.so/{}", id(n).replace('-', "")),
        "parent": {"type": "workspace", "workspace": true},
        "properties": {
            "Name": {"id": "title", "type": "title", "title": [
                {"type": "text", "text": {"content": title, "link": null}, "plain_text": title}
            ]}
        }
    })
}

pub fn block(n: usize, text: &str) -> Value {
    json!({
        "object": "block",
        "id": id(n),
        "type": "paragraph",
        "has_children": false,
        "archived": false,
        "paragraph": {"rich_text": [
            {"type": "text", "text": {"content": text, "link": null}, "plain_text": text}
        ]}
    })
}

/// One list page with `results`, `has_more` and `next_cursor`.
pub fn list_page(results: Vec<Value>, next_cursor: Option<&str>) -> Value {
    json!({
        "object": "list",
        "results": results,
        "has_more": next_cursor.is_some(),
        "next_cursor": next_cursor,
    })
}

pub fn error_body(status: u16, code: &str, message: &str) -> Value {
    json!({"object": "error", "status": status, "code": code, "message": message})
}

pub fn user(n: usize, name: &str) -> Value {
    json!({
        "object": "user",
        "id": id(n),
        "type": "person",
        "name": name,
        "avatar_url": null,
        "person": {"email": format!("{}@example.com", name.to_lowercase())}
    })
}
