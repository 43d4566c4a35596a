// src/core/client.rs
//! Executes request builders against a transport.

use super::entity::{Entity, EntityKind, IdentityMap, Snapshot};
use super::pagination::Paginator;
use super::request::{PaginatedRequestBuilder, Request, ResponseData, SingleRequestBuilder};
use super::retry::RetryPolicy;
use super::transport::{HttpTransport, RawResponse, Transport};
use crate::error::AppError;
use crate::types::{ApiKey, ValidationError};
use rayon::prelude::*;
use serde_json::Value;
use std::sync::Arc;

/// Authenticated client shared by every endpoint call.
///
/// Decoded snapshots are merged into the client's [`IdentityMap`], the
/// process-wide one unless another is supplied.
pub struct NotionClient {
    token: ApiKey,
    transport: Box<dyn Transport>,
    retry: RetryPolicy,
    identities: Arc<IdentityMap>,
}

impl NotionClient {
    /// A client talking HTTPS to the Notion API.
    pub fn new(token: ApiKey) -> Result<Self, AppError> {
        Ok(Self::with_transport(token, HttpTransport::new()?))
    }

    pub fn with_transport(token: ApiKey, transport: impl Transport + 'static) -> Self {
        Self {
            token,
            transport: Box::new(transport),
            retry: RetryPolicy::default(),
            identities: IdentityMap::global(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_identity_map(mut self, identities: Arc<IdentityMap>) -> Self {
        self.identities = identities;
        self
    }

    pub fn identity_map(&self) -> &IdentityMap {
        &self.identities
    }

    pub fn get_or_create<K: EntityKind>(
        &self,
        id_or_url: &str,
    ) -> Result<Arc<Entity<K>>, ValidationError> {
        self.identities.get_or_create(id_or_url)
    }

    /// Executes a single-object endpoint and decodes its body.
    pub fn execute<B: SingleRequestBuilder>(&self, builder: &B) -> Result<B::Output, AppError> {
        let request = builder.build(&self.token)?;
        let body = self.fetch_json(&request)?;
        Ok(B::Output::from_response(&body, &self.identities)?)
    }

    /// Lazily walks a list endpoint, fetching at most `limit` elements.
    pub fn paginate<B: PaginatedRequestBuilder>(
        &self,
        builder: B,
        limit: Option<usize>,
    ) -> Paginator<'_, B> {
        Paginator::new(self, builder, limit)
    }

    /// Refetches `entities` on the rayon pool, returning results in input order.
    pub fn refresh_all<K: EntityKind>(
        &self,
        entities: &[Arc<Entity<K>>],
    ) -> Vec<Result<Arc<Snapshot<K>>, AppError>> {
        entities
            .par_iter()
            .map(|entity| entity.refresh(self))
            .collect()
    }

    /// Sends one request with retry.
    pub fn send(&self, request: &Request) -> Result<RawResponse, AppError> {
        Ok(self.retry.run(self.transport.as_ref(), request)?)
    }

    /// Sends one request and parses its body as JSON.
    pub(crate) fn fetch_json(&self, request: &Request) -> Result<Value, AppError> {
        let response = self.send(request)?;
        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&response.body).map_err(|e| AppError::MalformedResponse {
            request: request.to_string(),
            reason: e.to_string(),
        })
    }

    pub(crate) fn token(&self) -> &ApiKey {
        &self.token
    }
}

impl std::fmt::Debug for NotionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionClient")
            .field("token", &self.token)
            .field("retry", &self.retry)
            .field("identities", &self.identities)
            .finish()
    }
}
