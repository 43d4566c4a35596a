// src/core/pagination.rs
//! Cursor-driven iteration over list endpoints.

use super::client::NotionClient;
use super::fields::Fields;
use super::request::{Method, PaginatedRequestBuilder, ResponseData};
use crate::constants::NOTION_API_PAGE_SIZE;
use crate::error::{AppError, SerializationError};
use serde_json::Value;

/// Forward-only sequence of the elements of a list endpoint.
///
/// Network pages are fetched one at a time as iteration reaches them. Every
/// yielded element stays buffered so [`get`](Self::get) can index backwards;
/// reissuing the request is the only way to restart.
pub struct Paginator<'c, B: PaginatedRequestBuilder> {
    client: &'c NotionClient,
    builder: B,
    remaining: Option<usize>,
    cursor: Option<String>,
    exhausted: bool,
    buffer: Vec<B::Element>,
    position: usize,
    calls: usize,
}

impl<'c, B: PaginatedRequestBuilder> Paginator<'c, B> {
    pub(crate) fn new(client: &'c NotionClient, builder: B, limit: Option<usize>) -> Self {
        Self {
            client,
            builder,
            remaining: limit,
            cursor: None,
            exhausted: limit == Some(0),
            buffer: Vec::new(),
            position: 0,
            calls: 0,
        }
    }

    /// Number of HTTP pages requested so far.
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Elements fetched so far, in server order.
    pub fn buffered(&self) -> &[B::Element] {
        &self.buffer
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Fetches every remaining page.
    pub fn materialize(&mut self) -> Result<&[B::Element], AppError> {
        while !self.exhausted {
            self.fetch_page()?;
        }
        Ok(&self.buffer)
    }

    /// Random access; negative indices count from the end.
    ///
    /// Any index not yet buffered, and any negative one, forces the whole
    /// sequence to be fetched.
    pub fn get(&mut self, index: isize) -> Result<B::Element, AppError> {
        if index < 0 || index as usize >= self.buffer.len() {
            self.materialize()?;
        }
        let len = self.buffer.len();
        let resolved = if index < 0 {
            len.checked_sub(index.unsigned_abs())
        } else {
            Some(index as usize).filter(|i| *i < len)
        };
        resolved
            .map(|i| self.buffer[i].clone())
            .ok_or(AppError::OutOfRange { index, len })
    }

    fn fetch_page(&mut self) -> Result<(), AppError> {
        let page_size = self
            .remaining
            .map_or(NOTION_API_PAGE_SIZE, |remaining| remaining.min(NOTION_API_PAGE_SIZE));

        let mut request = self.builder.build(self.client.token())?;
        match request.method {
            Method::Get | Method::Delete => {
                request.query.push(("page_size".into(), page_size.to_string()));
                if let Some(cursor) = &self.cursor {
                    request.query.push(("start_cursor".into(), cursor.clone()));
                }
            }
            Method::Post | Method::Patch => {
                request.set_body_field("page_size", Value::from(page_size));
                if let Some(cursor) = &self.cursor {
                    request.set_body_field("start_cursor", Value::from(cursor.clone()));
                }
            }
        }

        self.calls += 1;
        let body = match self.client.fetch_json(&request) {
            Ok(body) => body,
            Err(err) => {
                self.exhausted = true;
                return Err(err);
            }
        };
        if let Err(err) = self.decode_page(&body, page_size) {
            log::debug!("{}: undecodable page: {}", request, err);
            self.exhausted = true;
            return Err(err.into());
        }
        Ok(())
    }

    fn decode_page(&mut self, body: &Value, page_size: usize) -> Result<(), SerializationError> {
        let fields = Fields::of(body, "list response")?;
        let results: &Value = fields
            .raw("results")
            .ok_or_else(|| SerializationError::new("list response has no 'results'"))?;
        let results = results.as_array().ok_or_else(|| {
            SerializationError::new("'results' must be an array")
                .with_value(results)
                .at("results")
        })?;
        let has_more: bool = fields.or_default("has_more")?;
        let next_cursor: Option<String> = fields.optional("next_cursor")?;

        let client = self.client;
        let identities = client.identity_map();
        let take = results.len().min(page_size);
        let page = results
            .iter()
            .take(take)
            .enumerate()
            .map(|(index, item)| {
                B::Element::from_response(item, identities).map_err(|e| e.at(index).at("results"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.buffer.extend(page);

        if let Some(remaining) = self.remaining.as_mut() {
            *remaining = remaining.saturating_sub(take);
        }
        self.cursor = next_cursor;
        self.exhausted =
            !has_more || self.cursor.is_none() || self.remaining == Some(0) || results.is_empty();
        Ok(())
    }
}

impl<B: PaginatedRequestBuilder> Iterator for Paginator<'_, B> {
    type Item = Result<B::Element, AppError>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.position >= self.buffer.len() {
            if self.exhausted {
                return None;
            }
            if let Err(err) = self.fetch_page() {
                return Some(Err(err));
            }
        }
        let element = self.buffer[self.position].clone();
        self.position += 1;
        Some(Ok(element))
    }
}
