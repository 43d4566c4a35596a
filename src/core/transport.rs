// src/core/transport.rs
//! The HTTP seam between requests and the network.
//!
//! [`Transport`] sends one [`Request`] and reports either the raw response or
//! why no response arrived. [`HttpTransport`] is the blocking `reqwest`
//! implementation; tests substitute scripted transports.

use super::request::{Method, Request};
use crate::constants::{NOTION_VERSION_HEADER, REQUEST_TIMEOUT_SECS};
use crate::error::AppError;
use reqwest::blocking::Client;
use reqwest::header;
use std::time::Duration;
use thiserror::Error;

/// Status and body of an HTTP response, success or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A call that produced no usable HTTP response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("response body was interrupted: {0}")]
    BodyInterrupted(String),

    #[error("connection failed: {0}")]
    Connection(String),
}

pub trait Transport: Send + Sync {
    fn send(&self, request: &Request) -> Result<RawResponse, TransportError>;
}

/// Blocking HTTPS transport against the Notion API.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(Self::create_headers())
            .build()?;
        Ok(Self { client })
    }

    fn create_headers() -> header::HeaderMap {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        headers
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &Request) -> Result<RawResponse, TransportError> {
        let url = request
            .url()
            .map_err(|e| TransportError::Connection(format!("invalid url: {}", e)))?;

        let builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
            Method::Patch => self.client.patch(url),
            Method::Delete => self.client.delete(url),
        };
        let builder = builder
            .bearer_auth(request.token().as_str())
            .header(NOTION_VERSION_HEADER, request.version.as_str());
        let builder = match &request.body {
            Some(body) => builder.json(body),
            None => builder,
        };

        log::debug!("{}", request);
        let response = builder.send().map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Connection(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response.text().map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::BodyInterrupted(e.to_string())
            }
        })?;
        log::debug!("{} -> {} ({} bytes)", request, status, body.len());

        Ok(RawResponse { status, body })
    }
}
