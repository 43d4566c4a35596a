// src/core/request.rs
//! Declarative request values and the response decoding contract.
//!
//! Endpoints implement [`RequestBuilder`] (what to send) plus either
//! [`SingleRequestBuilder`] or [`PaginatedRequestBuilder`] (what comes back).
//! [`NotionClient`](super::NotionClient) turns them into [`Request`]s and
//! executes them.

use super::entity::{EntityKind, IdentityMap, Record, Snapshot};
use crate::constants::NOTION_API_BASE_URL;
use crate::error::SerializationError;
use crate::types::{ApiKey, ValidationError};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use url::Url;

/// A pinned Notion REST API version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ApiVersion {
    V2022_02_22,
    #[default]
    V2022_06_28,
}

impl ApiVersion {
    /// The `Notion-Version` header value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V2022_02_22 => "2022-02-22",
            Self::V2022_06_28 => "2022-06-28",
        }
    }

    pub fn base_url(&self) -> &'static str {
        NOTION_API_BASE_URL
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiVersion {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "2022-02-22" => Ok(Self::V2022_02_22),
            "2022-06-28" => Ok(Self::V2022_06_28),
            other => Err(ValidationError::InvalidApiVersion(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One fully described HTTP call.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub version: ApiVersion,
    /// Path below the versioned base URL, without a leading slash.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    token: ApiKey,
}

impl Request {
    pub fn new(method: Method, version: ApiVersion, path: impl Into<String>, token: ApiKey) -> Self {
        Self {
            method,
            version,
            path: path.into(),
            query: Vec::new(),
            body: None,
            token,
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn token(&self) -> &ApiKey {
        &self.token
    }

    pub fn url(&self) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&format!("{}/{}", self.version.base_url(), self.path))?;
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query.iter());
        }
        Ok(url)
    }

    /// Sets a top-level field of the JSON body, creating the body when absent.
    pub(crate) fn set_body_field(&mut self, key: &str, value: Value) {
        match &mut self.body {
            Some(Value::Object(map)) => {
                map.insert(key.to_string(), value);
            }
            _ => {
                let mut map = serde_json::Map::new();
                map.insert(key.to_string(), value);
                self.body = Some(Value::Object(map));
            }
        }
    }
}

impl fmt::Display for Request {
    /// Renders `GET pages/<id> (2022-06-28)`; the token never appears.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)?;
        if !self.query.is_empty() {
            let query: Vec<String> = self
                .query
                .iter()
                .map(|(key, value)| format!("{}={}", key, value))
                .collect();
            write!(f, "?{}", query.join("&"))?;
        }
        write!(f, " ({})", self.version)
    }
}

/// Declarative description of one endpoint call.
pub trait RequestBuilder {
    fn method(&self) -> Method;

    fn path(&self) -> String;

    fn version(&self) -> ApiVersion {
        ApiVersion::default()
    }

    fn query(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    fn body(&self) -> Result<Option<Value>, SerializationError> {
        Ok(None)
    }

    fn build(&self, token: &ApiKey) -> Result<Request, SerializationError> {
        let mut request = Request::new(self.method(), self.version(), self.path(), token.clone());
        request.query = self.query();
        request.body = self.body()?;
        Ok(request)
    }

    /// Pins this call to an explicit API version.
    fn pinned(self, version: ApiVersion) -> Pinned<Self>
    where
        Self: Sized,
    {
        Pinned {
            inner: self,
            version,
        }
    }
}

/// An endpoint answering with one object.
pub trait SingleRequestBuilder: RequestBuilder {
    type Output: ResponseData;
}

/// An endpoint answering with `{"results", "has_more", "next_cursor"}` pages.
pub trait PaginatedRequestBuilder: RequestBuilder {
    type Element: ResponseData + Clone;
}

/// A builder with its API version overridden.
#[derive(Debug, Clone)]
pub struct Pinned<B> {
    inner: B,
    version: ApiVersion,
}

impl<B: RequestBuilder> RequestBuilder for Pinned<B> {
    fn method(&self) -> Method {
        self.inner.method()
    }

    fn path(&self) -> String {
        self.inner.path()
    }

    fn version(&self) -> ApiVersion {
        self.version
    }

    fn query(&self) -> Vec<(String, String)> {
        self.inner.query()
    }

    fn body(&self) -> Result<Option<Value>, SerializationError> {
        self.inner.body()
    }
}

impl<B: SingleRequestBuilder> SingleRequestBuilder for Pinned<B> {
    type Output = B::Output;
}

impl<B: PaginatedRequestBuilder> PaginatedRequestBuilder for Pinned<B> {
    type Element = B::Element;
}

/// Decodes a response body, registering any entity snapshot it carries.
pub trait ResponseData: Sized {
    fn from_response(value: &Value, identities: &IdentityMap) -> Result<Self, SerializationError>;
}

impl ResponseData for Value {
    fn from_response(value: &Value, _: &IdentityMap) -> Result<Self, SerializationError> {
        Ok(value.clone())
    }
}

impl<K: EntityKind> ResponseData for Record<K> {
    /// Builds the snapshot and merges it into its entity as latest.
    fn from_response(value: &Value, identities: &IdentityMap) -> Result<Self, SerializationError> {
        Ok(identities.accept(Snapshot::<K>::from_json(value)?))
    }
}

impl<T: ResponseData> ResponseData for Vec<T> {
    /// Reads the `results` of a list object.
    fn from_response(value: &Value, identities: &IdentityMap) -> Result<Self, SerializationError> {
        let results = value
            .get("results")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                SerializationError::new("list response has no 'results' array").with_value(value)
            })?;
        results
            .iter()
            .enumerate()
            .map(|(index, item)| {
                T::from_response(item, identities).map_err(|e| e.at(index).at("results"))
            })
            .collect()
    }
}
