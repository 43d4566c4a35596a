// src/error.rs
//! Error types with structured diagnostic context.
//!
//! Three failure families exist in the core:
//! shape errors ([`SerializationError`]), transport/server errors that
//! survived the retry budget ([`RequestError`]) and registry errors
//! ([`RegistryError`]). [`AppError`] is the umbrella the rest of the crate
//! returns.

use crate::constants::ERROR_BODY_PREVIEW_LENGTH;
use crate::core::Request;
use indexmap::IndexMap;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// Notion API error codes as a typed vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotionErrorCode {
    /// API rate limit exceeded
    RateLimited,
    /// The requested object does not exist or is inaccessible
    ObjectNotFound,
    /// API key is invalid or expired
    Unauthorized,
    /// API key lacks permission for this resource
    RestrictedResource,
    /// Request body contains invalid JSON
    InvalidJson,
    /// Request parameters failed Notion's validation
    ValidationFailed,
    /// Conflict with current state of the resource
    Conflict,
    /// Notion internal server error
    InternalError,
    /// Notion is temporarily unavailable
    ServiceUnavailable,
    /// The request never produced an HTTP response (timeout, broken stream)
    TransportFailure,
    /// HTTP status code fallback when the error body is unparseable
    HttpStatus(u16),
    /// An error code this client doesn't recognize yet
    Unknown(String),
}

impl NotionErrorCode {
    /// Parse a Notion API error code string into the typed vocabulary.
    pub fn from_api_response(code: &str) -> Self {
        match code {
            "rate_limited" => Self::RateLimited,
            "object_not_found" => Self::ObjectNotFound,
            "unauthorized" => Self::Unauthorized,
            "restricted_resource" => Self::RestrictedResource,
            "invalid_json" => Self::InvalidJson,
            "validation_error" => Self::ValidationFailed,
            "conflict_error" => Self::Conflict,
            "internal_server_error" => Self::InternalError,
            "service_unavailable" => Self::ServiceUnavailable,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Create from an HTTP status code when the error body is unparseable.
    pub fn from_http_status(status: u16) -> Self {
        Self::HttpStatus(status)
    }

    /// Whether this error means the resource simply doesn't exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ObjectNotFound | Self::HttpStatus(404))
    }
}

impl fmt::Display for NotionErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited => write!(f, "rate_limited"),
            Self::ObjectNotFound => write!(f, "object_not_found"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::RestrictedResource => write!(f, "restricted_resource"),
            Self::InvalidJson => write!(f, "invalid_json"),
            Self::ValidationFailed => write!(f, "validation_error"),
            Self::Conflict => write!(f, "conflict_error"),
            Self::InternalError => write!(f, "internal_server_error"),
            Self::ServiceUnavailable => write!(f, "service_unavailable"),
            Self::TransportFailure => write!(f, "transport_failure"),
            Self::HttpStatus(code) => write!(f, "http_{}", code),
            Self::Unknown(code) => write!(f, "{}", code),
        }
    }
}

/// One step of the path from a document root to the offending value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// A JSON value did not match the shape its target type declares.
///
/// The path is accumulated while the error unwinds out of nested
/// collections, so it is stored innermost-first; [`path`](Self::path)
/// returns it root-first for display.
#[derive(Debug, Clone, PartialEq)]
pub struct SerializationError {
    description: String,
    vars: IndexMap<String, String>,
    inverted_path: Vec<PathSegment>,
    causes: Vec<(String, SerializationError)>,
}

impl SerializationError {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            vars: IndexMap::new(),
            inverted_path: Vec::new(),
            causes: Vec::new(),
        }
    }

    /// Attaches a named diagnostic variable, rendered with `Debug`.
    pub fn with_var(mut self, name: &str, value: impl fmt::Debug) -> Self {
        self.vars.insert(name.to_string(), format!("{:?}", value));
        self
    }

    /// Attaches the offending JSON value, truncated for readability.
    pub fn with_value(mut self, value: &serde_json::Value) -> Self {
        self.vars.insert("value".to_string(), preview(&value.to_string()));
        self
    }

    /// Nests the failure of one alternative (union members, fallbacks).
    pub fn with_cause(mut self, label: impl Into<String>, cause: SerializationError) -> Self {
        self.causes.push((label.into(), cause));
        self
    }

    /// Records that this error happened below `segment` of the enclosing value.
    pub fn at(mut self, segment: impl Into<PathSegment>) -> Self {
        self.inverted_path.push(segment.into());
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn vars(&self) -> &IndexMap<String, String> {
        &self.vars
    }

    pub fn causes(&self) -> &[(String, SerializationError)] {
        &self.causes
    }

    pub fn inverted_path(&self) -> &[PathSegment] {
        &self.inverted_path
    }

    /// Root-first path to the offending element.
    pub fn path(&self) -> Vec<PathSegment> {
        self.inverted_path.iter().rev().cloned().collect()
    }

    /// Renders the path as `items[1].name`.
    pub fn path_string(&self) -> String {
        let mut rendered = String::new();
        for segment in self.inverted_path.iter().rev() {
            match segment {
                PathSegment::Key(key) if rendered.is_empty() => rendered.push_str(key),
                PathSegment::Key(key) => {
                    rendered.push('.');
                    rendered.push_str(key);
                }
                PathSegment::Index(index) => rendered.push_str(&format!("[{}]", index)),
            }
        }
        rendered
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        write!(f, "{}", self.description)?;
        if !self.inverted_path.is_empty() {
            write!(f, " (at {})", self.path_string())?;
        }
        if !self.vars.is_empty() {
            let vars: Vec<String> = self
                .vars
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect();
            write!(f, " [{}]", vars.join(", "))?;
        }
        for (label, cause) in &self.causes {
            write!(f, "\n{}- {}: ", "  ".repeat(depth + 1), label)?;
            cause.fmt_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for SerializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}

impl std::error::Error for SerializationError {}

/// A master type's keychain table was set up inconsistently.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("{master}: keychain {keychain} is already registered")]
    DuplicateKeychain { master: String, keychain: String },

    #[error("{master}: cannot register an empty keychain")]
    EmptyKeychain { master: String },
}

/// Error body shape returned by the Notion API.
#[derive(Debug, Deserialize)]
struct NotionErrorBody {
    object: String,
    code: String,
    message: String,
}

/// The final attempt of an HTTP call failed.
#[derive(Error, Debug)]
#[error("{request} failed ({code}): {message}")]
pub struct RequestError {
    pub status: Option<u16>,
    pub code: NotionErrorCode,
    pub message: String,
    /// Raw response body, empty when no response arrived.
    pub body: String,
    pub request: Request,
}

impl RequestError {
    /// Builds the error from a non-success HTTP response.
    ///
    /// `code` and `message` come from the Notion error body when it parses,
    /// otherwise the status code and the raw body text are used.
    pub fn from_response(request: &Request, status: u16, body: &str) -> Self {
        let (code, message) = match serde_json::from_str::<NotionErrorBody>(body) {
            Ok(parsed) if parsed.object == "error" => (
                NotionErrorCode::from_api_response(&parsed.code),
                parsed.message,
            ),
            _ => (NotionErrorCode::from_http_status(status), preview(body)),
        };
        Self {
            status: Some(status),
            code,
            message,
            body: body.to_string(),
            request: request.clone(),
        }
    }

    /// Builds the error for a call that never produced a response.
    pub fn from_transport(request: &Request, message: impl Into<String>) -> Self {
        Self {
            status: None,
            code: NotionErrorCode::TransportFailure,
            message: message.into(),
            body: String::new(),
            request: request.clone(),
        }
    }
}

/// Main application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    #[error(transparent)]
    Validation(#[from] crate::types::ValidationError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("Malformed response from {request}: {reason}")]
    MalformedResponse { request: String, reason: String },

    #[error("Index {index} out of range for {len} elements")]
    OutOfRange { index: isize, len: usize },

    #[error("Filesystem IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error for {path}: {source}")]
    JsonParseError {
        path: std::path::PathBuf,
        source: serde_json::Error,
    },

    #[error("Network failure: {0}")]
    NetworkFailure(#[from] reqwest::Error),

}

impl AppError {
    /// Whether the remote object does not exist (or is not shared with the integration).
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::Request(err) if err.code.is_not_found())
    }
}

/// Truncates long bodies for error messages.
fn preview(text: &str) -> String {
    if text.chars().count() > ERROR_BODY_PREVIEW_LENGTH {
        let head: String = text.chars().take(ERROR_BODY_PREVIEW_LENGTH).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

/// Result type alias for convenience
pub type Result<T, E = AppError> = std::result::Result<T, E>;
