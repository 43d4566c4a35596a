use super::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use url::Url;
use uuid::Uuid;

/// Canonical identity of a Notion object.
///
/// Every accepted textual form (dashed UUID, undashed 32-hex string, or a
/// `notion.so` URL ending in the id) parses to the same value, so two
/// references to the same remote object always compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotionId(Uuid);

static URL_ID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:^|[/-])([a-fA-F0-9]{32}|[a-fA-F0-9]{8}-[a-fA-F0-9]{4}-[a-fA-F0-9]{4}-[a-fA-F0-9]{4}-[a-fA-F0-9]{12})$",
    )
    .expect("Notion id regex is valid")
});

impl NotionId {
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parses various Notion ID formats.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let cleaned = input.trim().trim_end_matches('/');
        if cleaned.is_empty() {
            return Err(ValidationError::InvalidId("empty id".to_string()));
        }

        // Dashed and undashed UUIDs
        if let Ok(uuid) = Uuid::try_parse(cleaned) {
            return Ok(Self(uuid));
        }

        if cleaned.starts_with("http://") || cleaned.starts_with("https://") {
            return Self::extract_from_url(cleaned);
        }

        Err(ValidationError::InvalidId(format!(
            "Could not parse Notion ID from: {}",
            input
        )))
    }

    /// Extracts the id from the last path segment of a Notion URL,
    /// e.g. `https://www.notion.so/workspace/Title-<id>?pvs=4`.
    fn extract_from_url(raw: &str) -> Result<Self, ValidationError> {
        let url = Url::parse(raw)
            .map_err(|e| ValidationError::InvalidId(format!("Invalid URL {}: {}", raw, e)))?;

        let segment = url
            .path_segments()
            .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
            .unwrap_or_default();

        URL_ID_REGEX
            .captures(segment)
            .and_then(|captures| captures.get(1))
            .and_then(|m| Uuid::try_parse(m.as_str()).ok())
            .map(Self)
            .ok_or_else(|| {
                ValidationError::InvalidId(format!("No valid ID found in URL: {}", raw))
            })
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Dashed form, as used in API paths and request bodies.
    pub fn to_dashed(&self) -> String {
        self.0.as_hyphenated().to_string()
    }

    /// Undashed form, as used for backup file names.
    pub fn to_undashed(&self) -> String {
        self.0.as_simple().to_string()
    }
}

impl fmt::Display for NotionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.as_hyphenated())
    }
}

impl FromStr for NotionId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Uuid> for NotionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}
