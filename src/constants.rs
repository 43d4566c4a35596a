// src/constants.rs
//! Domain constants that define the operational boundaries of the client.

// ---------------------------------------------------------------------------
// Notion API boundaries
// ---------------------------------------------------------------------------

/// Root of every REST endpoint; the API version is selected by header.
pub const NOTION_API_BASE_URL: &str = "https://api.notion.com/v1";

/// Header carrying the pinned API version.
pub const NOTION_VERSION_HEADER: &str = "Notion-Version";

/// How many objects the Notion API returns per page of results at most.
pub const NOTION_API_PAGE_SIZE: usize = 100;

// ---------------------------------------------------------------------------
// Transport policy
// ---------------------------------------------------------------------------

/// Total attempts per HTTP call, including the first one.
pub const REQUEST_MAX_ATTEMPTS: u32 = 3;

/// Socket timeout for a single HTTP call.
pub const REQUEST_TIMEOUT_SECS: u64 = 80;

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

/// Offset applied to naive date-times, and the zone parsed date-times are
/// converted into, unless reconfigured at startup.
pub const DEFAULT_TIME_ZONE_OFFSET_SECS: i32 = 9 * 3600;

// ---------------------------------------------------------------------------
// Error display
// ---------------------------------------------------------------------------

/// Maximum characters shown when previewing response bodies and values.
pub const ERROR_BODY_PREVIEW_LENGTH: usize = 200;
