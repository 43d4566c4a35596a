use thiserror::Error;

mod colors;
mod domain_types;
mod ids;

pub use colors::*;
pub use domain_types::*;
pub use ids::*;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid Notion ID format: {0}")]
    InvalidId(String),

    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("Invalid API key format: {reason}")]
    InvalidApiKey { reason: String },

    #[error("Invalid API version: {0} (supported: 2022-02-22, 2022-06-28)")]
    InvalidApiVersion(String),

    #[error("Invalid time zone offset: {0} (expected +HH:MM or -HH:MM)")]
    InvalidTimeZone(String),
}
