//! Errors raised at the Numista API boundary.
//!
//! Every transport, status, and body problem is converted into a
//! [`CatalogError`] inside the fetch functions in [`crate::client`]; callers
//! decide whether that aborts the import or only degrades one item.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("network error: {0}")]
    Transport(String),

    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("response is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("image decode error: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for CatalogError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            CatalogError::Parse(e.to_string())
        } else {
            CatalogError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(e: serde_json::Error) -> Self {
        CatalogError::Parse(e.to_string())
    }
}
