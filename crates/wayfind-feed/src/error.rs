use thiserror::Error;

use wayfind_core::CoreError;

/// Transport and write-path failures.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limited by feed (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid feed URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unexpected snapshot shape: {0}")]
    UnexpectedShape(String),

    #[error("invalid facility record: {0}")]
    InvalidRecord(#[from] CoreError),

    #[error("feed is closed")]
    Closed,
}

/// The request URL is dropped: its query string carries the feed's auth
/// token, and these errors end up in logs.
impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.without_url())
    }
}

/// A single malformed record. The record is dropped; the rest of the
/// snapshot is still delivered.
#[derive(Debug, Error, PartialEq)]
#[error("dropping facility record {facility_id}: {reason}")]
pub struct FeedNormalizationError {
    pub facility_id: String,
    pub reason: String,
}

impl FeedNormalizationError {
    pub(crate) fn new(facility_id: &str, reason: impl Into<String>) -> Self {
        Self {
            facility_id: facility_id.to_string(),
            reason: reason.into(),
        }
    }
}
