//! Realtime-database REST transport.
//!
//! Reads `GET {base}/{collection}.json` on a fixed interval and writes with
//! `POST {base}/{collection}.json`. Any query string on the base URL (for
//! example an `auth=` token) is carried over to every request.

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::time::{interval, Interval, MissedTickBehavior};
use wayfind_core::{AppConfig, FacilityId};

use crate::error::FeedError;
use crate::record::RawSnapshot;
use crate::repository::FacilityFeed;
use crate::retry::retry_with_backoff;
use crate::writer::{FacilityWriter, NewFacility};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpFeedConfig {
    pub base_url: String,
    pub collection: String,
    pub poll_interval: Duration,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Extra attempts after the first failure for transient errors.
    pub max_retries: u32,
    pub backoff_base_secs: u64,
}

impl HttpFeedConfig {
    /// # Errors
    ///
    /// Returns [`FeedError::InvalidUrl`] when no feed URL is configured.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, FeedError> {
        let base_url = config.feed_url.clone().ok_or_else(|| FeedError::InvalidUrl {
            url: String::new(),
            reason: "WAYFIND_FEED_URL is not set".to_string(),
        })?;
        Ok(Self {
            base_url,
            collection: config.feed_collection.clone(),
            poll_interval: Duration::from_secs(config.feed_poll_secs),
            request_timeout_secs: config.request_timeout_secs,
            user_agent: config.user_agent.clone(),
            max_retries: config.feed_max_retries,
            backoff_base_secs: config.feed_retry_backoff_base_secs,
        })
    }

    /// The collection endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::InvalidUrl`] if the base URL does not parse or is
    /// not http(s).
    pub fn collection_url(&self) -> Result<Url, FeedError> {
        let invalid = |reason: String| FeedError::InvalidUrl {
            url: redact(&self.base_url),
            reason,
        };
        let mut url = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme \"{}\"", url.scheme())));
        }
        let collection = self.collection.trim_matches('/');
        if collection.is_empty() {
            return Err(invalid("collection name is empty".to_string()));
        }
        let path = format!("{}/{collection}.json", url.path().trim_end_matches('/'));
        url.set_path(&path);
        Ok(url)
    }

    fn build_client(&self) -> Result<Client, FeedError> {
        Ok(Client::builder()
            .timeout(Duration::from_secs(self.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&self.user_agent)
            .build()?)
    }
}

/// Strip the query string, which may carry credentials.
fn redact(url: &str) -> String {
    match url.split_once('?') {
        Some((base, _)) => format!("{base}?[redacted]"),
        None => url.to_string(),
    }
}

/// Polling feed. Emits a snapshot on the first successful poll and then
/// only when the response body changes.
pub struct HttpFeed {
    client: Client,
    url: Url,
    ticker: Interval,
    max_retries: u32,
    backoff_base_secs: u64,
    last_digest: Option<Vec<u8>>,
}

impl HttpFeed {
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::InvalidUrl`] for a bad base URL and
    /// [`FeedError::Http`] if the HTTP client cannot be constructed.
    pub fn new(config: &HttpFeedConfig) -> Result<Self, FeedError> {
        let url = config.collection_url()?;
        let client = config.build_client()?;
        let mut ticker = interval(config.poll_interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Ok(Self {
            client,
            url,
            ticker,
            max_retries: config.max_retries,
            backoff_base_secs: config.backoff_base_secs,
            last_digest: None,
        })
    }

    /// One GET of the collection, with retries on transient failures.
    ///
    /// # Errors
    ///
    /// - [`FeedError::RateLimited`]: HTTP 429 after all retries.
    /// - [`FeedError::UnexpectedStatus`]: any other non-2xx (5xx retried).
    /// - [`FeedError::Http`]: network failure after all retries.
    pub async fn fetch(&self) -> Result<String, FeedError> {
        retry_with_backoff(self.max_retries, self.backoff_base_secs, || async {
            let response = self
                .client
                .get(self.url.clone())
                .header(reqwest::header::ACCEPT, "application/json")
                .header(reqwest::header::CACHE_CONTROL, "no-cache")
                .send()
                .await?;
            check_status(&response, &self.url)?;
            Ok(response.text().await?)
        })
        .await
    }

    /// Parse a body, returning `None` when it matches the last one seen.
    fn accept(&mut self, body: &str) -> Result<Option<RawSnapshot>, FeedError> {
        let digest = Sha256::digest(body.as_bytes()).to_vec();
        if self.last_digest.as_ref() == Some(&digest) {
            return Ok(None);
        }
        let payload = serde_json::from_str(body).map_err(|e| FeedError::Deserialize {
            context: format!("collection from {}", redact(self.url.as_str())),
            source: e,
        })?;
        let snapshot = RawSnapshot::from_json(payload)?;
        self.last_digest = Some(digest);
        Ok(Some(snapshot))
    }
}

impl FacilityFeed for HttpFeed {
    async fn next_snapshot(&mut self) -> Option<RawSnapshot> {
        loop {
            self.ticker.tick().await;
            let outcome = match self.fetch().await {
                Ok(body) => self.accept(&body),
                Err(e) => Err(e),
            };
            match outcome {
                Ok(Some(snapshot)) => {
                    tracing::debug!(records = snapshot.len(), "feed payload changed");
                    return Some(snapshot);
                }
                Ok(None) => tracing::trace!("feed payload unchanged"),
                Err(e) => tracing::warn!(
                    url = %redact(self.url.as_str()),
                    error = %e,
                    "feed poll failed; keeping previous snapshot"
                ),
            }
        }
    }
}

/// Write path over the same REST endpoint. Appends are not retried, since a
/// repeated POST would create a duplicate record.
pub struct HttpWriter {
    client: Client,
    url: Url,
}

#[derive(Deserialize)]
struct PushResponse {
    name: String,
}

impl HttpWriter {
    /// # Errors
    ///
    /// Same as [`HttpFeed::new`].
    pub fn new(config: &HttpFeedConfig) -> Result<Self, FeedError> {
        Ok(Self {
            client: config.build_client()?,
            url: config.collection_url()?,
        })
    }
}

impl FacilityWriter for HttpWriter {
    async fn append(&self, facility: NewFacility) -> Result<FacilityId, FeedError> {
        facility.validate()?;
        let record = facility.to_record(chrono::Utc::now());

        let response = self.client.post(self.url.clone()).json(&record).send().await?;
        check_status(&response, &self.url)?;

        let body = response.text().await?;
        let pushed: PushResponse =
            serde_json::from_str(&body).map_err(|e| FeedError::Deserialize {
                context: "append response".to_string(),
                source: e,
            })?;
        tracing::info!(facility_id = %pushed.name, "facility appended to feed");
        Ok(FacilityId::new(pushed.name))
    }
}

pub(crate) fn check_status(response: &reqwest::Response, url: &Url) -> Result<(), FeedError> {
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(60);
        return Err(FeedError::RateLimited { retry_after_secs });
    }
    if !status.is_success() {
        return Err(FeedError::UnexpectedStatus {
            status: status.as_u16(),
            url: redact(url.as_str()),
        });
    }
    Ok(())
}
