use crate::location::LongitudePolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    /// Base URL of the realtime-database REST endpoint. `None` means the
    /// caller supplies snapshots some other way (files, in-memory feed).
    pub feed_url: Option<String>,
    pub feed_collection: String,
    pub feed_poll_secs: u64,
    pub feed_max_retries: u32,
    pub feed_retry_backoff_base_secs: u64,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Nominatim-compatible search service used to turn a typed address
    /// into coordinates.
    pub geocoder_url: String,
    pub location_timeout_secs: u64,
    pub directions_wait_secs: u64,
    pub selection_zoom: u8,
    pub longitude_policy: LongitudePolicy,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Realtime-database URLs can carry an `auth=` token in the query.
        let feed_url = self
            .feed_url
            .as_deref()
            .map(|url| match url.split_once('?') {
                Some((base, _)) => format!("{base}?[redacted]"),
                None => url.to_string(),
            });

        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("feed_url", &feed_url)
            .field("feed_collection", &self.feed_collection)
            .field("feed_poll_secs", &self.feed_poll_secs)
            .field("feed_max_retries", &self.feed_max_retries)
            .field(
                "feed_retry_backoff_base_secs",
                &self.feed_retry_backoff_base_secs,
            )
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("geocoder_url", &self.geocoder_url)
            .field("location_timeout_secs", &self.location_timeout_secs)
            .field("directions_wait_secs", &self.directions_wait_secs)
            .field("selection_zoom", &self.selection_zoom)
            .field("longitude_policy", &self.longitude_policy)
            .finish()
    }
}
