//! Address lookup against a Nominatim-compatible search service.
//!
//! Used by the submission path when a facility is given a street address but
//! no coordinates. One request per lookup and no retries: public Nominatim
//! instances allow about one request per second per client.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::Deserialize;
use wayfind_core::{AppConfig, Coordinate};

use crate::error::FeedError;
use crate::http::check_status;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeocoderConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
    /// Nominatim's usage policy requires an identifying user agent.
    pub user_agent: String,
}

impl GeocoderConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            base_url: config.geocoder_url.clone(),
            request_timeout_secs: config.request_timeout_secs,
            user_agent: config.user_agent.clone(),
        }
    }

    fn search_url(&self) -> Result<Url, FeedError> {
        let invalid = |reason: String| FeedError::InvalidUrl {
            url: self.base_url.clone(),
            reason,
        };
        let mut url = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme \"{}\"", url.scheme())));
        }
        let path = format!("{}/search", url.path().trim_end_matches('/'));
        url.set_path(&path);
        Ok(url)
    }
}

/// Best match for an address.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedAddress {
    pub location: Coordinate,
    /// The service's formatted name for the match.
    pub display_name: String,
}

pub struct Geocoder {
    client: Client,
    url: Url,
}

/// Nominatim sends degrees as strings; some compatible services send numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum Degrees {
    Text(String),
    Number(f64),
}

impl Degrees {
    fn value(&self, field: &str) -> Result<f64, FeedError> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Text(s) => s.trim().parse().map_err(|_| {
                FeedError::UnexpectedShape(format!("geocoder {field} \"{s}\" is not a number"))
            }),
        }
    }
}

#[derive(Deserialize)]
struct Place {
    lat: Degrees,
    lon: Degrees,
    #[serde(default)]
    display_name: String,
}

impl Geocoder {
    /// # Errors
    ///
    /// Returns [`FeedError::InvalidUrl`] for a bad base URL and
    /// [`FeedError::Http`] if the HTTP client cannot be constructed.
    pub fn new(config: &GeocoderConfig) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&config.user_agent)
            .build()?;
        Ok(Self {
            client,
            url: config.search_url()?,
        })
    }

    /// Look up `address`. `Ok(None)` means the service found nothing, or the
    /// address was blank.
    ///
    /// # Errors
    ///
    /// - [`FeedError::Http`] / [`FeedError::UnexpectedStatus`] /
    ///   [`FeedError::RateLimited`]: the request failed.
    /// - [`FeedError::Deserialize`] / [`FeedError::UnexpectedShape`]: the
    ///   response is not a list of places with usable coordinates.
    pub async fn lookup(&self, address: &str) -> Result<Option<GeocodedAddress>, FeedError> {
        let address = address.trim();
        if address.is_empty() {
            return Ok(None);
        }

        let mut url = self.url.clone();
        url.query_pairs_mut()
            .append_pair("format", "json")
            .append_pair("limit", "1")
            .append_pair("q", address);

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        check_status(&response, &self.url)?;
        let body = response.text().await?;

        let places: Vec<Place> =
            serde_json::from_str(&body).map_err(|e| FeedError::Deserialize {
                context: "geocoder response".to_string(),
                source: e,
            })?;
        let Some(place) = places.into_iter().next() else {
            tracing::debug!(address, "geocoder found no match");
            return Ok(None);
        };

        let lat = place.lat.value("latitude")?;
        let lng = place.lon.value("longitude")?;
        let location = Coordinate::new(lat, lng)
            .map_err(|e| FeedError::UnexpectedShape(format!("geocoder match: {e}")))?;
        Ok(Some(GeocodedAddress {
            location,
            display_name: place.display_name,
        }))
    }
}
