//! Navigation deep links from the user's position to a facility.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use wayfind_core::{AppConfig, Coordinate, FacilityId};
use wayfind_geo::{distance_km, LocationState};

use crate::format::walking_distance_m;

static IOS_UA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"iPad|iPhone|iPod").expect("valid iOS user-agent regex"));
static ANDROID_UA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Android").expect("valid Android user-agent regex"));

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectionsError {
    #[error("no facility with id {0} in the current snapshot")]
    UnknownFacility(FacilityId),

    /// No fix arrived within the bounded wait.
    #[error("location unavailable after waiting {waited_secs}s")]
    LocationUnavailable { waited_secs: u64 },
}

impl DirectionsError {
    /// Text for the directions panel.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::UnknownFacility(_) => "This facility is no longer listed.",
            Self::LocationUnavailable { .. } => {
                "Please enable location services to get directions."
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Ios,
    Android,
    #[default]
    Desktop,
}

impl Platform {
    #[must_use]
    pub fn detect(user_agent: &str) -> Self {
        if IOS_UA.is_match(user_agent) {
            Self::Ios
        } else if ANDROID_UA.is_match(user_agent) {
            Self::Android
        } else {
            Self::Desktop
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MapProvider {
    Google,
    Apple,
    Waze,
    Here,
    Browser,
}

/// Walking directions in every supported provider's format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectionLinks {
    pub google: String,
    pub apple: String,
    pub waze: String,
    pub here: String,
    pub browser: String,
    /// The link to feature for this platform.
    pub primary: MapProvider,
    pub walking_distance_m: u64,
}

impl DirectionLinks {
    /// Apple Maps is primary on iOS unless running as an installed web app,
    /// where the `maps://` scheme does not open. Google Maps otherwise.
    #[must_use]
    pub fn build(
        origin: Coordinate,
        destination: Coordinate,
        platform: Platform,
        standalone: bool,
    ) -> Self {
        let primary = if platform == Platform::Ios && !standalone {
            MapProvider::Apple
        } else {
            MapProvider::Google
        };
        Self {
            google: format!(
                "https://www.google.com/maps/dir/?api=1&origin={origin}&destination={destination}&travelmode=walking"
            ),
            apple: format!("maps://?saddr={origin}&daddr={destination}&dirflg=w"),
            waze: format!("https://waze.com/ul?ll={destination}&navigate=yes&zoom=17"),
            here: format!("https://share.here.com/r/{destination}?ref={origin}"),
            browser: format!(
                "https://www.openstreetmap.org/directions?from={origin}&to={destination}"
            ),
            primary,
            walking_distance_m: walking_distance_m(distance_km(origin, destination)),
        }
    }

    #[must_use]
    pub fn url(&self, provider: MapProvider) -> &str {
        match provider {
            MapProvider::Google => &self.google,
            MapProvider::Apple => &self.apple,
            MapProvider::Waze => &self.waze,
            MapProvider::Here => &self.here,
            MapProvider::Browser => &self.browser,
        }
    }

    #[must_use]
    pub fn primary_url(&self) -> &str {
        self.url(self.primary)
    }
}

/// Everything needed to turn a destination into [`DirectionLinks`]: a
/// reader of the location state and the client's platform.
#[derive(Debug, Clone)]
pub struct Directions {
    location: watch::Receiver<LocationState>,
    wait: Duration,
    platform: Platform,
    standalone: bool,
}

impl Directions {
    #[must_use]
    pub fn new(location: watch::Receiver<LocationState>, wait: Duration) -> Self {
        Self {
            location,
            wait,
            platform: Platform::Desktop,
            standalone: false,
        }
    }

    #[must_use]
    pub fn from_app_config(location: watch::Receiver<LocationState>, config: &AppConfig) -> Self {
        Self::new(location, Duration::from_secs(config.directions_wait_secs))
    }

    #[must_use]
    pub fn with_platform(mut self, platform: Platform, standalone: bool) -> Self {
        self.platform = platform;
        self.standalone = standalone;
        self
    }

    /// Links from the latest fix to `destination`.
    ///
    /// Without a fix this waits up to the configured bound for one.
    ///
    /// # Errors
    ///
    /// Returns [`DirectionsError::LocationUnavailable`] if no fix exists
    /// when the wait ends.
    pub async fn to(&self, destination: Coordinate) -> Result<DirectionLinks, DirectionsError> {
        let origin = self.origin().await.ok_or_else(|| {
            tracing::info!(
                wait_secs = self.wait.as_secs(),
                "no location fix for directions"
            );
            DirectionsError::LocationUnavailable {
                waited_secs: self.wait.as_secs(),
            }
        })?;
        Ok(DirectionLinks::build(
            origin,
            destination,
            self.platform,
            self.standalone,
        ))
    }

    async fn origin(&self) -> Option<Coordinate> {
        let mut rx = self.location.clone();
        let waited = tokio::time::timeout(self.wait, rx.wait_for(|s| s.last_known.is_some())).await;
        match waited {
            Ok(Ok(state)) => state.last_known.map(|l| l.coordinate),
            // Timed out, or the watcher is gone.
            _ => None,
        }
    }
}
