//! Geographic positions: facility coordinates and the user's own fix.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// A WGS84 position in decimal degrees.
///
/// Construction goes through [`Coordinate::new`], so every value in the
/// system satisfies `-90 <= lat <= 90` and `-180 <= lng <= 180`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    lat: f64,
    lng: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    lat: f64,
    lng: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = CoreError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Coordinate::new(raw.lat, raw.lng)
    }
}

impl Coordinate {
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidCoordinate`] when either component is
    /// non-finite or outside its valid range.
    pub fn new(lat: f64, lng: f64) -> Result<Self, CoreError> {
        let lat_ok = lat.is_finite() && (-90.0..=90.0).contains(&lat);
        let lng_ok = lng.is_finite() && (-180.0..=180.0).contains(&lng);
        if lat_ok && lng_ok {
            Ok(Self { lat, lng })
        } else {
            Err(CoreError::InvalidCoordinate { lat, lng })
        }
    }

    #[must_use]
    pub fn lat(&self) -> f64 {
        self.lat
    }

    #[must_use]
    pub fn lng(&self) -> f64 {
        self.lng
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

/// The most recent fix reported for the device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserLocation {
    pub coordinate: Coordinate,
    /// Horizontal accuracy radius in metres, when the sensor reports one.
    pub accuracy: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl UserLocation {
    #[must_use]
    pub fn new(coordinate: Coordinate, accuracy: Option<f64>, timestamp: DateTime<Utc>) -> Self {
        Self {
            coordinate,
            accuracy,
            timestamp,
        }
    }
}

/// Typed failure from the location sensor.
///
/// Faults are transient: they never invalidate a previously delivered
/// [`UserLocation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum LocationFault {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("position unavailable")]
    PositionUnavailable,
    #[error("timed out waiting for a position fix")]
    Timeout,
}

impl LocationFault {
    /// Map a W3C geolocation error code (1, 2, 3) to a fault.
    ///
    /// Unknown codes are reported as [`LocationFault::PositionUnavailable`].
    #[must_use]
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => Self::PermissionDenied,
            3 => Self::Timeout,
            _ => Self::PositionUnavailable,
        }
    }
}

/// Optional longitude sign correction applied while ingesting feed records.
///
/// Some historical snapshots stored western-hemisphere longitudes without
/// their sign. Forcing a hemisphere silently corrupts valid records from the
/// other one, so the default leaves values untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LongitudePolicy {
    #[default]
    AsReported,
    /// Force every longitude negative.
    AssumeWestern,
    /// Force every longitude positive.
    AssumeEastern,
}

impl LongitudePolicy {
    #[must_use]
    pub fn apply(self, lng: f64) -> f64 {
        match self {
            Self::AsReported => lng,
            Self::AssumeWestern => -lng.abs(),
            Self::AssumeEastern => lng.abs(),
        }
    }
}

impl FromStr for LongitudePolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "as_reported" => Ok(Self::AsReported),
            "western" | "assume_western" => Ok(Self::AssumeWestern),
            "eastern" | "assume_eastern" => Ok(Self::AssumeEastern),
            other => Err(CoreError::UnknownVariant {
                kind: "longitude policy",
                value: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for LongitudePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AsReported => write!(f, "as_reported"),
            Self::AssumeWestern => write!(f, "western"),
            Self::AssumeEastern => write!(f, "eastern"),
        }
    }
}
