//! Domain model and configuration shared by every `wayfind` crate.
//!
//! Nothing in here performs I/O apart from [`load_app_config`], which reads
//! the process environment.

pub mod app_config;
pub mod config;
pub mod criteria;
pub mod facility;
pub mod location;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use criteria::{DiscoveryCriteria, FilterCriteria, SortKey, MAX_RATING};
pub use facility::{Amenities, Facility, FacilityDraft, FacilityId};
pub use location::{Coordinate, LocationFault, LongitudePolicy, UserLocation};

/// Violations of domain invariants.
#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    #[error("coordinate out of range: lat={lat}, lng={lng}")]
    InvalidCoordinate { lat: f64, lng: f64 },

    #[error("{field} must be non-empty")]
    EmptyField { field: &'static str },

    #[error("invalid rating: {0}")]
    InvalidRating(String),

    #[error("unknown {kind} \"{value}\"")]
    UnknownVariant { kind: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
