//! Facility ingestion for `wayfind`.
//!
//! A [`FacilityFeed`] delivers full raw snapshots (never diffs) from some
//! transport. [`FacilityRepository`] normalizes each snapshot into
//! [`wayfind_core::Facility`] values, dropping malformed records without
//! interrupting the subscription, and hands the result to a subscriber.
//! [`FacilityWriter`] is the fire-and-forget append path used by the
//! submission form, and [`Geocoder`] turns a typed address into coordinates
//! for it.

pub mod error;
pub mod geocode;
pub mod http;
pub mod memory;
pub mod normalize;
pub mod record;
pub mod repository;
pub mod writer;

mod retry;

pub use error::{FeedError, FeedNormalizationError};
pub use geocode::{GeocodedAddress, Geocoder, GeocoderConfig};
pub use http::{HttpFeed, HttpFeedConfig, HttpWriter};
pub use memory::{MemoryFeed, MemoryFeedHandle};
pub use normalize::{normalize_record, normalize_snapshot, DEFAULT_HOURS};
pub use record::{RawRecord, RawSnapshot};
pub use repository::{FacilityFeed, FacilityRepository, FacilitySnapshot, FeedSubscription};
pub use writer::{FacilityWriter, NewFacility};
