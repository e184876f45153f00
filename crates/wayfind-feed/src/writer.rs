//! The append-only write path used by the submission form.

use std::future::Future;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use wayfind_core::{Amenities, Coordinate, CoreError, FacilityId};

use crate::error::FeedError;
use crate::normalize::DEFAULT_HOURS;

/// Appends one new facility record to the feed.
///
/// The returned id is the key the record was stored under; the record
/// itself reaches readers through the next snapshot.
pub trait FacilityWriter: Send + Sync {
    fn append(
        &self,
        facility: NewFacility,
    ) -> impl Future<Output = Result<FacilityId, FeedError>> + Send;
}

/// A facility as entered on the submission form.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFacility {
    pub name: String,
    pub description: String,
    pub location: Coordinate,
    pub address: Option<String>,
    /// Initial star rating, 1 to 5.
    pub rating: u8,
    pub amenities: Amenities,
    pub hours_of_operation: String,
}

impl NewFacility {
    /// A submission with the form's defaults: five stars, no amenities,
    /// always open.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>, location: Coordinate) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            location,
            address: None,
            rating: 5,
            amenities: Amenities::default(),
            hours_of_operation: DEFAULT_HOURS.to_string(),
        }
    }

    /// # Errors
    ///
    /// Returns [`CoreError::EmptyField`] for a blank name or description and
    /// [`CoreError::InvalidRating`] when the rating is outside 1..=5.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.trim().is_empty() {
            return Err(CoreError::EmptyField { field: "name" });
        }
        if self.description.trim().is_empty() {
            return Err(CoreError::EmptyField {
                field: "description",
            });
        }
        if !(1..=5).contains(&self.rating) {
            return Err(CoreError::InvalidRating(format!(
                "initial rating must be 1 to 5, got {}",
                self.rating
            )));
        }
        Ok(())
    }

    /// The wire record as stored upstream: a single review, so
    /// `ratingCount = 1` and `totalRating = rating`.
    #[must_use]
    pub fn to_record(&self, created_at: DateTime<Utc>) -> Value {
        let hours = self.hours_of_operation.trim();
        let record = WireRecord {
            name: self.name.trim(),
            description: self.description.trim(),
            lat: self.location.lat(),
            lng: self.location.lng(),
            address: self.address.as_deref().map(str::trim).unwrap_or_default(),
            rating: self.rating,
            rating_count: 1,
            total_rating: self.rating,
            has_wheelchair_access: self.amenities.wheelchair_accessible,
            has_changing_tables: self.amenities.has_changing_tables,
            is_gender_neutral: self.amenities.gender_neutral,
            requires_key: self.amenities.requires_key,
            hours_of_operation: if hours.is_empty() { DEFAULT_HOURS } else { hours },
            created_at: created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        // A struct of plain fields always serializes.
        serde_json::to_value(record).unwrap_or(Value::Null)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRecord<'a> {
    name: &'a str,
    description: &'a str,
    lat: f64,
    lng: f64,
    address: &'a str,
    rating: u8,
    rating_count: u32,
    total_rating: u8,
    has_wheelchair_access: bool,
    has_changing_tables: bool,
    is_gender_neutral: bool,
    requires_key: bool,
    hours_of_operation: &'a str,
    created_at: String,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;
    use crate::normalize::normalize_record;
    use crate::record::RawRecord;
    use wayfind_core::LongitudePolicy;

    fn submission() -> NewFacility {
        let mut facility = NewFacility::new(
            "Union Station",
            "Main concourse, east side",
            Coordinate::new(47.598, -122.330).unwrap(),
        );
        facility.rating = 4;
        facility.amenities.wheelchair_accessible = true;
        facility
    }

    #[test]
    fn form_defaults() {
        let f = NewFacility::new("a", "b", Coordinate::new(0.0, 0.0).unwrap());
        assert_eq!(f.rating, 5);
        assert_eq!(f.hours_of_operation, "24/7");
        assert!(f.validate().is_ok());
    }

    #[test]
    fn blank_name_fails_validation() {
        let mut f = submission();
        f.name = "   ".to_string();
        assert_eq!(f.validate(), Err(CoreError::EmptyField { field: "name" }));
    }

    #[test]
    fn blank_description_fails_validation() {
        let mut f = submission();
        f.description = String::new();
        assert_eq!(
            f.validate(),
            Err(CoreError::EmptyField {
                field: "description"
            })
        );
    }

    #[test]
    fn zero_rating_fails_validation() {
        let mut f = submission();
        f.rating = 0;
        assert!(matches!(f.validate(), Err(CoreError::InvalidRating(_))));
    }

    #[test]
    fn record_is_a_single_review() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        let record = submission().to_record(at);
        assert_eq!(record["ratingCount"], json!(1));
        assert_eq!(record["totalRating"], json!(4));
        assert_eq!(record["rating"], json!(4));
        assert_eq!(record["hasWheelchairAccess"], json!(true));
        assert_eq!(record["createdAt"], json!("2024-05-01T09:30:00.000Z"));
    }

    #[test]
    fn record_normalizes_back_to_the_submission() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        let raw = RawRecord {
            key: "-Nz".to_string(),
            value: submission().to_record(at),
        };
        let facility = normalize_record(&raw, LongitudePolicy::AsReported).unwrap();
        assert_eq!(facility.name(), "Union Station");
        assert_eq!(facility.rating_count(), 1);
        assert!(facility.amenities().wheelchair_accessible);
        assert_eq!(facility.created_at(), Some(at));
        // The form writes an empty address when none was picked.
        assert_eq!(facility.address(), None);
    }
}
