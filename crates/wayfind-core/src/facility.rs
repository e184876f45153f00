//! The facility record and its identity.

use std::num::NonZeroU32;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::location::Coordinate;
use crate::CoreError;

/// Opaque facility identity, assigned by the feed at ingestion (the key the
/// record is stored under).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FacilityId(String);

impl FacilityId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FacilityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FacilityId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Capability flags. Absent flags on the wire mean `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Amenities {
    pub wheelchair_accessible: bool,
    pub has_changing_tables: bool,
    pub gender_neutral: bool,
    pub requires_key: bool,
}

/// Unvalidated facility fields, as produced by feed normalization or a
/// submission form.
#[derive(Debug, Clone, PartialEq)]
pub struct FacilityDraft {
    pub name: String,
    pub description: String,
    pub location: Coordinate,
    pub rating_total: f64,
    pub rating_count: u32,
    pub amenities: Amenities,
    pub hours_of_operation: String,
    pub address: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// An immutable snapshot of one facility.
///
/// Updates from the feed replace the whole value for an id; nothing in the
/// engine mutates a `Facility` after construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Facility {
    id: FacilityId,
    name: String,
    description: String,
    location: Coordinate,
    rating_total: f64,
    rating_count: NonZeroU32,
    amenities: Amenities,
    hours_of_operation: String,
    address: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

impl Facility {
    /// Validate a draft and bind it to `id`.
    ///
    /// # Errors
    ///
    /// - [`CoreError::EmptyField`] if `name` or `description` is blank.
    /// - [`CoreError::InvalidRating`] if `rating_count` is zero or
    ///   `rating_total` is negative or non-finite.
    pub fn new(id: FacilityId, draft: FacilityDraft) -> Result<Self, CoreError> {
        let name = draft.name.trim().to_string();
        if name.is_empty() {
            return Err(CoreError::EmptyField { field: "name" });
        }
        let description = draft.description.trim().to_string();
        if description.is_empty() {
            return Err(CoreError::EmptyField {
                field: "description",
            });
        }

        let rating_count = NonZeroU32::new(draft.rating_count)
            .ok_or_else(|| CoreError::InvalidRating("rating count must be at least 1".into()))?;
        if !draft.rating_total.is_finite() || draft.rating_total < 0.0 {
            return Err(CoreError::InvalidRating(format!(
                "rating total {} is not a non-negative number",
                draft.rating_total
            )));
        }

        let address = draft
            .address
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());

        Ok(Self {
            id,
            name,
            description,
            location: draft.location,
            rating_total: draft.rating_total,
            rating_count,
            amenities: draft.amenities,
            hours_of_operation: draft.hours_of_operation,
            address,
            created_at: draft.created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> &FacilityId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn location(&self) -> Coordinate {
        self.location
    }

    #[must_use]
    pub fn rating_total(&self) -> f64 {
        self.rating_total
    }

    #[must_use]
    pub fn rating_count(&self) -> u32 {
        self.rating_count.get()
    }

    /// Average rating, `rating_total / rating_count`.
    #[must_use]
    pub fn rating(&self) -> f64 {
        self.rating_total / f64::from(self.rating_count.get())
    }

    #[must_use]
    pub fn amenities(&self) -> Amenities {
        self.amenities
    }

    #[must_use]
    pub fn hours_of_operation(&self) -> &str {
        &self.hours_of_operation
    }

    #[must_use]
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}
