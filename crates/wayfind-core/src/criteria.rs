//! Query inputs for the discovery view: filters, sort order, search text.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Highest rating a facility can carry.
pub const MAX_RATING: f64 = 5.0;

/// Filter predicates, compared by value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// Inclusive lower bound on the average rating, `0..=5`.
    pub min_rating: f64,
    pub wheelchair_access: bool,
    pub changing_tables: bool,
}

impl FilterCriteria {
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRating`] if `min_rating` is outside `0..=5`.
    pub fn new(
        min_rating: f64,
        wheelchair_access: bool,
        changing_tables: bool,
    ) -> Result<Self, CoreError> {
        if !(0.0..=MAX_RATING).contains(&min_rating) {
            return Err(CoreError::InvalidRating(format!(
                "minimum rating {min_rating} must be between 0 and {MAX_RATING}"
            )));
        }
        Ok(Self {
            min_rating,
            wheelchair_access,
            changing_tables,
        })
    }

    /// `true` when any predicate narrows the result.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.min_rating > 0.0 || self.wheelchair_access || self.changing_tables
    }

    /// The "clear filters" state.
    #[must_use]
    pub fn cleared() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Distance,
    Rating,
    Name,
}

impl SortKey {
    /// Distance ordering is meaningless until a fix exists.
    #[must_use]
    pub fn is_available(self, has_location: bool) -> bool {
        !matches!(self, Self::Distance) || has_location
    }
}

impl FromStr for SortKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "distance" => Ok(Self::Distance),
            "rating" => Ok(Self::Rating),
            "name" => Ok(Self::Name),
            other => Err(CoreError::UnknownVariant {
                kind: "sort key",
                value: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Distance => write!(f, "distance"),
            Self::Rating => write!(f, "rating"),
            Self::Name => write!(f, "name"),
        }
    }
}

/// Everything the user controls about the list: filters, ordering, search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryCriteria {
    pub filters: FilterCriteria,
    pub sort_key: SortKey,
    pub search_text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filters_are_inactive() {
        assert!(!FilterCriteria::default().is_active());
        assert_eq!(FilterCriteria::cleared(), FilterCriteria::default());
    }

    #[test]
    fn any_predicate_activates_filters() {
        assert!(FilterCriteria::new(1.0, false, false).unwrap().is_active());
        assert!(FilterCriteria::new(0.0, true, false).unwrap().is_active());
        assert!(FilterCriteria::new(0.0, false, true).unwrap().is_active());
    }

    #[test]
    fn min_rating_out_of_range_is_rejected() {
        assert!(FilterCriteria::new(5.5, false, false).is_err());
        assert!(FilterCriteria::new(-0.1, false, false).is_err());
        assert!(FilterCriteria::new(f64::NAN, false, false).is_err());
    }

    #[test]
    fn distance_sort_requires_location() {
        assert!(!SortKey::Distance.is_available(false));
        assert!(SortKey::Distance.is_available(true));
        assert!(SortKey::Rating.is_available(false));
        assert!(SortKey::Name.is_available(false));
    }

    #[test]
    fn sort_key_parses_case_insensitively() {
        assert_eq!("Rating".parse::<SortKey>().unwrap(), SortKey::Rating);
        assert_eq!("name".parse::<SortKey>().unwrap(), SortKey::Name);
        assert!("newest".parse::<SortKey>().is_err());
    }
}
