//! The discovery view: filter, annotate with distance, sort.
//!
//! [`evaluate`] is a pure function of its arguments. It never reads the
//! clock or any shared state, so identical inputs always give identical
//! views.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::Serialize;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;
use wayfind_core::{DiscoveryCriteria, Facility, FilterCriteria, SortKey, UserLocation};
use wayfind_feed::FacilitySnapshot;
use wayfind_geo::distance_km;

/// One facility in the view, with its distance from the user when known.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveryEntry {
    pub facility: Facility,
    pub distance_km: Option<f64>,
}

/// Ordered result of a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiscoveryView {
    entries: Vec<DiscoveryEntry>,
    #[serde(skip)]
    searched: bool,
}

impl DiscoveryView {
    #[must_use]
    pub fn entries(&self) -> &[DiscoveryEntry] {
        &self.entries
    }

    #[must_use]
    pub fn into_entries(self) -> Vec<DiscoveryEntry> {
        self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `true` when the view is empty and a search term was in effect, so
    /// the list should say "no match" rather than "none found".
    #[must_use]
    pub fn is_empty_because_of_search(&self) -> bool {
        self.entries.is_empty() && self.searched
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DiscoveryEntry> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a DiscoveryView {
    type Item = &'a DiscoveryEntry;
    type IntoIter = std::slice::Iter<'a, DiscoveryEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Compute the view for one combination of inputs.
#[must_use]
pub fn evaluate(
    facilities: &[Facility],
    user_location: Option<&UserLocation>,
    criteria: &DiscoveryCriteria,
) -> DiscoveryView {
    let needle = criteria.search_text.to_lowercase();

    let mut entries: Vec<DiscoveryEntry> = facilities
        .iter()
        .filter(|f| passes_filters(f, &criteria.filters) && matches_search(f, &needle))
        .map(|f| DiscoveryEntry {
            facility: f.clone(),
            distance_km: user_location.map(|u| distance_km(u.coordinate, f.location())),
        })
        .collect();

    // `sort_by` is stable, so ties keep snapshot order.
    match criteria.sort_key {
        SortKey::Distance => entries.sort_by(|a, b| by_distance(a.distance_km, b.distance_km)),
        SortKey::Rating => {
            entries.sort_by(|a, b| b.facility.rating().total_cmp(&a.facility.rating()));
        }
        SortKey::Name => entries.sort_by(|a, b| compare_names(a.facility.name(), b.facility.name())),
    }

    DiscoveryView {
        entries,
        searched: !criteria.search_text.is_empty(),
    }
}

/// Rating and amenity predicates.
#[must_use]
pub fn passes_filters(facility: &Facility, filters: &FilterCriteria) -> bool {
    facility.rating() >= filters.min_rating
        && (!filters.wheelchair_access || facility.amenities().wheelchair_accessible)
        && (!filters.changing_tables || facility.amenities().has_changing_tables)
}

/// Case-insensitive substring match on name or description. `needle` must
/// already be lowercased; an empty needle matches everything.
fn matches_search(facility: &Facility, needle: &str) -> bool {
    needle.is_empty()
        || facility.name().to_lowercase().contains(needle)
        || facility.description().to_lowercase().contains(needle)
}

fn by_distance(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Name ordering for people rather than code points: accents and case are
/// ignored first, so "École" sorts among the E's. Ties fall back to the
/// lowercased name, then the raw string, so the order stays total.
#[must_use]
pub fn compare_names(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| a.cmp(b))
}

/// Canonical decomposition with combining marks dropped, lowercased.
fn collation_key(name: &str) -> String {
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
struct QueryKey {
    revision: u64,
    location: Option<UserLocation>,
    criteria: DiscoveryCriteria,
}

/// Caches the last view and reuses it while the snapshot revision, user
/// location and criteria are unchanged.
#[derive(Debug, Default)]
pub struct MemoizedQuery {
    last: Option<(QueryKey, Arc<DiscoveryView>)>,
}

impl MemoizedQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn evaluate(
        &mut self,
        snapshot: &FacilitySnapshot,
        user_location: Option<&UserLocation>,
        criteria: &DiscoveryCriteria,
    ) -> Arc<DiscoveryView> {
        let key = QueryKey {
            revision: snapshot.revision,
            location: user_location.copied(),
            criteria: criteria.clone(),
        };
        if let Some((cached_key, view)) = &self.last {
            if *cached_key == key {
                return Arc::clone(view);
            }
        }

        let view = Arc::new(evaluate(snapshot, user_location, criteria));
        self.last = Some((key, Arc::clone(&view)));
        view
    }

    /// Drop the cached view.
    pub fn invalidate(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
#[path = "query_test.rs"]
mod tests;
