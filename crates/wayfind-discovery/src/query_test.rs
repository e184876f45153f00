use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use wayfind_core::{Amenities, Coordinate, FacilityDraft, FacilityId};

use super::*;

fn facility(id: &str, name: &str, rating: f64, wheelchair: bool) -> Facility {
    facility_at(id, name, rating, wheelchair, 47.6, -122.3)
}

fn facility_at(id: &str, name: &str, rating: f64, wheelchair: bool, lat: f64, lng: f64) -> Facility {
    Facility::new(
        FacilityId::new(id),
        FacilityDraft {
            name: name.to_string(),
            description: format!("{name} restroom"),
            location: Coordinate::new(lat, lng).unwrap(),
            rating_total: rating,
            rating_count: 1,
            amenities: Amenities {
                wheelchair_accessible: wheelchair,
                ..Amenities::default()
            },
            hours_of_operation: "24/7".to_string(),
            address: None,
            created_at: None,
        },
    )
    .unwrap()
}

fn user_at(lat: f64, lng: f64) -> UserLocation {
    UserLocation::new(
        Coordinate::new(lat, lng).unwrap(),
        None,
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
    )
}

fn ids(view: &DiscoveryView) -> Vec<&str> {
    view.iter().map(|e| e.facility.id().as_str()).collect()
}

fn criteria(sort_key: SortKey) -> DiscoveryCriteria {
    DiscoveryCriteria {
        sort_key,
        ..DiscoveryCriteria::default()
    }
}

// -----------------------------------------------------------------------
// Filtering
// -----------------------------------------------------------------------

#[test]
fn rating_and_wheelchair_filters_combine() {
    let facilities = vec![facility("1", "A", 5.0, true), facility("2", "B", 3.0, false)];
    let criteria = DiscoveryCriteria {
        filters: FilterCriteria::new(4.0, true, false).unwrap(),
        ..DiscoveryCriteria::default()
    };

    let view = evaluate(&facilities, None, &criteria);
    assert_eq!(ids(&view), vec!["1"]);
}

#[test]
fn min_rating_is_inclusive() {
    let facilities = vec![facility("1", "A", 4.0, false)];
    let criteria = DiscoveryCriteria {
        filters: FilterCriteria::new(4.0, false, false).unwrap(),
        ..DiscoveryCriteria::default()
    };
    assert_eq!(evaluate(&facilities, None, &criteria).len(), 1);
}

#[test]
fn changing_table_filter_requires_flag() {
    let with_table = Facility::new(
        FacilityId::new("t"),
        FacilityDraft {
            name: "Mall".to_string(),
            description: "Food court".to_string(),
            location: Coordinate::new(47.6, -122.3).unwrap(),
            rating_total: 3.0,
            rating_count: 1,
            amenities: Amenities {
                has_changing_tables: true,
                ..Amenities::default()
            },
            hours_of_operation: "24/7".to_string(),
            address: None,
            created_at: None,
        },
    )
    .unwrap();
    let facilities = vec![facility("n", "Park", 5.0, true), with_table];
    let criteria = DiscoveryCriteria {
        filters: FilterCriteria::new(0.0, false, true).unwrap(),
        ..DiscoveryCriteria::default()
    };
    assert_eq!(ids(&evaluate(&facilities, None, &criteria)), vec!["t"]);
}

#[test]
fn search_is_case_insensitive_over_name_and_description() {
    let facilities = vec![
        facility("1", "Central Library", 4.0, false),
        facility("2", "Gas Station", 2.0, false),
    ];
    let mut criteria = criteria(SortKey::Rating);

    criteria.search_text = "LIBRARY".to_string();
    assert_eq!(ids(&evaluate(&facilities, None, &criteria)), vec!["1"]);

    // Descriptions are "<name> restroom".
    criteria.search_text = "Restroom".to_string();
    assert_eq!(evaluate(&facilities, None, &criteria).len(), 2);
}

#[test]
fn empty_result_distinguishes_search_from_no_data() {
    let facilities = vec![facility("1", "Central Library", 4.0, false)];
    let mut criteria = criteria(SortKey::Name);
    criteria.search_text = "zoo".to_string();
    let view = evaluate(&facilities, None, &criteria);
    assert!(view.is_empty());
    assert!(view.is_empty_because_of_search());

    let view = evaluate(&[], None, &DiscoveryCriteria::default());
    assert!(view.is_empty());
    assert!(!view.is_empty_because_of_search());
}

// -----------------------------------------------------------------------
// Distance annotation and sorting
// -----------------------------------------------------------------------

#[test]
fn distance_sort_without_location_keeps_filtered_order() {
    let facilities = vec![
        facility("c", "C", 1.0, false),
        facility("a", "A", 5.0, false),
        facility("b", "B", 3.0, false),
    ];
    let view = evaluate(&facilities, None, &criteria(SortKey::Distance));
    assert_eq!(ids(&view), vec!["c", "a", "b"]);
    assert!(view.iter().all(|e| e.distance_km.is_none()));
}

#[test]
fn distance_sort_orders_nearest_first() {
    let facilities = vec![
        facility_at("far", "Far", 3.0, false, 47.70, -122.3),
        facility_at("near", "Near", 3.0, false, 47.61, -122.3),
        facility_at("mid", "Mid", 3.0, false, 47.65, -122.3),
    ];
    let user = user_at(47.60, -122.3);
    let view = evaluate(&facilities, Some(&user), &criteria(SortKey::Distance));

    assert_eq!(ids(&view), vec!["near", "mid", "far"]);
    let near = view.entries()[0].distance_km.unwrap();
    assert!((near - 1.112).abs() < 0.01, "got {near}");
}

#[test]
fn location_annotates_every_entry_under_any_sort() {
    let facilities = vec![facility("1", "A", 5.0, false), facility("2", "B", 3.0, false)];
    let user = user_at(47.0, -122.0);
    let view = evaluate(&facilities, Some(&user), &criteria(SortKey::Name));
    assert!(view.iter().all(|e| e.distance_km.is_some()));
}

#[test]
fn rating_sort_is_descending_and_stable() {
    let facilities = vec![
        facility("low", "Low", 2.0, false),
        facility("tie1", "Tie one", 4.0, false),
        facility("top", "Top", 5.0, false),
        facility("tie2", "Tie two", 4.0, false),
    ];
    let view = evaluate(&facilities, None, &criteria(SortKey::Rating));
    assert_eq!(ids(&view), vec!["top", "tie1", "tie2", "low"]);
}

#[test]
fn name_sort_ignores_case() {
    let facilities = vec![
        facility("1", "zoo", 3.0, false),
        facility("2", "Aquarium", 3.0, false),
        facility("3", "bus depot", 3.0, false),
    ];
    let view = evaluate(&facilities, None, &criteria(SortKey::Name));
    assert_eq!(ids(&view), vec!["2", "3", "1"]);
}

#[test]
fn name_sort_ignores_accents() {
    let facilities = vec![
        facility("1", "Zoo", 3.0, false),
        facility("2", "École Centrale", 3.0, false),
        facility("3", "Bank", 3.0, false),
        facility("4", "Äpfel Markt", 3.0, false),
    ];
    let view = evaluate(&facilities, None, &criteria(SortKey::Name));
    assert_eq!(ids(&view), vec!["4", "3", "2", "1"]);
}

#[test]
fn compare_names_folds_accents_before_code_points() {
    assert_eq!(compare_names("École", "Zoo"), Ordering::Less);
    assert_eq!(compare_names("Äpfel", "Bank"), Ordering::Less);
    assert_eq!(compare_names("cafe", "Café"), Ordering::Less);
    assert_eq!(compare_names("Café", "cafe"), Ordering::Greater);
    assert_eq!(compare_names("Café", "Café"), Ordering::Equal);
}

#[test]
fn evaluate_is_deterministic() {
    let facilities = vec![
        facility_at("1", "A", 4.0, true, 47.61, -122.30),
        facility_at("2", "B", 4.0, false, 47.62, -122.31),
        facility_at("3", "C", 2.0, true, 47.63, -122.32),
    ];
    let user = user_at(47.6, -122.3);
    let criteria = DiscoveryCriteria {
        filters: FilterCriteria::new(3.0, false, false).unwrap(),
        sort_key: SortKey::Distance,
        search_text: String::new(),
    };
    assert_eq!(
        evaluate(&facilities, Some(&user), &criteria),
        evaluate(&facilities, Some(&user), &criteria)
    );
}

// -----------------------------------------------------------------------
// Memoization
// -----------------------------------------------------------------------

fn snapshot(revision: u64, facilities: Vec<Facility>) -> FacilitySnapshot {
    FacilitySnapshot {
        revision,
        facilities: Arc::new(facilities),
    }
}

#[test]
fn memoized_query_reuses_view_for_identical_inputs() {
    let mut query = MemoizedQuery::new();
    let snap = snapshot(1, vec![facility("1", "A", 4.0, false)]);
    let criteria = DiscoveryCriteria::default();

    let first = query.evaluate(&snap, None, &criteria);
    let second = query.evaluate(&snap, None, &criteria);
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn memoized_query_recomputes_on_any_input_change() {
    let mut query = MemoizedQuery::new();
    let snap = snapshot(1, vec![facility("1", "A", 4.0, false)]);
    let criteria = DiscoveryCriteria::default();
    let base = query.evaluate(&snap, None, &criteria);

    let user = user_at(47.0, -122.0);
    let moved = query.evaluate(&snap, Some(&user), &criteria);
    assert!(!Arc::ptr_eq(&base, &moved));
    assert!(moved.entries()[0].distance_km.is_some());

    let filtered = query.evaluate(
        &snap,
        Some(&user),
        &DiscoveryCriteria {
            filters: FilterCriteria::new(5.0, false, false).unwrap(),
            ..DiscoveryCriteria::default()
        },
    );
    assert!(filtered.is_empty());

    let next = snapshot(2, vec![facility("2", "B", 5.0, false)]);
    let refreshed = query.evaluate(&next, Some(&user), &criteria);
    assert_eq!(ids(&refreshed), vec!["2"]);
}

#[test]
fn invalidate_forces_recompute() {
    let mut query = MemoizedQuery::new();
    let snap = snapshot(1, vec![facility("1", "A", 4.0, false)]);
    let criteria = DiscoveryCriteria::default();
    let first = query.evaluate(&snap, None, &criteria);
    query.invalidate();
    let second = query.evaluate(&snap, None, &criteria);
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(first, second);
}

// -----------------------------------------------------------------------
// Properties
// -----------------------------------------------------------------------

fn arb_facility() -> impl Strategy<Value = (String, f64, bool, bool, f64, f64)> {
    (
        "[A-Za-z ]{1,10}",
        0u8..=10,
        any::<bool>(),
        any::<bool>(),
        -60.0f64..60.0,
        -170.0f64..170.0,
    )
        .prop_map(|(name, half_stars, wheelchair, tables, lat, lng)| {
            (name, f64::from(half_stars) / 2.0, wheelchair, tables, lat, lng)
        })
}

fn build(specs: &[(String, f64, bool, bool, f64, f64)]) -> Vec<Facility> {
    specs
        .iter()
        .enumerate()
        .filter_map(|(idx, (name, rating, wheelchair, tables, lat, lng))| {
            Facility::new(
                FacilityId::new(format!("f{idx}")),
                FacilityDraft {
                    name: name.clone(),
                    description: "desc".to_string(),
                    location: Coordinate::new(*lat, *lng).ok()?,
                    rating_total: *rating,
                    rating_count: 1,
                    amenities: Amenities {
                        wheelchair_accessible: *wheelchair,
                        has_changing_tables: *tables,
                        ..Amenities::default()
                    },
                    hours_of_operation: "24/7".to_string(),
                    address: None,
                    created_at: None,
                },
            )
            .ok()
        })
        .collect()
}

fn arb_filters() -> impl Strategy<Value = FilterCriteria> {
    (0u8..=10, any::<bool>(), any::<bool>()).prop_map(|(half, w, c)| FilterCriteria {
        min_rating: f64::from(half) / 2.0,
        wheelchair_access: w,
        changing_tables: c,
    })
}

proptest! {
    #[test]
    fn filter_partitions_facilities(
        specs in prop::collection::vec(arb_facility(), 0..25),
        filters in arb_filters(),
    ) {
        let facilities = build(&specs);
        let criteria = DiscoveryCriteria { filters, ..DiscoveryCriteria::default() };
        let view = evaluate(&facilities, None, &criteria);
        let kept: Vec<&FacilityId> = view.iter().map(|e| e.facility.id()).collect();

        for f in &facilities {
            prop_assert_eq!(kept.contains(&f.id()), passes_filters(f, &filters));
        }
    }

    #[test]
    fn rating_sort_is_non_increasing(specs in prop::collection::vec(arb_facility(), 0..25)) {
        let facilities = build(&specs);
        let view = evaluate(&facilities, None, &criteria(SortKey::Rating));
        for pair in view.entries().windows(2) {
            prop_assert!(pair[0].facility.rating() >= pair[1].facility.rating());
        }
    }

    #[test]
    fn name_sort_is_ordered(specs in prop::collection::vec(arb_facility(), 0..25)) {
        let facilities = build(&specs);
        let view = evaluate(&facilities, None, &criteria(SortKey::Name));
        for pair in view.entries().windows(2) {
            prop_assert_ne!(
                compare_names(pair[0].facility.name(), pair[1].facility.name()),
                Ordering::Greater
            );
        }
    }

    #[test]
    fn distance_sort_is_ascending_with_location(
        specs in prop::collection::vec(arb_facility(), 0..25),
        lat in -60.0f64..60.0,
        lng in -170.0f64..170.0,
    ) {
        let facilities = build(&specs);
        let user = user_at(lat, lng);
        let view = evaluate(&facilities, Some(&user), &criteria(SortKey::Distance));
        prop_assert_eq!(view.len(), facilities.len());
        for pair in view.entries().windows(2) {
            prop_assert!(pair[0].distance_km.unwrap() <= pair[1].distance_km.unwrap());
        }
    }

    #[test]
    fn distance_less_entries_sort_last(
        a in prop::option::of(0.0f64..100.0),
        b in prop::option::of(0.0f64..100.0),
    ) {
        if a.is_some() && b.is_none() {
            prop_assert_eq!(by_distance(a, b), Ordering::Less);
        }
        if a.is_none() && b.is_some() {
            prop_assert_eq!(by_distance(a, b), Ordering::Greater);
        }
    }

    #[test]
    fn evaluate_twice_is_identical(
        specs in prop::collection::vec(arb_facility(), 0..15),
        filters in arb_filters(),
        search in "[a-z]{0,2}",
    ) {
        let facilities = build(&specs);
        let criteria = DiscoveryCriteria { filters, sort_key: SortKey::Name, search_text: search };
        prop_assert_eq!(
            evaluate(&facilities, None, &criteria),
            evaluate(&facilities, None, &criteria)
        );
    }
}
