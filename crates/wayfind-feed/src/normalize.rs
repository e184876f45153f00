//! Normalization from raw feed records to [`wayfind_core::Facility`].
//!
//! Rules:
//! - missing capability flags are `false`;
//! - missing or blank `hoursOfOperation` is [`DEFAULT_HOURS`];
//! - numeric fields may arrive as JSON numbers or numeric strings; anything
//!   that does not coerce to a finite number drops the record;
//! - the configured [`LongitudePolicy`] is applied before range checks.
//!
//! Keys are accepted in camelCase (as written by the submission form) or
//! snake_case.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use wayfind_core::{Amenities, Coordinate, Facility, FacilityDraft, FacilityId, LongitudePolicy};

use crate::error::FeedNormalizationError;
use crate::record::{RawRecord, RawSnapshot};

pub const DEFAULT_HOURS: &str = "24/7";

const LAT_KEYS: &[&str] = &["lat", "latitude"];
const LNG_KEYS: &[&str] = &["lng", "lon", "longitude"];
const TOTAL_RATING_KEYS: &[&str] = &[
    "totalRating",
    "total_rating",
    "ratingTotal",
    "rating_total",
];
const RATING_COUNT_KEYS: &[&str] = &["ratingCount", "rating_count"];
const WHEELCHAIR_KEYS: &[&str] = &[
    "hasWheelchairAccess",
    "has_wheelchair_access",
    "wheelchairAccessible",
    "wheelchair_accessible",
];
const CHANGING_TABLE_KEYS: &[&str] = &["hasChangingTables", "has_changing_tables"];
const GENDER_NEUTRAL_KEYS: &[&str] = &[
    "isGenderNeutral",
    "is_gender_neutral",
    "genderNeutral",
    "gender_neutral",
];
const REQUIRES_KEY_KEYS: &[&str] = &["requiresKey", "requires_key"];
const HOURS_KEYS: &[&str] = &["hoursOfOperation", "hours_of_operation"];
const CREATED_AT_KEYS: &[&str] = &["createdAt", "created_at"];

/// Normalize every record in `snapshot`, dropping (and logging) the ones
/// that fail.
///
/// A key that appears more than once keeps its first position and its last
/// value.
#[must_use]
pub fn normalize_snapshot(snapshot: &RawSnapshot, policy: LongitudePolicy) -> Vec<Facility> {
    let mut facilities: Vec<Facility> = Vec::with_capacity(snapshot.len());
    let mut positions: HashMap<FacilityId, usize> = HashMap::with_capacity(snapshot.len());
    let mut dropped = 0usize;

    for record in &snapshot.records {
        match normalize_record(record, policy) {
            Ok(facility) => {
                if let Some(&idx) = positions.get(facility.id()) {
                    facilities[idx] = facility;
                } else {
                    positions.insert(facility.id().clone(), facilities.len());
                    facilities.push(facility);
                }
            }
            Err(e) => {
                dropped += 1;
                tracing::warn!(
                    facility_id = %e.facility_id,
                    reason = %e.reason,
                    "dropping malformed facility record"
                );
            }
        }
    }

    if dropped > 0 {
        tracing::info!(
            kept = facilities.len(),
            dropped,
            "normalized facility snapshot with dropped records"
        );
    }

    facilities
}

/// Normalize one keyed record into a [`Facility`].
///
/// # Errors
///
/// Returns [`FeedNormalizationError`] if the value is not an object, a
/// required field is missing, a numeric field does not coerce to a finite
/// number, coordinates are out of range, or the facility invariants
/// (non-empty name/description, rating count at least 1) do not hold.
pub fn normalize_record(
    record: &RawRecord,
    policy: LongitudePolicy,
) -> Result<Facility, FeedNormalizationError> {
    let key = record.key.as_str();
    let fail = |reason: String| FeedNormalizationError::new(key, reason);

    if key.trim().is_empty() {
        return Err(fail("record has an empty key".to_string()));
    }

    let Value::Object(obj) = &record.value else {
        return Err(fail(format!("expected an object, got {}", record.value)));
    };

    let name = string_field(obj, &["name"]).unwrap_or_default();
    let description = string_field(obj, &["description"]).unwrap_or_default();

    let lat = required_number(obj, LAT_KEYS, "lat").map_err(&fail)?;
    let lng = policy.apply(required_number(obj, LNG_KEYS, "lng").map_err(&fail)?);
    let location = Coordinate::new(lat, lng).map_err(|e| fail(e.to_string()))?;

    let total = optional_number(obj, TOTAL_RATING_KEYS, "totalRating").map_err(&fail)?;
    let rating_total = match total {
        Some(total) => total,
        // Legacy records carry only a single `rating`.
        None => optional_number(obj, &["rating"], "rating")
            .map_err(&fail)?
            .ok_or_else(|| fail("missing totalRating".to_string()))?,
    };
    let count = optional_number(obj, RATING_COUNT_KEYS, "ratingCount").map_err(&fail)?;
    let rating_count = match count {
        Some(count) => rating_count_from(count).map_err(&fail)?,
        None => 1,
    };

    let amenities = Amenities {
        wheelchair_accessible: flag(obj, WHEELCHAIR_KEYS),
        has_changing_tables: flag(obj, CHANGING_TABLE_KEYS),
        gender_neutral: flag(obj, GENDER_NEUTRAL_KEYS),
        requires_key: flag(obj, REQUIRES_KEY_KEYS),
    };

    let hours_of_operation = string_field(obj, HOURS_KEYS)
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| DEFAULT_HOURS.to_string());

    let draft = FacilityDraft {
        name,
        description,
        location,
        rating_total,
        rating_count,
        amenities,
        hours_of_operation,
        address: string_field(obj, &["address"]),
        created_at: created_at(obj, key),
    };

    Facility::new(FacilityId::new(key), draft).map_err(|e| fail(e.to_string()))
}

fn lookup<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|k| obj.get(*k))
        .filter(|v| !v.is_null())
}

fn string_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    match lookup(obj, keys)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Coerce a JSON value the way the submission form writes numbers: native
/// numbers pass through, numeric strings are parsed. Anything else is NaN.
fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

fn optional_number(
    obj: &Map<String, Value>,
    keys: &[&str],
    label: &str,
) -> Result<Option<f64>, String> {
    let Some(value) = lookup(obj, keys) else {
        return Ok(None);
    };
    let number = coerce_number(value);
    if number.is_finite() {
        Ok(Some(number))
    } else {
        Err(format!("{label} is not a number: {value}"))
    }
}

fn required_number(obj: &Map<String, Value>, keys: &[&str], label: &str) -> Result<f64, String> {
    optional_number(obj, keys, label)?.ok_or_else(|| format!("missing {label}"))
}

// Range and integrality are checked before the cast.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn rating_count_from(count: f64) -> Result<u32, String> {
    if count.fract() != 0.0 || count < 1.0 || count > f64::from(u32::MAX) {
        return Err(format!("ratingCount must be a positive integer, got {count}"));
    }
    Ok(count as u32)
}

fn flag(obj: &Map<String, Value>, keys: &[&str]) -> bool {
    match lookup(obj, keys) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        _ => false,
    }
}

fn created_at(obj: &Map<String, Value>, key: &str) -> Option<DateTime<Utc>> {
    let raw = string_field(obj, CREATED_AT_KEYS)?;
    match DateTime::parse_from_rfc3339(&raw) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(e) => {
            tracing::debug!(facility_id = key, raw, error = %e, "ignoring unparseable createdAt");
            None
        }
    }
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
