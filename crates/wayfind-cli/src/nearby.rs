use std::fmt::Write as _;
use std::path::Path;

use wayfind_core::{AppConfig, Amenities};
use wayfind_discovery::{evaluate, format_distance_km, DiscoveryView};

use crate::args::{CriteriaArgs, LocationArgs};
use crate::source::load_facilities;

/// List the facilities that pass the given criteria.
///
/// # Errors
///
/// Returns an error if the snapshot cannot be loaded or an argument is out
/// of range.
pub(crate) async fn run_nearby(
    config: &AppConfig,
    snapshot: Option<&Path>,
    location: &LocationArgs,
    criteria: &CriteriaArgs,
    json: bool,
) -> anyhow::Result<()> {
    let facilities = load_facilities(config, snapshot).await?;
    let user = location.user_location()?;
    let criteria = criteria.to_criteria()?;
    if !criteria.sort_key.is_available(user.is_some()) {
        tracing::warn!("distance sort needs --lat and --lng; keeping feed order");
    }

    let view = evaluate(&facilities, user.as_ref(), &criteria);
    if json {
        println!("{}", serde_json::to_string_pretty(view.entries())?);
    } else {
        print!("{}", render_view(&view));
    }
    Ok(())
}

/// The view as a fixed-width table followed by a count line.
pub(crate) fn render_view(view: &DiscoveryView) -> String {
    let mut out = String::new();
    if view.is_empty() {
        let message = if view.is_empty_because_of_search() {
            "no facilities match your search"
        } else {
            "no facilities found"
        };
        let _ = writeln!(out, "{message}");
        return out;
    }

    let _ = writeln!(
        out,
        "{:<32}{:<8}{:<11}{:<28}ID",
        "NAME", "RATING", "DISTANCE", "AMENITIES"
    );
    for entry in view {
        let facility = &entry.facility;
        let name = if facility.name().chars().count() > 30 {
            format!("{}...", facility.name().chars().take(27).collect::<String>())
        } else {
            facility.name().to_string()
        };
        let distance = entry
            .distance_km
            .map_or_else(|| "-".to_string(), format_distance_km);
        let _ = writeln!(
            out,
            "{:<32}{:<8}{:<11}{:<28}{}",
            name,
            format!("{:.1}", facility.rating()),
            distance,
            amenity_tags(facility.amenities()),
            facility.id()
        );
    }
    let noun = if view.len() == 1 { "facility" } else { "facilities" };
    let _ = writeln!(out, "{} {noun} found", view.len());
    out
}

fn amenity_tags(amenities: Amenities) -> String {
    let tags: Vec<&str> = [
        (amenities.wheelchair_accessible, "wheelchair"),
        (amenities.has_changing_tables, "changing"),
        (amenities.gender_neutral, "all-gender"),
        (amenities.requires_key, "key"),
    ]
    .into_iter()
    .filter_map(|(present, tag)| present.then_some(tag))
    .collect();

    if tags.is_empty() {
        "-".to_string()
    } else {
        tags.join(",")
    }
}
