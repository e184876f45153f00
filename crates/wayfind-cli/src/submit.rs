//! The write path: single submissions and bulk imports.

use std::path::Path;

use anyhow::Context;
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use wayfind_core::{Amenities, AppConfig, Coordinate};
use wayfind_feed::{
    FacilityWriter, Geocoder, GeocoderConfig, HttpWriter, NewFacility, DEFAULT_HOURS,
};

use crate::source::feed_config;

/// One facility as typed on the command line or listed in an import file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct Submission {
    pub(crate) name: String,
    pub(crate) description: String,
    #[serde(default)]
    pub(crate) lat: Option<f64>,
    #[serde(default)]
    pub(crate) lng: Option<f64>,
    #[serde(default)]
    pub(crate) address: Option<String>,
    #[serde(default = "default_rating")]
    pub(crate) rating: u8,
    #[serde(default = "default_hours")]
    pub(crate) hours_of_operation: String,
    #[serde(default)]
    pub(crate) amenities: Amenities,
}

fn default_rating() -> u8 {
    5
}

fn default_hours() -> String {
    DEFAULT_HOURS.to_string()
}

impl Submission {
    /// Validate locally so bad input never reaches the feed.
    pub(crate) fn into_new_facility(self) -> anyhow::Result<NewFacility> {
        let (Some(lat), Some(lng)) = (self.lat, self.lng) else {
            anyhow::bail!("\"{}\" needs both lat and lng", self.name.trim());
        };
        let location = Coordinate::new(lat, lng)?;
        let facility = NewFacility {
            name: self.name,
            description: self.description,
            location,
            address: self.address.filter(|a| !a.trim().is_empty()),
            rating: self.rating,
            amenities: self.amenities,
            hours_of_operation: self.hours_of_operation,
        };
        facility.validate()?;
        Ok(facility)
    }
}

/// Fill in missing coordinates by looking up the submission's address.
/// Submissions that already have coordinates, or have no address, are left
/// alone.
///
/// # Errors
///
/// Returns an error if the lookup fails or finds nothing.
pub(crate) async fn locate(config: &AppConfig, submission: &mut Submission) -> anyhow::Result<()> {
    if submission.lat.is_some() && submission.lng.is_some() {
        return Ok(());
    }
    let Some(address) = submission
        .address
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
    else {
        return Ok(());
    };

    let geocoder = Geocoder::new(&GeocoderConfig::from_app_config(config))?;
    let found = geocoder
        .lookup(&address)
        .await
        .with_context(|| format!("looking up \"{address}\""))?
        .with_context(|| format!("no location found for \"{address}\"; pass --lat and --lng"))?;
    tracing::info!(
        address = %address,
        matched = %found.display_name,
        lat = found.location.lat(),
        lng = found.location.lng(),
        "address geocoded"
    );
    submission.lat = Some(found.location.lat());
    submission.lng = Some(found.location.lng());
    Ok(())
}

/// Submit one facility and print the id it was stored under.
///
/// # Errors
///
/// Returns an error if the submission is invalid, its address cannot be
/// located, no feed is configured, or the feed rejects the write.
pub(crate) async fn run_add(config: &AppConfig, mut submission: Submission) -> anyhow::Result<()> {
    locate(config, &mut submission).await?;
    let facility = submission.into_new_facility()?;
    let writer = HttpWriter::new(&feed_config(config)?)?;
    let name = facility.name.clone();
    let id = writer.append(facility).await?;
    println!("added \"{name}\" as {id}");
    Ok(())
}

/// Submit every facility in a JSON array file, `concurrency` at a time.
///
/// Invalid entries are skipped with a warning; the rest are still sent.
/// Entries are not geocoded, so each needs its own `lat` and `lng`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or no feed is
/// configured.
pub(crate) async fn run_import(
    config: &AppConfig,
    file: &Path,
    concurrency: usize,
) -> anyhow::Result<()> {
    let body = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;
    let submissions = parse_submissions(&body)
        .with_context(|| format!("parsing {}", file.display()))?;
    let total = submissions.len();
    if total == 0 {
        println!("no facilities to import");
        return Ok(());
    }

    let mut valid = Vec::with_capacity(total);
    for (index, submission) in submissions.into_iter().enumerate() {
        match submission.into_new_facility() {
            Ok(facility) => valid.push((index, facility)),
            Err(e) => tracing::warn!(index, error = %e, "skipping invalid submission"),
        }
    }
    let skipped = total - valid.len();

    let writer = HttpWriter::new(&feed_config(config)?)?;
    let results = stream::iter(valid.into_iter().map(|(index, facility)| {
        let writer = &writer;
        async move {
            let name = facility.name.clone();
            (index, name, writer.append(facility).await)
        }
    }))
    .buffer_unordered(concurrency.max(1))
    .collect::<Vec<_>>()
    .await;

    let mut added = 0usize;
    let mut failed = 0usize;
    for (index, name, result) in results {
        match result {
            Ok(id) => {
                added += 1;
                tracing::debug!(index, facility_id = %id, name = %name, "facility added");
            }
            Err(e) => {
                failed += 1;
                tracing::warn!(index, name = %name, error = %e, "facility import failed");
            }
        }
    }

    println!("imported {added} of {total} facilities ({skipped} invalid, {failed} failed)");
    Ok(())
}

pub(crate) fn parse_submissions(body: &str) -> anyhow::Result<Vec<Submission>> {
    Ok(serde_json::from_str(body)?)
}
