use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::watch;
use wayfind_core::{AppConfig, FacilityId};
use wayfind_discovery::{
    DirectionLinks, Directions, DirectionsError, MapProvider, Platform, SelectionCoordinator,
};
use wayfind_geo::LocationState;

use crate::args::LocationArgs;
use crate::source::load_facilities;

const PROVIDERS: [(MapProvider, &str); 5] = [
    (MapProvider::Google, "google"),
    (MapProvider::Apple, "apple"),
    (MapProvider::Waze, "waze"),
    (MapProvider::Here, "here"),
    (MapProvider::Browser, "browser"),
];

/// Print walking-direction links to one facility.
///
/// Without `--lat`/`--lng` this waits the configured bound for a fix that
/// never arrives and then reports that location is unavailable.
///
/// # Errors
///
/// Returns an error if the facility is unknown, no location is available,
/// or the snapshot cannot be loaded.
pub(crate) async fn run_directions(
    config: &AppConfig,
    snapshot: Option<&Path>,
    id: &str,
    location: &LocationArgs,
    user_agent: Option<&str>,
    standalone: bool,
) -> anyhow::Result<()> {
    let facilities = load_facilities(config, snapshot).await?;
    let mut coordinator = SelectionCoordinator::new(Vec::new(), config.selection_zoom);
    coordinator.set_facilities(Arc::new(facilities));

    let (_location_tx, location_rx) = watch::channel(LocationState {
        last_known: location.user_location()?,
        fault: None,
    });
    let platform = user_agent.map_or(Platform::Desktop, Platform::detect);
    let directions =
        Directions::from_app_config(location_rx, config).with_platform(platform, standalone);

    let facility_id = FacilityId::new(id);
    let links = coordinator
        .request_directions(&facility_id, &directions)
        .await
        .map_err(|e| match e {
            DirectionsError::UnknownFacility(id) => {
                anyhow::anyhow!("facility '{id}' not found; list ids with `wayfind nearby`")
            }
            DirectionsError::LocationUnavailable { .. } => anyhow::anyhow!(e.user_message()),
        })?;

    let name = coordinator
        .facility(&facility_id)
        .map_or(id, |facility| facility.name());
    print!("{}", render_links(name, &links));
    Ok(())
}

/// One line per provider, the platform's preferred link marked with `*`.
pub(crate) fn render_links(name: &str, links: &DirectionLinks) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Directions to {name} ({} m walk)", links.walking_distance_m);
    let _ = writeln!(out);
    let _ = writeln!(out, "{:<10}URL", "PROVIDER");
    for (provider, label) in PROVIDERS {
        let marker = if provider == links.primary { "*" } else { "" };
        let _ = writeln!(out, "{:<10}{}", format!("{label}{marker}"), links.url(provider));
    }
    out
}
