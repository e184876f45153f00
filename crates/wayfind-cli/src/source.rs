//! Where one-shot commands get their facilities from.

use std::path::Path;

use anyhow::Context;
use wayfind_core::{AppConfig, Facility};
use wayfind_feed::{normalize_snapshot, HttpFeed, HttpFeedConfig, RawSnapshot};

/// Facilities from a snapshot file, or from a single fetch of the
/// configured feed when no file is given.
pub(crate) async fn load_facilities(
    config: &AppConfig,
    snapshot: Option<&Path>,
) -> anyhow::Result<Vec<Facility>> {
    let raw = match snapshot {
        Some(path) => {
            let body = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading snapshot {}", path.display()))?;
            parse_snapshot(&body).with_context(|| format!("parsing snapshot {}", path.display()))?
        }
        None => {
            let feed = HttpFeed::new(&feed_config(config)?)?;
            let body = feed.fetch().await?;
            parse_snapshot(&body).context("parsing feed response")?
        }
    };
    Ok(normalize_snapshot(&raw, config.longitude_policy))
}

pub(crate) fn feed_config(config: &AppConfig) -> anyhow::Result<HttpFeedConfig> {
    HttpFeedConfig::from_app_config(config)
        .context("no feed configured; set WAYFIND_FEED_URL")
}

pub(crate) fn parse_snapshot(body: &str) -> anyhow::Result<RawSnapshot> {
    let payload: serde_json::Value = serde_json::from_str(body)?;
    Ok(RawSnapshot::from_json(payload)?)
}
