use std::str::FromStr;

use crate::app_config::{AppConfig, Environment};
use crate::location::LongitudePolicy;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a variable holds an invalid value.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a variable holds an invalid value.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it with a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse = |var: &str, default: &str| -> Result<u64, ConfigError> {
        parse_var(var, &or_default(var, default))
    };

    let env = parse_environment(&or_default("WAYFIND_ENV", "development"))?;
    let log_level = or_default("WAYFIND_LOG_LEVEL", "info");

    let feed_url = lookup("WAYFIND_FEED_URL")
        .ok()
        .map(|url| url.trim().trim_end_matches('/').to_string())
        .filter(|url| !url.is_empty());
    if let Some(url) = &feed_url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidEnvVar {
                var: "WAYFIND_FEED_URL".to_string(),
                reason: format!("\"{url}\" is not an http(s) URL"),
            });
        }
    }
    let feed_collection = or_default("WAYFIND_FEED_COLLECTION", "bathrooms");

    let feed_poll_secs = parse("WAYFIND_FEED_POLL_SECS", "5")?;
    if feed_poll_secs == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "WAYFIND_FEED_POLL_SECS".to_string(),
            reason: "poll interval must be at least 1 second".to_string(),
        });
    }
    let feed_max_retries: u32 = parse_var(
        "WAYFIND_FEED_MAX_RETRIES",
        &or_default("WAYFIND_FEED_MAX_RETRIES", "3"),
    )?;
    let feed_retry_backoff_base_secs = parse("WAYFIND_FEED_RETRY_BACKOFF_BASE_SECS", "5")?;
    let request_timeout_secs = parse("WAYFIND_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("WAYFIND_USER_AGENT", "wayfind/0.1 (facility-discovery)");

    let geocoder_url = or_default("WAYFIND_GEOCODER_URL", "https://nominatim.openstreetmap.org")
        .trim()
        .trim_end_matches('/')
        .to_string();
    if !(geocoder_url.starts_with("http://") || geocoder_url.starts_with("https://")) {
        return Err(ConfigError::InvalidEnvVar {
            var: "WAYFIND_GEOCODER_URL".to_string(),
            reason: format!("\"{geocoder_url}\" is not an http(s) URL"),
        });
    }

    let location_timeout_secs = parse("WAYFIND_LOCATION_TIMEOUT_SECS", "10")?;
    let directions_wait_secs = parse("WAYFIND_DIRECTIONS_WAIT_SECS", "3")?;
    let selection_zoom: u8 = parse_var(
        "WAYFIND_SELECTION_ZOOM",
        &or_default("WAYFIND_SELECTION_ZOOM", "16"),
    )?;
    if selection_zoom > 22 {
        return Err(ConfigError::InvalidEnvVar {
            var: "WAYFIND_SELECTION_ZOOM".to_string(),
            reason: format!("zoom {selection_zoom} exceeds the maximum of 22"),
        });
    }

    let longitude_policy: LongitudePolicy = parse_var(
        "WAYFIND_LONGITUDE_POLICY",
        &or_default("WAYFIND_LONGITUDE_POLICY", "as_reported"),
    )?;

    Ok(AppConfig {
        env,
        log_level,
        feed_url,
        feed_collection,
        feed_poll_secs,
        feed_max_retries,
        feed_retry_backoff_base_secs,
        request_timeout_secs,
        user_agent,
        geocoder_url,
        location_timeout_secs,
        directions_wait_secs,
        selection_zoom,
        longitude_policy,
    })
}

fn parse_var<T>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "WAYFIND_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
