//! Display helpers for distances.

/// Kilometres with two decimals, e.g. `"1.23km"`.
#[must_use]
pub fn format_distance_km(km: f64) -> String {
    format!("{km:.2}km")
}

/// Whole metres, rounded, for the walking-distance line of the directions
/// panel.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn walking_distance_m(km: f64) -> u64 {
    if !km.is_finite() || km <= 0.0 {
        return 0;
    }
    (km * 1000.0).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kilometres_have_two_decimals() {
        assert_eq!(format_distance_km(1.234_56), "1.23km");
        assert_eq!(format_distance_km(0.0), "0.00km");
        assert_eq!(format_distance_km(12.0), "12.00km");
    }

    #[test]
    fn walking_distance_rounds_to_metres() {
        assert_eq!(walking_distance_m(0.1114), 111);
        assert_eq!(walking_distance_m(1.5), 1500);
        assert_eq!(walking_distance_m(0.0), 0);
        assert_eq!(walking_distance_m(f64::NAN), 0);
    }
}
