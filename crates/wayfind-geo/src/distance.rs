//! Great-circle distance between two coordinates.

use wayfind_core::Coordinate;

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance in kilometres between `a` and `b`.
///
/// Arguments are ordered canonically before evaluation, so
/// `distance_km(a, b)` and `distance_km(b, a)` are bit-for-bit identical.
/// Returns exactly `0.0` when `a == b`.
#[must_use]
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let (from, to) = if (a.lat(), a.lng()) <= (b.lat(), b.lng()) {
        (a, b)
    } else {
        (b, a)
    };

    let phi1 = from.lat().to_radians();
    let phi2 = to.lat().to_radians();
    let delta_phi = (to.lat() - from.lat()).to_radians();
    let delta_lambda = (to.lng() - from.lng()).to_radians();

    let h = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    // Rounding can push h a hair above 1 for antipodal points.
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}
