//! Great-circle distance

use super::model::GeoPoint;

/// Mean Earth radius used by the haversine formula
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance in kilometres between two coordinates given in degrees.
///
/// Symmetric in its two points. Non-finite input yields a non-finite result
/// rather than an error, so callers check for missing coordinates first.
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    // abs() keeps the result bit-identical when the points are swapped
    let d_lat = (lat2 - lat1).abs().to_radians();
    let d_lon = (lon2 - lon1).abs().to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);

    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

impl GeoPoint {
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        distance_km(self.lat, self.lon, other.lat, other.lon)
    }
}

/// Exponential proximity decay `e^(-rate * d)`
pub fn proximity_decay(distance_km: f64, rate_per_km: f64) -> f64 {
    (-rate_per_km * distance_km).exp()
}
