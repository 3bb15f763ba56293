//! Great-circle distance used by the matching engine.

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance in kilometers between two coordinate pairs.
/// Symmetric, zero for identical points, finite for any finite input.
/// Coordinate range checks belong to callers.
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin() * (d_lat / 2.0).sin()
        + lat1.to_radians().cos() * lat2.to_radians().cos()
            * (d_lon / 2.0).sin() * (d_lon / 2.0).sin();

    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}
