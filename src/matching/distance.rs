// src/matching/distance.rs
//
// Great-circle distance between two points

use crate::config::EARTH_RADIUS_METERS;
use crate::error::Result;
use crate::models::GeoPoint;

/// Calculate the Haversine distance between two points in meters
pub fn distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1_rad = a.latitude.to_radians();
    let lat2_rad = b.latitude.to_radians();

    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);
    // Rounding can push h just past 1.0 for antipodal points
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Same as [`distance`], but validates both points first
pub fn checked_distance(a: GeoPoint, b: GeoPoint) -> Result<f64> {
    a.validate()?;
    b.validate()?;
    Ok(distance(a, b))
}
