//! Geo math: great-circle distance and human-readable distance labels.

use serde::{Deserialize, Serialize};

use crate::spot::ParkingSpot;

/// Mean Earth radius in meters (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Query center used before the device reports its first real fix (Brooklyn, NY).
pub const DEFAULT_CENTER: Coordinate = Coordinate {
    latitude: 40.6935,
    longitude: -73.9859,
};

/// WGS84 coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Latitude within [-90, 90], longitude within [-180, 180], both finite.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Haversine distance between two coordinates, in meters.
pub fn distance(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // Clamp guards asin against h drifting past 1.0 for antipodal points.
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// "123 m" below one kilometer, "1.2 km" at or above.
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{:.0} m", meters)
    } else {
        format!("{:.1} km", meters / 1000.0)
    }
}

/// Spots ordered nearest-first from `origin`, each paired with its distance in meters.
/// Ties keep their input order.
pub fn rank_by_distance<'a>(
    spots: &'a [ParkingSpot],
    origin: Coordinate,
) -> Vec<(&'a ParkingSpot, f64)> {
    let mut ranked: Vec<(&ParkingSpot, f64)> = spots
        .iter()
        .map(|s| (s, distance(origin, s.location)))
        .collect();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    ranked
}
