use serde::{Deserialize, Serialize};

/// A WGS84 position in decimal degrees.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// True if this position falls inside the national service area.
    ///
    /// Position-mutating surface commands treat coordinates outside this
    /// box as a no-op rather than an error.
    pub fn in_national_bounds(&self) -> bool {
        self.lat >= NATIONAL_SOUTH
            && self.lat <= NATIONAL_NORTH
            && self.lng >= NATIONAL_WEST
            && self.lng <= NATIONAL_EAST
    }
}

/// National service bounding box (South Korea, including Jeju and Dokdo).
pub const NATIONAL_SOUTH: f64 = 33.0;
pub const NATIONAL_NORTH: f64 = 38.7;
pub const NATIONAL_WEST: f64 = 124.5;
pub const NATIONAL_EAST: f64 = 131.9;

/// Arithmetic-mean centroid of a polygon outer ring.
///
/// Returns `None` for an empty ring. Good enough for placing an icon
/// marker inside an administrative boundary; not an area-weighted centroid.
pub fn ring_centroid(ring: &[LatLng]) -> Option<LatLng> {
    if ring.is_empty() {
        return None;
    }
    let n = ring.len() as f64;
    let (lat_sum, lng_sum) = ring
        .iter()
        .fold((0.0, 0.0), |(la, lo), p| (la + p.lat, lo + p.lng));
    Some(LatLng::new(lat_sum / n, lng_sum / n))
}
