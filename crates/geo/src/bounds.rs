use serde::{Deserialize, Serialize};

use crate::point::LatLng;

/// A visible map viewport in decimal degrees.
///
/// Invariant: `south <= north` and `west <= east`. The constructor
/// normalizes swapped corners so every constructed value satisfies it.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewportBounds {
    pub south: f64,
    pub north: f64,
    pub west: f64,
    pub east: f64,
}

impl ViewportBounds {
    pub fn new(south: f64, north: f64, west: f64, east: f64) -> Self {
        let (south, north) = if south <= north {
            (south, north)
        } else {
            (north, south)
        };
        let (west, east) = if west <= east {
            (west, east)
        } else {
            (east, west)
        };
        Self {
            south,
            north,
            west,
            east,
        }
    }

    pub fn from_corners(a: LatLng, b: LatLng) -> Self {
        Self::new(a.lat, b.lat, a.lng, b.lng)
    }

    /// A viewport spanning `radius_deg` degrees in each direction from `center`.
    pub fn around(center: LatLng, radius_deg: f64) -> Self {
        let r = radius_deg.abs();
        Self::new(
            center.lat - r,
            center.lat + r,
            center.lng - r,
            center.lng + r,
        )
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }

    pub fn contains(&self, p: LatLng) -> bool {
        p.lat >= self.south && p.lat <= self.north && p.lng >= self.west && p.lng <= self.east
    }

    /// Smallest viewport containing both `self` and `p`.
    pub fn extended_to(&self, p: LatLng) -> Self {
        Self::new(
            self.south.min(p.lat),
            self.north.max(p.lat),
            self.west.min(p.lng),
            self.east.max(p.lng),
        )
    }

    /// Smallest viewport containing every point, or `None` if empty.
    pub fn enclosing(points: &[LatLng]) -> Option<Self> {
        let first = points.first()?;
        let mut out = Self::new(first.lat, first.lat, first.lng, first.lng);
        for p in &points[1..] {
            out = out.extended_to(*p);
        }
        Some(out)
    }

    pub fn is_well_formed(&self) -> bool {
        self.south <= self.north && self.west <= self.east
    }
}

#[cfg(test)]
mod tests {
    use super::ViewportBounds;
    use crate::point::LatLng;

    #[test]
    fn swapped_corners_are_normalized() {
        let b = ViewportBounds::new(35.2, 35.0, 129.1, 128.8);
        assert!(b.is_well_formed());
        assert_eq!(b.south, 35.0);
        assert_eq!(b.north, 35.2);
        assert_eq!(b.west, 128.8);
        assert_eq!(b.east, 129.1);
    }

    #[test]
    fn contains_and_center() {
        let b = ViewportBounds::new(35.0, 35.2, 128.8, 129.0);
        assert!(b.contains(LatLng::new(35.1, 128.9)));
        assert!(!b.contains(LatLng::new(34.9, 128.9)));
        let c = b.center();
        assert!((c.lat - 35.1).abs() < 1e-12);
        assert!((c.lng - 128.9).abs() < 1e-12);
    }

    #[test]
    fn enclosing_covers_all_points() {
        let pts = vec![
            LatLng::new(35.23, 128.88),
            LatLng::new(35.10, 129.04),
            LatLng::new(35.30, 128.95),
        ];
        let b = ViewportBounds::enclosing(&pts).expect("non-empty");
        for p in &pts {
            assert!(b.contains(*p));
        }
        assert!(ViewportBounds::enclosing(&[]).is_none());
    }
}
