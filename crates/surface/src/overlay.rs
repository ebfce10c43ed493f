use geo::{LatLng, ring_centroid};
use protocol::{DisasterNotice, RouteResult, ShelterMarker};

/// A shelter marker entity in the overlay arena.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerEntry {
    pub marker: ShelterMarker,
    pub visible: bool,
    pub popup_open: bool,
    /// Forced top of the z-order while pinned.
    pub top_most: bool,
}

impl MarkerEntry {
    pub fn new(marker: ShelterMarker) -> Self {
        Self {
            marker,
            visible: false,
            popup_open: false,
            top_most: false,
        }
    }

    pub fn position(&self) -> LatLng {
        self.marker.position()
    }
}

/// Disaster styling for one administrative polygon.
///
/// `Alerted` carries the notice plus the centroid where the disaster-type
/// icon marker sits. At most one notice per polygon; updates replace, never
/// merge.
#[derive(Debug, Clone, PartialEq)]
pub enum PolygonStyle {
    Neutral,
    Alerted {
        notice: DisasterNotice,
        icon_at: LatLng,
    },
}

/// An administrative-boundary polygon entity.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonEntry {
    pub region_name: String,
    /// Outer ring vertices.
    pub ring: Vec<LatLng>,
    pub style: PolygonStyle,
}

impl PolygonEntry {
    pub fn new(region_name: impl Into<String>, ring: Vec<LatLng>) -> Self {
        Self {
            region_name: region_name.into(),
            ring,
            style: PolygonStyle::Neutral,
        }
    }

    pub fn is_alerted(&self) -> bool {
        matches!(self.style, PolygonStyle::Alerted { .. })
    }

    /// Recolor to the notice's severity color and place the icon at the
    /// ring centroid. A degenerate empty ring stays neutral.
    pub fn set_alerted(&mut self, notice: DisasterNotice) {
        match ring_centroid(&self.ring) {
            Some(icon_at) => self.style = PolygonStyle::Alerted { notice, icon_at },
            None => self.style = PolygonStyle::Neutral,
        }
    }

    pub fn reset_neutral(&mut self) {
        self.style = PolygonStyle::Neutral;
    }
}

/// The drawn route polyline while the surface is in the Routed state.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteOverlay {
    pub route: RouteResult,
}

impl RouteOverlay {
    pub fn new(route: RouteResult) -> Self {
        Self { route }
    }

    pub fn path(&self) -> &[LatLng] {
        &self.route.path
    }
}

#[cfg(test)]
mod tests {
    use super::{PolygonEntry, PolygonStyle};
    use geo::LatLng;
    use protocol::DisasterNotice;

    fn notice() -> DisasterNotice {
        DisasterNotice {
            disaster_type: "호우".to_string(),
            severity_color: "#ff6b00".to_string(),
        }
    }

    #[test]
    fn alert_places_icon_at_centroid() {
        let mut poly = PolygonEntry::new(
            "김해",
            vec![
                LatLng::new(35.0, 128.0),
                LatLng::new(35.0, 129.0),
                LatLng::new(36.0, 129.0),
                LatLng::new(36.0, 128.0),
            ],
        );
        poly.set_alerted(notice());
        let PolygonStyle::Alerted { icon_at, .. } = poly.style else {
            panic!("expected alerted");
        };
        assert!((icon_at.lat - 35.5).abs() < 1e-12);
        assert!((icon_at.lng - 128.5).abs() < 1e-12);

        poly.reset_neutral();
        assert!(!poly.is_alerted());
    }

    #[test]
    fn empty_ring_cannot_be_alerted() {
        let mut poly = PolygonEntry::new("빈구역", vec![]);
        poly.set_alerted(notice());
        assert!(!poly.is_alerted());
    }
}
