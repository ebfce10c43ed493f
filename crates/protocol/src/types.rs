use std::collections::BTreeMap;

use geo::LatLng;
use serde::{Deserialize, Serialize};

/// A shelter rendered as a map marker.
///
/// `id` is the stable identity key the surface uses for upserts and for the
/// pinned-marker override; see [`shelter_id`] for how it is derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShelterMarker {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub lat: f64,
    pub lng: f64,
}

impl ShelterMarker {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

/// Derive a stable shelter identity from the best available natural key.
///
/// Falls back to a `lat_lng` composite when the source record carries no
/// usable key of its own.
pub fn shelter_id(natural_key: Option<&str>, lat: f64, lng: f64) -> String {
    match natural_key {
        Some(key) if !key.trim().is_empty() => key.trim().to_string(),
        _ => format!("{lat}_{lng}"),
    }
}

/// A computed route from the external routing collaborator.
///
/// The bridge only draws and clears this; it never computes routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResult {
    /// Ordered path points from origin to goal.
    pub path: Vec<LatLng>,
    pub summary: RouteSummary,
    /// Shelter id of the goal; becomes the pinned marker while routed.
    #[serde(rename = "goalShelterId")]
    pub goal_shelter_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    /// Total distance in meters.
    pub distance: f64,
    /// Total duration in seconds.
    pub duration: f64,
    /// Toll fare in won; zero when toll-free.
    pub toll: u64,
}

/// Base-map rendering theme.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapTheme {
    Light,
    Dark,
}

impl Default for MapTheme {
    fn default() -> Self {
        MapTheme::Light
    }
}

/// Disaster annotation for one administrative region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisasterNotice {
    #[serde(rename = "type")]
    pub disaster_type: String,
    #[serde(rename = "severityColor")]
    pub severity_color: String,
}

/// Full-replace disaster payload, keyed by administrative region name.
///
/// Keyed in a `BTreeMap` for stable traversal order; at most one active
/// notice per region, overwritten wholesale on each update.
pub type DisasterPayload = BTreeMap<String, DisasterNotice>;

#[cfg(test)]
mod tests {
    use super::{DisasterNotice, DisasterPayload, shelter_id};

    #[test]
    fn shelter_id_prefers_natural_key() {
        assert_eq!(shelter_id(Some("S-1041"), 35.23, 128.88), "S-1041");
        assert_eq!(shelter_id(Some("  S-1041 "), 35.23, 128.88), "S-1041");
    }

    #[test]
    fn shelter_id_falls_back_to_composite() {
        assert_eq!(shelter_id(None, 35.23, 128.88), "35.23_128.88");
        assert_eq!(shelter_id(Some("   "), 35.23, 128.88), "35.23_128.88");
    }

    #[test]
    fn disaster_payload_serializes_region_keys_verbatim() {
        let mut payload = DisasterPayload::new();
        payload.insert(
            "김해".to_string(),
            DisasterNotice {
                disaster_type: "호우".to_string(),
                severity_color: "#ff6b00".to_string(),
            },
        );
        let text = serde_json::to_string(&payload).expect("serialize");
        assert!(text.contains("김해"));
        assert!(text.contains("호우"));
    }
}
