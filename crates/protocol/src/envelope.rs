use geo::ViewportBounds;
use serde::{Deserialize, Serialize};

use crate::types::{DisasterPayload, MapTheme, RouteResult, ShelterMarker};

/// Correlation id for the few commands that expect a reply.
pub type MessageId = String;

/// Command envelope, host → surface.
///
/// Tag values match the wire protocol the embedded surface speaks: commands
/// use camelCase tags, except `get_viewport_bounds` which predates that
/// convention and is kept verbatim for compatibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SurfaceCommand {
    /// Move the location marker; optionally change zoom.
    UpdateLocation {
        lat: f64,
        lng: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        zoom: Option<u8>,
    },

    /// Recenter only; marker and zoom untouched.
    MoveToLocation { lat: f64, lng: f64 },

    /// Recenter and zoom; marks the move as user-driven.
    MoveAndZoom { lat: f64, lng: f64, zoom: u8 },

    /// Step zoom in by one level, clamped.
    ZoomIn,

    /// Step zoom out by one level, clamped.
    ZoomOut,

    /// Full replace of the shelter marker set.
    UpdateShelters { shelters: Vec<ShelterMarker> },

    /// Show or hide all shelter markers.
    ToggleShelters { show: bool },

    /// Enter the Routed state with the given route.
    #[serde(rename_all = "camelCase")]
    DrawRoute { route_data: RouteResult },

    /// Exit the Routed state.
    ClearRoute,

    /// Full-replace polygon disaster styling.
    UpdateDisasterMap { payload: DisasterPayload },

    /// Show all administrative boundary polygons.
    ToggleBoundaries,

    /// Hide all administrative boundary polygons.
    HideBoundaries,

    /// Switch the base-map theme. One-way, no acknowledgment.
    ChangeTheme { theme: MapTheme },

    /// Request the current visible bounds; replied to with
    /// `SurfaceEvent::ViewportBoundsResponse` carrying the same id.
    #[serde(rename = "get_viewport_bounds", rename_all = "camelCase")]
    GetViewportBounds { message_id: MessageId },
}

/// Event envelope, surface → host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SurfaceEvent {
    /// The embedded script context is alive and listening.
    SurfaceReady,

    /// The map library finished initializing; overlay commands are safe.
    MapReady,

    /// Unsolicited, on idle after a move/zoom. Suppressed while a marker
    /// popup is open.
    ViewportChanged { bounds: ViewportBounds },

    /// Reply to `SurfaceCommand::GetViewportBounds`.
    #[serde(rename_all = "camelCase")]
    ViewportBoundsResponse {
        message_id: MessageId,
        bounds: ViewportBounds,
    },

    /// The user asked for directions to a marker.
    #[serde(rename_all = "camelCase")]
    RequestRoute {
        goal_lat: f64,
        goal_lng: f64,
        goal_name: String,
    },

    /// The user tapped an alerted polygon.
    #[serde(rename_all = "camelCase")]
    DisasterMarkerClicked { region_name: String, detail: String },

    /// A marker popup opened; viewport events are suppressed until a
    /// manual move.
    UserInteractionStart,

    /// The user dragged/touched the map; popups close and viewport
    /// reporting resumes.
    MapManualMove,
}

/// Envelope (de)serialization failure.
///
/// Both ends treat this as log-and-drop, never fatal: an unparseable or
/// unknown-`type` envelope is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    Malformed(String),
    Encode(String),
}

impl std::fmt::Display for EnvelopeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnvelopeError::Malformed(msg) => write!(f, "malformed envelope: {msg}"),
            EnvelopeError::Encode(msg) => write!(f, "envelope encode failed: {msg}"),
        }
    }
}

impl std::error::Error for EnvelopeError {}

pub fn encode_command(cmd: &SurfaceCommand) -> Result<String, EnvelopeError> {
    serde_json::to_string(cmd).map_err(|e| EnvelopeError::Encode(e.to_string()))
}

pub fn decode_command(raw: &str) -> Result<SurfaceCommand, EnvelopeError> {
    serde_json::from_str(raw).map_err(|e| EnvelopeError::Malformed(e.to_string()))
}

pub fn encode_event(event: &SurfaceEvent) -> Result<String, EnvelopeError> {
    serde_json::to_string(event).map_err(|e| EnvelopeError::Encode(e.to_string()))
}

pub fn decode_event(raw: &str) -> Result<SurfaceEvent, EnvelopeError> {
    serde_json::from_str(raw).map_err(|e| EnvelopeError::Malformed(e.to_string()))
}
