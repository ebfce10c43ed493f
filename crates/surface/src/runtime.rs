use std::collections::BTreeMap;

use geo::{
    DEFAULT_ZOOM, LatLng, MIN_MARKER_ZOOM, NATIONAL_EAST, NATIONAL_NORTH, NATIONAL_SOUTH,
    NATIONAL_WEST, ViewportBounds, Zoom,
};
use protocol::{DisasterPayload, MapTheme, RouteResult, SurfaceCommand, SurfaceEvent};
use tracing::{debug, warn};

use crate::init::InitState;
use crate::overlay::{MarkerEntry, PolygonEntry, RouteOverlay};
use crate::viewport::Camera;

/// The rendering surface's live state and reducer.
///
/// Sole owner of the overlay arena: the host only ever supplies input
/// lists and reads events. Every mutation goes through [`apply`] (inbound
/// commands) or a gesture method (user input), each returning the events
/// to emit back over the bridge.
///
/// Ordering contract:
/// - Events are returned in emission order and must be sent in that order.
/// - Marker and polygon iteration is keyed in `BTreeMap`s for stable
///   traversal.
///
/// [`apply`]: SurfaceRuntime::apply
#[derive(Debug)]
pub struct SurfaceRuntime {
    init: InitState,
    camera: Camera,
    location: Option<LatLng>,
    markers: BTreeMap<String, MarkerEntry>,
    polygons: BTreeMap<String, PolygonEntry>,
    polygons_loaded: bool,
    /// Disaster payload that arrived before polygons finished loading;
    /// last-cached-wins, applied once on load.
    cached_disaster: Option<DisasterPayload>,
    route: Option<RouteOverlay>,
    /// At most one pinned shelter at a time, set while a route to it is
    /// displayed.
    pinned: Option<String>,
    shelters_shown: bool,
    boundaries_shown: bool,
    theme: MapTheme,
    /// Marker whose popup is open. While set, outbound viewport-change
    /// events are suppressed.
    selected: Option<String>,
}

impl SurfaceRuntime {
    pub fn new() -> Self {
        let center = LatLng::new(
            (NATIONAL_SOUTH + NATIONAL_NORTH) / 2.0,
            (NATIONAL_WEST + NATIONAL_EAST) / 2.0,
        );
        Self {
            init: InitState::new(),
            camera: Camera::new(center, Zoom::new(7)),
            location: None,
            markers: BTreeMap::new(),
            polygons: BTreeMap::new(),
            polygons_loaded: false,
            cached_disaster: None,
            route: None,
            pinned: None,
            shelters_shown: true,
            boundaries_shown: true,
            theme: MapTheme::default(),
            selected: None,
        }
    }

    /// The script context is alive and listening; emitted once on attach,
    /// before the map library itself is ready.
    pub fn attach(&self) -> SurfaceEvent {
        SurfaceEvent::SurfaceReady
    }

    /// One initialization retry tick; emits `MapReady` on the tick that
    /// brings the map library up.
    pub fn tick_init(&mut self, library_available: bool) -> Option<SurfaceEvent> {
        if self.init.tick(library_available) {
            Some(SurfaceEvent::MapReady)
        } else {
            None
        }
    }

    pub fn is_ready(&self) -> bool {
        self.init.is_ready()
    }

    pub fn camera(&self) -> Camera {
        self.camera
    }

    pub fn location(&self) -> Option<LatLng> {
        self.location
    }

    pub fn marker(&self, id: &str) -> Option<&MarkerEntry> {
        self.markers.get(id)
    }

    pub fn polygon(&self, region_name: &str) -> Option<&PolygonEntry> {
        self.polygons.get(region_name)
    }

    pub fn route(&self) -> Option<&RouteOverlay> {
        self.route.as_ref()
    }

    pub fn pinned(&self) -> Option<&str> {
        self.pinned.as_deref()
    }

    pub fn boundaries_shown(&self) -> bool {
        self.boundaries_shown
    }

    pub fn theme(&self) -> MapTheme {
        self.theme
    }

    /// Install the administrative boundary polygons once their geometry
    /// finishes loading, then apply any disaster payload cached while
    /// they were absent.
    pub fn install_polygons(&mut self, polygons: Vec<PolygonEntry>) {
        self.polygons = polygons
            .into_iter()
            .map(|p| (p.region_name.clone(), p))
            .collect();
        self.polygons_loaded = true;
        if let Some(payload) = self.cached_disaster.take() {
            self.apply_disaster(payload);
        }
    }

    /// Reduce one inbound command, returning the events to emit.
    ///
    /// Commands arriving before the map library is ready are dropped, per
    /// the silent-loss contract of the bridge.
    pub fn apply(&mut self, command: SurfaceCommand) -> Vec<SurfaceEvent> {
        if !self.init.is_ready() {
            debug!(?command, "surface not ready; command dropped");
            return Vec::new();
        }

        match command {
            SurfaceCommand::UpdateLocation { lat, lng, zoom } => {
                self.update_location(LatLng::new(lat, lng), zoom.map(Zoom::new))
            }
            SurfaceCommand::MoveToLocation { lat, lng } => {
                self.move_camera(LatLng::new(lat, lng), None, false)
            }
            SurfaceCommand::MoveAndZoom { lat, lng, zoom } => {
                self.move_camera(LatLng::new(lat, lng), Some(Zoom::new(zoom)), true)
            }
            SurfaceCommand::ZoomIn => self.set_zoom(self.camera.zoom.step_in()),
            SurfaceCommand::ZoomOut => self.set_zoom(self.camera.zoom.step_out()),
            SurfaceCommand::UpdateShelters { shelters } => {
                self.replace_shelters(shelters);
                Vec::new()
            }
            SurfaceCommand::ToggleShelters { show } => {
                self.shelters_shown = show;
                self.recompute_marker_visibility();
                Vec::new()
            }
            SurfaceCommand::DrawRoute { route_data } => self.draw_route(route_data),
            SurfaceCommand::ClearRoute => {
                self.route = None;
                self.pinned = None;
                self.recompute_marker_visibility();
                Vec::new()
            }
            SurfaceCommand::UpdateDisasterMap { payload } => {
                if self.polygons_loaded {
                    self.apply_disaster(payload);
                } else {
                    debug!("polygons not loaded; disaster payload cached");
                    self.cached_disaster = Some(payload);
                }
                Vec::new()
            }
            SurfaceCommand::ToggleBoundaries => {
                self.boundaries_shown = !self.boundaries_shown;
                Vec::new()
            }
            SurfaceCommand::HideBoundaries => {
                self.boundaries_shown = false;
                Vec::new()
            }
            SurfaceCommand::ChangeTheme { theme } => {
                self.theme = theme;
                Vec::new()
            }
            SurfaceCommand::GetViewportBounds { message_id } => {
                // Solicited: replied to even while a popup suppresses
                // unsolicited viewport events.
                vec![SurfaceEvent::ViewportBoundsResponse {
                    message_id,
                    bounds: self.camera.visible_bounds(),
                }]
            }
        }
    }

    // --- user gestures -----------------------------------------------------

    /// User drag/touch: closes popups, clears the suppression flag, and
    /// resumes viewport reporting.
    pub fn drag_by(&mut self, dlat: f64, dlng: f64) -> Vec<SurfaceEvent> {
        if !self.init.is_ready() {
            return Vec::new();
        }
        self.selected = None;
        for entry in self.markers.values_mut() {
            entry.popup_open = false;
        }
        self.camera.center = LatLng::new(
            self.camera.center.lat + dlat,
            self.camera.center.lng + dlng,
        );
        vec![
            SurfaceEvent::MapManualMove,
            SurfaceEvent::ViewportChanged {
                bounds: self.camera.visible_bounds(),
            },
        ]
    }

    /// Tap on a visible marker: opens its popup, recenters to show it
    /// (that recenter is not reported), and starts the suppression window.
    pub fn tap_marker(&mut self, id: &str) -> Vec<SurfaceEvent> {
        if !self.init.is_ready() {
            return Vec::new();
        }
        let Some(position) = self
            .markers
            .get(id)
            .filter(|e| e.visible)
            .map(|e| e.position())
        else {
            return Vec::new();
        };
        for (marker_id, entry) in self.markers.iter_mut() {
            entry.popup_open = marker_id == id;
        }
        self.selected = Some(id.to_string());
        self.camera.center = position;
        vec![SurfaceEvent::UserInteractionStart]
    }

    /// The "directions" action in the open popup.
    pub fn request_route_for_selected(&mut self) -> Vec<SurfaceEvent> {
        let Some(entry) = self.selected.as_ref().and_then(|id| self.markers.get(id)) else {
            return Vec::new();
        };
        vec![SurfaceEvent::RequestRoute {
            goal_lat: entry.marker.lat,
            goal_lng: entry.marker.lng,
            goal_name: entry.marker.name.clone(),
        }]
    }

    /// Tap on an alerted polygon's icon marker.
    pub fn tap_alerted_region(&self, region_name: &str) -> Vec<SurfaceEvent> {
        let Some(entry) = self.polygons.get(region_name).filter(|p| p.is_alerted()) else {
            return Vec::new();
        };
        let crate::overlay::PolygonStyle::Alerted { notice, .. } = &entry.style else {
            return Vec::new();
        };
        vec![SurfaceEvent::DisasterMarkerClicked {
            region_name: region_name.to_string(),
            detail: notice.disaster_type.clone(),
        }]
    }

    // --- reducers ----------------------------------------------------------

    fn update_location(&mut self, position: LatLng, zoom: Option<Zoom>) -> Vec<SurfaceEvent> {
        if !position.in_national_bounds() {
            warn!(
                lat = position.lat,
                lng = position.lng,
                "location outside national bounds; command ignored"
            );
            return Vec::new();
        }
        let before = self.camera;
        let first_fix = self.location.is_none();
        self.location = Some(position);
        match zoom {
            Some(zoom) => self.camera.zoom = zoom,
            // The first fix zooms to a useful street-level view.
            None if first_fix => self.camera.zoom = DEFAULT_ZOOM,
            None => {}
        }
        // Passive recentring is suppressed while a route is displayed so
        // ambient location updates don't disturb the route view.
        if self.route.is_none() {
            self.camera.center = position;
        }
        self.recompute_marker_visibility();
        self.idle_events_if_moved(before)
    }

    fn move_camera(
        &mut self,
        center: LatLng,
        zoom: Option<Zoom>,
        user_driven: bool,
    ) -> Vec<SurfaceEvent> {
        if !center.in_national_bounds() {
            warn!(
                lat = center.lat,
                lng = center.lng,
                "move target outside national bounds; command ignored"
            );
            return Vec::new();
        }
        let before = self.camera;
        self.camera.center = center;
        if let Some(zoom) = zoom {
            self.camera.zoom = zoom;
            self.recompute_marker_visibility();
        }
        if user_driven {
            // A user-driven move ends the popup interaction: the selected
            // flag clears and viewport reporting resumes.
            self.selected = None;
            for entry in self.markers.values_mut() {
                entry.popup_open = false;
            }
            vec![SurfaceEvent::ViewportChanged {
                bounds: self.camera.visible_bounds(),
            }]
        } else {
            self.idle_events_if_moved(before)
        }
    }

    fn set_zoom(&mut self, zoom: Zoom) -> Vec<SurfaceEvent> {
        let before = self.camera;
        self.camera.zoom = zoom;
        self.recompute_marker_visibility();
        self.idle_events_if_moved(before)
    }

    fn replace_shelters(&mut self, shelters: Vec<protocol::ShelterMarker>) {
        self.markers = shelters
            .into_iter()
            .map(|m| (m.id.clone(), MarkerEntry::new(m)))
            .collect();
        // Full replace closes every popup; clear a dangling selection.
        if self
            .selected
            .as_ref()
            .is_some_and(|id| !self.markers.contains_key(id))
        {
            self.selected = None;
        }
        self.recompute_marker_visibility();
    }

    fn draw_route(&mut self, route: RouteResult) -> Vec<SurfaceEvent> {
        let before = self.camera;

        // A new route supersedes any existing one wholesale.
        self.route = None;
        self.pinned = Some(route.goal_shelter_id.clone());

        // Fit the view to the route plus the origin marker.
        let mut fit_points: Vec<LatLng> = route.path.clone();
        if let Some(origin) = self.location {
            fit_points.push(origin);
        }
        if let Some(bounds) = ViewportBounds::enclosing(&fit_points) {
            self.camera = Camera::fitted_to(bounds);
        }

        self.route = Some(RouteOverlay::new(route));
        self.recompute_marker_visibility();
        self.idle_events_if_moved(before)
    }

    fn apply_disaster(&mut self, payload: DisasterPayload) {
        // Full replace: reset everything first so stale alerts never linger.
        for entry in self.polygons.values_mut() {
            entry.reset_neutral();
        }
        for (region_name, notice) in payload {
            match self.polygons.get_mut(&region_name) {
                Some(entry) => entry.set_alerted(notice),
                None => debug!(region_name, "disaster notice for unknown region dropped"),
            }
        }
    }

    fn recompute_marker_visibility(&mut self) {
        let zoom_visible = self.camera.zoom >= MIN_MARKER_ZOOM;
        for (id, entry) in self.markers.iter_mut() {
            let pinned = self.pinned.as_deref() == Some(id.as_str());
            let visible = pinned || (self.shelters_shown && zoom_visible);
            entry.top_most = pinned;
            if !visible && entry.visible {
                // Hiding a marker closes its popup.
                entry.popup_open = false;
                if self.selected.as_deref() == Some(id.as_str()) {
                    self.selected = None;
                }
            }
            entry.visible = visible;
        }
    }

    fn idle_events_if_moved(&self, before: Camera) -> Vec<SurfaceEvent> {
        if self.camera == before {
            return Vec::new();
        }
        if self.selected.is_some() {
            // Popup open: programmatic moves are not reported.
            return Vec::new();
        }
        vec![SurfaceEvent::ViewportChanged {
            bounds: self.camera.visible_bounds(),
        }]
    }
}

impl Default for SurfaceRuntime {
    fn default() -> Self {
        Self::new()
    }
}
