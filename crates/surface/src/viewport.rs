use geo::{LatLng, ViewportBounds, Zoom, ZOOM_MAX, ZOOM_MIN};

/// Camera state: what the surface currently looks at.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    pub center: LatLng,
    pub zoom: Zoom,
}

impl Camera {
    pub fn new(center: LatLng, zoom: Zoom) -> Self {
        Self { center, zoom }
    }

    /// The visible bounds for this camera.
    ///
    /// The span halves per zoom level, mirroring slippy-map tiling; exact
    /// aspect handling belongs to the rendering backend, not the bridge.
    pub fn visible_bounds(&self) -> ViewportBounds {
        ViewportBounds::around(self.center, half_span_deg(self.zoom))
    }

    /// Largest zoom whose viewport still contains `bounds`, so the fitted
    /// view is as close as possible.
    pub fn fitted_to(bounds: ViewportBounds) -> Self {
        let center = bounds.center();
        for level in (ZOOM_MIN..=ZOOM_MAX).rev() {
            let zoom = Zoom::new(level);
            let candidate = Camera::new(center, zoom);
            let view = candidate.visible_bounds();
            if view.contains(LatLng::new(bounds.south, bounds.west))
                && view.contains(LatLng::new(bounds.north, bounds.east))
            {
                return candidate;
            }
        }
        Camera::new(center, Zoom::new(ZOOM_MIN))
    }
}

/// Half the viewport span in degrees at a given zoom.
pub fn half_span_deg(zoom: Zoom) -> f64 {
    180.0 / (1u64 << zoom.level()) as f64
}
