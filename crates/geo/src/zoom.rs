use serde::{Deserialize, Serialize};

/// Map zoom level, clamped to the range the embedded map library supports.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Zoom(u8);

pub const ZOOM_MIN: u8 = 6;
pub const ZOOM_MAX: u8 = 21;

/// Shelter markers are hidden below this zoom unless pinned.
pub const MIN_MARKER_ZOOM: Zoom = Zoom(12);

/// Zoom applied when recentring without an explicit level.
pub const DEFAULT_ZOOM: Zoom = Zoom(15);

impl Zoom {
    pub fn new(level: u8) -> Self {
        Zoom(level.clamp(ZOOM_MIN, ZOOM_MAX))
    }

    pub fn level(&self) -> u8 {
        self.0
    }

    /// Step in by one level, clamped at the maximum.
    pub fn step_in(&self) -> Self {
        Zoom::new(self.0.saturating_add(1))
    }

    /// Step out by one level, clamped at the minimum.
    pub fn step_out(&self) -> Self {
        Zoom::new(self.0.saturating_sub(1))
    }
}

impl Default for Zoom {
    fn default() -> Self {
        DEFAULT_ZOOM
    }
}
