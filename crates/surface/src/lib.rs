//! Rendering surface runtime.
//!
//! This crate owns the live overlay state inside the embedded map surface:
//! - Shelter markers (visibility governed by zoom and the pinned override)
//! - Administrative-region polygons (neutral/alerted, full-replace updates)
//! - The drawn route polyline and its pinned goal marker
//! - The location marker and camera
//!
//! State transitions are pure reducer functions over the overlay arena:
//! inbound commands and user gestures mutate the arena and return the
//! events to emit back over the bridge. The runtime never touches a real
//! drawing API; rendering backends consume the arena.

pub mod init;
pub mod overlay;
pub mod runtime;
pub mod viewport;

pub use init::*;
pub use overlay::*;
pub use runtime::*;
pub use viewport::*;
