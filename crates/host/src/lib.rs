//! Host controller for the embedded map surface.
//!
//! Owns the canonical view state (current location, last known viewport,
//! overlay toggles), issues commands into the rendering surface, and
//! consumes its events through a single dispatch entry point. Shelter
//! search and routing are external collaborators reached through traits.

pub mod controller;
pub mod search;

pub use controller::*;
pub use search::*;
