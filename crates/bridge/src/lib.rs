//! Bridge channel and pending-request registry.
//!
//! The channel is a narrow, message-envelope transport between the host
//! controller and the rendering surface:
//! - Each direction is independent and fire-and-forget.
//! - No ordering guarantee relative to other channels (e.g. a reload).
//! - No delivery guarantee before the surface signals readiness.
//!
//! The registry layers request/reply correlation and timeouts on top, for
//! the few commands that need an answer (currently the bounds query).

pub mod channel;
pub mod error;
pub mod pending;

pub use channel::*;
pub use error::*;
pub use pending::*;
