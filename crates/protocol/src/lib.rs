//! Wire format for the host/surface map bridge.
//!
//! This crate defines:
//! - Commands (host → surface)
//! - Events (surface → host)
//! - The payload types they carry
//!
//! Every envelope travels as one serialized JSON string per send. Both
//! directions are fire-and-forget; request/reply pairing is layered on top
//! by the host via `message_id` correlation.

pub mod envelope;
pub mod types;

pub use envelope::*;
pub use types::*;
