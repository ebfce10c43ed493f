pub mod bounds;
pub mod point;
pub mod zoom;

// Geo crate: small, well-tested coordinate primitives only.
pub use bounds::*;
pub use point::*;
pub use zoom::*;
