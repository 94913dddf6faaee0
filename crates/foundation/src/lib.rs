pub mod location;
pub mod math;

// Foundation crate: small, well-tested primitives only.
pub use location::*;
pub use math::{GeoPoint, GeoPointError};
