pub mod angle;
pub mod geodesy;

pub use angle::*;
pub use geodesy::*;
