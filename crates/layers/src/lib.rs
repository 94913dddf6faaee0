pub mod compass;
pub mod labels;

pub use compass::*;
pub use labels::*;
