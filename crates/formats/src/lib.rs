pub mod cities;

pub use cities::*;
