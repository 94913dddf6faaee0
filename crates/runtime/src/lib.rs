pub mod event_bus;
pub mod heading;
pub mod session;
pub mod setup;

pub use event_bus::*;
pub use heading::*;
pub use session::*;
pub use setup::*;
