//! Cancellation domain types

mod actor;
mod policy;
mod reason;
mod ride;
mod stats;

pub use actor::*;
pub use policy::*;
pub use reason::*;
pub use ride::*;
pub use stats::*;
