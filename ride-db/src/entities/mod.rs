//! Persisted entities

mod cancellation;
mod policy;
mod ride;

pub use cancellation::*;
pub use policy::*;
pub use ride::*;

/// A persisted row and the table it lives in
pub trait Entity {
    const TABLE: &'static str;
}
