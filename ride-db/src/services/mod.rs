//! Service Implementations
//!
//! Orchestration over the repository traits. Services never talk to a
//! concrete datastore.

mod cancellation_service;
mod error;
mod policy_cache;

pub use cancellation_service::*;
pub use error::*;
pub use policy_cache::*;
