//! Ride Cancellation Database Layer
//!
//! Storage and orchestration for ride cancellations.
//!
//! # Architecture
//!
//! - `entities` - Persisted rows (cancellation records, rides, policies)
//! - `repos` - Capability traits (`CancellationLedger`, `RideGateway`,
//!   `PolicyRepository`, `HealthCheck`) with an in-memory and a Postgres
//!   datastore implementing all of them
//! - `services` - `CancellationService`, the orchestration entry point, and
//!   the policy cache
//!
//! A cancel commits the ledger append and the ride transition in one unit:
//! either both are visible or neither.
//!
//! # Usage Example
//!
//! ```ignore
//! use ride_db::{CancellationService, MemoryDatastore, ServiceConfig};
//! use std::sync::Arc;
//!
//! async fn example() {
//!     let store = Arc::new(MemoryDatastore::new());
//!     let service = CancellationService::new(store, ServiceConfig::default());
//!     let reasons = service.reasons(false);
//! }
//! ```

pub mod entities;
pub mod error;
pub mod repos;
pub mod schema;
pub mod services;

pub use entities::*;
pub use error::*;
pub use repos::*;
pub use schema::CANCELLATION_SCHEMA;
pub use services::*;
