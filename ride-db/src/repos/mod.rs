//! Repository capabilities
//!
//! The service depends only on these traits. `MemoryDatastore` and
//! `PgDatastore` each implement all of them over a single store so that the
//! ledger append and the ride transition can share one transaction.

mod ledger;
mod memory;
mod policy_repo;
mod postgres;
mod ride_gateway;

pub use ledger::*;
pub use memory::*;
pub use policy_repo::*;
pub use postgres::*;
pub use ride_gateway::*;

use async_trait::async_trait;

use crate::error::DbResult;

/// Datastore liveness
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn ping(&self) -> DbResult<()>;
}

/// Every capability the cancellation service needs
pub trait CancellationStore: CancellationLedger + RideGateway + PolicyRepository + HealthCheck {}

impl<T> CancellationStore for T where T: CancellationLedger + RideGateway + PolicyRepository + HealthCheck {}
