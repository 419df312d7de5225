//! Ride gateway

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ride_core::{ReasonCode, RideSnapshot};
use uuid::Uuid;

use crate::entities::CancellationRecordEntity;
use crate::error::DbResult;

/// Read and cancel rides owned by the ride lifecycle service
#[async_trait]
pub trait RideGateway: Send + Sync {
    async fn load_ride(&self, ride_id: Uuid) -> DbResult<Option<RideSnapshot>>;

    /// Move a non-terminal ride to `cancelled`. Returns false (no-op) when the
    /// ride is already terminal.
    async fn mark_cancelled(
        &self,
        ride_id: Uuid,
        reason: ReasonCode,
        at: DateTime<Utc>,
    ) -> DbResult<bool>;

    /// Append `record` and cancel its ride as one unit.
    ///
    /// Fails with `InvalidState` if the ride is no longer cancellable and
    /// with `Duplicate` if the ride already has a record; nothing is written
    /// in either case.
    async fn commit_cancellation(&self, record: &CancellationRecordEntity) -> DbResult<()>;
}
