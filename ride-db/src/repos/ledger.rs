//! Cancellation ledger repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ride_core::{CalendarWindows, PartyRole, PlatformAggregate, UserCancellationAggregate};
use uuid::Uuid;

use crate::entities::CancellationRecordEntity;
use crate::error::DbResult;

/// Append-only cancellation ledger
#[async_trait]
pub trait CancellationLedger: Send + Sync {
    /// Append a record; fails with `Duplicate` when the ride already has one
    async fn insert(&self, record: &CancellationRecordEntity) -> DbResult<()>;

    async fn by_ride(&self, ride_id: Uuid) -> DbResult<Option<CancellationRecordEntity>>;

    async fn by_id(&self, id: Uuid) -> DbResult<Option<CancellationRecordEntity>>;

    /// Cancellations the user performed in `role` at or after `since`
    async fn count_since(
        &self,
        user_id: Uuid,
        role: PartyRole,
        since: DateTime<Utc>,
    ) -> DbResult<u32>;

    /// Cancellations since local midnight
    async fn count_today(&self, user_id: Uuid, role: PartyRole) -> DbResult<u32> {
        let windows = CalendarWindows::current();
        self.count_since(user_id, role, windows.day_start).await
    }

    /// Cancellations since Monday 00:00 local
    async fn count_this_week(&self, user_id: Uuid, role: PartyRole) -> DbResult<u32> {
        let windows = CalendarWindows::current();
        self.count_since(user_id, role, windows.week_start).await
    }

    /// Raw per-user counters over rides the user took part in, system
    /// cancellations excluded. The weekly per-role counters only include
    /// cancellations the user performed.
    async fn user_aggregate(
        &self,
        user_id: Uuid,
        windows: &CalendarWindows,
    ) -> DbResult<UserCancellationAggregate>;

    /// Records where the user is rider or driver, newest first, with the total count
    async fn user_history(
        &self,
        user_id: Uuid,
        limit: u32,
        offset: u64,
    ) -> DbResult<(Vec<CancellationRecordEntity>, u64)>;

    /// Admin waiver: waived, `admin_override`, note appended to the free text
    async fn waive(&self, id: Uuid, note: &str) -> DbResult<CancellationRecordEntity>;

    /// Platform counters over `[from, to)`
    async fn platform_aggregate(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<PlatformAggregate>;
}
