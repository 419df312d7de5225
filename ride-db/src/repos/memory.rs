//! In-memory datastore
//!
//! Backs development mode and tests. One lock guards every table, so a
//! cancellation commit is atomic with respect to all readers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ride_core::{
    CalendarWindows, CancelledBy, PartyRole, PlatformAggregate, ReasonCode, RideSnapshot,
    UserCancellationAggregate,
};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CancellationLedger, HealthCheck, PolicyRepository, RideGateway};
use crate::entities::{CancellationPolicyEntity, CancellationRecordEntity, RideEntity};
use crate::error::{DbError, DbResult};

#[derive(Default)]
struct Tables {
    rides: HashMap<Uuid, RideEntity>,
    records: HashMap<Uuid, CancellationRecordEntity>,
    record_by_ride: HashMap<Uuid, Uuid>,
    policies: Vec<CancellationPolicyEntity>,
}

impl Tables {
    fn append(&mut self, record: &CancellationRecordEntity) -> DbResult<()> {
        if self.record_by_ride.contains_key(&record.ride_id) {
            return Err(DbError::Duplicate(format!(
                "cancellation record for ride {}",
                record.ride_id
            )));
        }
        self.record_by_ride.insert(record.ride_id, record.id);
        self.records.insert(record.id, record.clone());
        Ok(())
    }
}

/// Datastore holding rides, records and policies in process memory
#[derive(Default)]
pub struct MemoryDatastore {
    tables: RwLock<Tables>,
}

impl MemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a ride
    pub async fn insert_ride(&self, ride: RideEntity) {
        self.tables.write().await.rides.insert(ride.id, ride);
    }

    pub async fn get_ride(&self, ride_id: Uuid) -> Option<RideEntity> {
        self.tables.read().await.rides.get(&ride_id).cloned()
    }

    /// Store a policy. A new default+active policy deactivates the previous one.
    pub async fn insert_policy(&self, entity: CancellationPolicyEntity) {
        let mut tables = self.tables.write().await;
        if entity.is_default_active() {
            for existing in tables.policies.iter_mut() {
                if existing.is_default_active() {
                    existing.policy.is_active = false;
                    existing.updated_at = Utc::now();
                }
            }
        }
        tables.policies.push(entity);
    }

    pub async fn record_count(&self) -> usize {
        self.tables.read().await.records.len()
    }

    /// Every record, in no particular order
    pub async fn all_records(&self) -> Vec<CancellationRecordEntity> {
        self.tables.read().await.records.values().cloned().collect()
    }
}

#[async_trait]
impl CancellationLedger for MemoryDatastore {
    async fn insert(&self, record: &CancellationRecordEntity) -> DbResult<()> {
        self.tables.write().await.append(record)
    }

    async fn by_ride(&self, ride_id: Uuid) -> DbResult<Option<CancellationRecordEntity>> {
        let tables = self.tables.read().await;
        Ok(tables
            .record_by_ride
            .get(&ride_id)
            .and_then(|id| tables.records.get(id))
            .cloned())
    }

    async fn by_id(&self, id: Uuid) -> DbResult<Option<CancellationRecordEntity>> {
        Ok(self.tables.read().await.records.get(&id).cloned())
    }

    async fn count_since(
        &self,
        user_id: Uuid,
        role: PartyRole,
        since: DateTime<Utc>,
    ) -> DbResult<u32> {
        let by: CancelledBy = role.into();
        let tables = self.tables.read().await;
        let count = tables
            .records
            .values()
            .filter(|r| r.cancelled_by == by && r.cancelled_by_user(user_id) && r.cancelled_at >= since)
            .count();
        Ok(count as u32)
    }

    async fn user_aggregate(
        &self,
        user_id: Uuid,
        windows: &CalendarWindows,
    ) -> DbResult<UserCancellationAggregate> {
        let tables = self.tables.read().await;
        let mut agg = UserCancellationAggregate::default();

        for r in tables
            .records
            .values()
            .filter(|r| r.involves(user_id) && r.cancelled_by != CancelledBy::System)
        {
            agg.total += 1;
            if r.cancelled_at >= windows.day_start {
                agg.today += 1;
            }
            if r.cancelled_at >= windows.week_start {
                agg.this_week += 1;
                if r.cancelled_by_user(user_id) {
                    match r.cancelled_by {
                        CancelledBy::Rider => agg.rider_this_week += 1,
                        CancelledBy::Driver => agg.driver_this_week += 1,
                        CancelledBy::System => {}
                    }
                }
            }
            if r.cancelled_at >= windows.month_start {
                agg.this_month += 1;
            }
            if r.cancelled_at >= windows.trailing_start {
                agg.recent_cancellations += 1;
            }
            if r.fee_waived {
                agg.total_fees_waived += r.fee_amount;
            } else {
                agg.total_fees_charged += r.fee_amount;
            }
            agg.last_cancellation_at = agg.last_cancellation_at.max(Some(r.cancelled_at));
        }

        agg.recent_rides = tables
            .rides
            .values()
            .filter(|ride| {
                (ride.rider_id == user_id || ride.driver_id == Some(user_id))
                    && ride.created_at >= windows.trailing_start
            })
            .count() as u64;

        Ok(agg)
    }

    async fn user_history(
        &self,
        user_id: Uuid,
        limit: u32,
        offset: u64,
    ) -> DbResult<(Vec<CancellationRecordEntity>, u64)> {
        let tables = self.tables.read().await;
        let mut records: Vec<&CancellationRecordEntity> = tables
            .records
            .values()
            .filter(|r| r.involves(user_id))
            .collect();
        records.sort_by(|a, b| b.cancelled_at.cmp(&a.cancelled_at).then(b.id.cmp(&a.id)));

        let total = records.len() as u64;
        let page = records
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn waive(&self, id: Uuid, note: &str) -> DbResult<CancellationRecordEntity> {
        let mut tables = self.tables.write().await;
        let record = tables
            .records
            .get_mut(&id)
            .ok_or_else(|| DbError::NotFound(format!("cancellation {}", id)))?;
        record.apply_admin_waiver(note);
        Ok(record.clone())
    }

    async fn platform_aggregate(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<PlatformAggregate> {
        let tables = self.tables.read().await;
        let mut agg = PlatformAggregate::default();
        let mut reasons: HashMap<ReasonCode, u64> = HashMap::new();
        let mut minutes = 0.0;

        for r in tables
            .records
            .values()
            .filter(|r| r.cancelled_at >= from && r.cancelled_at < to)
        {
            agg.total += 1;
            match r.cancelled_by {
                CancelledBy::Rider => agg.by_rider += 1,
                CancelledBy::Driver => agg.by_driver += 1,
                CancelledBy::System => agg.by_system += 1,
            }
            if r.fee_waived {
                agg.fees_waived += r.fee_amount;
            } else {
                agg.fees_collected += r.fee_amount;
            }
            minutes += r.minutes_since_request;
            *reasons.entry(r.reason_code).or_insert(0) += 1;
        }

        if agg.total > 0 {
            agg.avg_minutes_to_cancel = minutes / agg.total as f64;
        }
        agg.reason_counts = reasons.into_iter().collect();
        agg.rides_created = tables
            .rides
            .values()
            .filter(|ride| ride.created_at >= from && ride.created_at < to)
            .count() as u64;

        Ok(agg)
    }
}

#[async_trait]
impl RideGateway for MemoryDatastore {
    async fn load_ride(&self, ride_id: Uuid) -> DbResult<Option<RideSnapshot>> {
        Ok(self
            .tables
            .read()
            .await
            .rides
            .get(&ride_id)
            .map(RideEntity::snapshot))
    }

    async fn mark_cancelled(
        &self,
        ride_id: Uuid,
        reason: ReasonCode,
        at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let mut tables = self.tables.write().await;
        let ride = tables
            .rides
            .get_mut(&ride_id)
            .ok_or_else(|| DbError::NotFound(format!("ride {}", ride_id)))?;
        Ok(ride.mark_cancelled(reason, at))
    }

    async fn commit_cancellation(&self, record: &CancellationRecordEntity) -> DbResult<()> {
        let mut tables = self.tables.write().await;

        // Validate everything before the first write
        let ride = tables
            .rides
            .get(&record.ride_id)
            .ok_or_else(|| DbError::NotFound(format!("ride {}", record.ride_id)))?;
        if ride.status.is_terminal() {
            return Err(DbError::InvalidState(format!(
                "ride {} is already {}",
                ride.id, ride.status
            )));
        }
        if tables.record_by_ride.contains_key(&record.ride_id) {
            return Err(DbError::Duplicate(format!(
                "cancellation record for ride {}",
                record.ride_id
            )));
        }

        tables.append(record)?;
        if let Some(ride) = tables.rides.get_mut(&record.ride_id) {
            ride.mark_cancelled(record.reason_code, record.cancelled_at);
        }
        Ok(())
    }
}

#[async_trait]
impl PolicyRepository for MemoryDatastore {
    async fn find_default_active(&self) -> DbResult<Option<CancellationPolicyEntity>> {
        let tables = self.tables.read().await;
        Ok(tables
            .policies
            .iter()
            .filter(|p| p.is_default_active())
            .max_by_key(|p| p.updated_at)
            .cloned())
    }
}

#[async_trait]
impl HealthCheck for MemoryDatastore {
    async fn ping(&self) -> DbResult<()> {
        Ok(())
    }
}
