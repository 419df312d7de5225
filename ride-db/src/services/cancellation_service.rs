//! Cancellation Service
//!
//! Orchestrates authorization, the fee decision, the atomic ledger append +
//! ride transition, and the read-side statistics.
//!
//! Every datastore call runs under `ServiceConfig::operation_timeout`. An
//! expired deadline drops the pending future; for Postgres that drops the open
//! transaction, which rolls it back.

use chrono::{DateTime, Duration as ChronoDuration, Local, Months, NaiveDate, Utc};
use ride_core::window::local_midnight;
use ride_core::{
    elapsed_minutes, reasons_for, CalendarWindows, CancellationPolicy, CancelledBy, FeeCalculator,
    FeeDecision, FeeInputs, PartyRole, PlatformCancellationStats, PricingConfig, ReasonCode,
    ReasonInfo, RideSnapshot, UserCancellationStats, WaiverReason,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::error::{ServiceError, ServiceResult};
use super::policy_cache::PolicyCache;
use crate::entities::{admin_waiver_note, CancellationRecordEntity};
use crate::error::{DbError, DbResult};
use crate::repos::CancellationStore;

/// Longest free-text reason accepted, in characters
pub const MAX_REASON_TEXT_CHARS: usize = 500;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 50;

const ALREADY_FINISHED: &str = "ride already completed or cancelled";

/// The authenticated identity behind a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    pub is_admin: bool,
}

impl Caller {
    pub fn user(user_id: Uuid) -> Self {
        Self {
            user_id,
            is_admin: false,
        }
    }

    pub fn admin(user_id: Uuid) -> Self {
        Self {
            user_id,
            is_admin: true,
        }
    }
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Deadline applied to every datastore call
    pub operation_timeout: Duration,
    pub policy_cache_ttl: Duration,
    pub pricing: PricingConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            operation_timeout: Duration::from_secs(10),
            policy_cache_ttl: Duration::from_secs(60),
            pricing: PricingConfig::default(),
        }
    }
}

/// Cancel input, already parsed at the boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelRequest {
    pub reason_code: ReasonCode,
    pub reason_text: Option<String>,
}

/// What a cancel would do right now
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancellationPreview {
    pub fee: Decimal,
    pub waived: bool,
    pub waiver_reason: Option<WaiverReason>,
    pub explanation: String,
    pub free_cancels_remaining: u32,
    pub minutes_since_request: f64,
    pub minutes_since_accept: Option<f64>,
}

/// Result of a successful cancel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancellationOutcome {
    pub ride_id: Uuid,
    pub cancelled_by: CancelledBy,
    pub fee: Decimal,
    pub waived: bool,
    pub waiver_reason: Option<WaiverReason>,
    pub explanation: String,
    pub cancelled_at: DateTime<Utc>,
}

impl CancellationOutcome {
    fn from_record(record: &CancellationRecordEntity, explanation: String) -> Self {
        Self {
            ride_id: record.ride_id,
            cancelled_by: record.cancelled_by,
            fee: record.fee_amount,
            waived: record.fee_waived,
            waiver_reason: record.waiver_reason,
            explanation,
            cancelled_at: record.cancelled_at,
        }
    }
}

/// One page of a user's cancellation history
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryPage {
    pub records: Vec<CancellationRecordEntity>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

/// Coerce raw paging parameters: `page < 1` becomes 1, a page size outside
/// `1..=50` becomes 20.
pub fn normalize_paging(page: Option<i64>, page_size: Option<i64>) -> (u32, u32) {
    let page = match page {
        Some(p) if p >= 1 => u32::try_from(p).unwrap_or(u32::MAX),
        _ => 1,
    };
    let page_size = match page_size {
        Some(s) if (1..=MAX_PAGE_SIZE as i64).contains(&s) => s as u32,
        _ => DEFAULT_PAGE_SIZE,
    };
    (page, page_size)
}

/// Interval for platform stats.
///
/// Dates are local calendar days and a given `to` day is inclusive. Without
/// `to` the interval ends at `now`. Without `from` it starts one month before
/// its end.
pub fn stats_interval(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    now: DateTime<Utc>,
) -> ServiceResult<(DateTime<Utc>, DateTime<Utc>)> {
    let end = match to {
        Some(date) => {
            let next = date
                .succ_opt()
                .ok_or_else(|| ServiceError::bad_request("'to' date is out of range"))?;
            local_midnight(&Local, next)
        }
        None => now,
    };
    let start = match from {
        Some(date) => local_midnight(&Local, date),
        None => end
            .checked_sub_months(Months::new(1))
            .unwrap_or(end - ChronoDuration::days(30)),
    };
    if start >= end {
        return Err(ServiceError::bad_request("'from' must be before 'to'"));
    }
    Ok((start, end))
}

struct Evaluation {
    policy: CancellationPolicy,
    today_count: u32,
    decision: FeeDecision,
    minutes_since_request: f64,
    minutes_since_accept: Option<f64>,
}

/// Cancellation Service
pub struct CancellationService {
    store: Arc<dyn CancellationStore>,
    policies: PolicyCache,
    calculator: FeeCalculator,
    operation_timeout: Duration,
}

impl CancellationService {
    pub fn new(store: Arc<dyn CancellationStore>, config: ServiceConfig) -> Self {
        Self {
            store,
            policies: PolicyCache::new(config.policy_cache_ttl),
            calculator: FeeCalculator::new(config.pricing),
            operation_timeout: config.operation_timeout,
        }
    }

    // ------------------------------------------------------------------
    // Deadline helpers
    // ------------------------------------------------------------------

    async fn within<T, F>(&self, operation: &'static str, fut: F) -> DbResult<T>
    where
        F: Future<Output = DbResult<T>>,
    {
        match tokio::time::timeout(self.operation_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(DbError::Timeout(format!(
                "{} exceeded {:?}",
                operation, self.operation_timeout
            ))),
        }
    }

    async fn call<T, F>(&self, operation: &'static str, fut: F) -> ServiceResult<T>
    where
        F: Future<Output = DbResult<T>>,
    {
        self.within(operation, fut)
            .await
            .map_err(|err| ServiceError::internal(operation, err))
    }

    // ------------------------------------------------------------------
    // Shared steps
    // ------------------------------------------------------------------

    async fn policy(&self) -> ServiceResult<CancellationPolicy> {
        self.call("active_policy", self.policies.active_policy(self.store.as_ref()))
            .await
    }

    async fn load_ride(&self, ride_id: Uuid) -> ServiceResult<RideSnapshot> {
        self.call("load_ride", self.store.load_ride(ride_id))
            .await?
            .ok_or_else(|| ServiceError::not_found("ride not found"))
    }

    /// Load the ride, resolve the actor's role and reject terminal rides
    async fn load_for_party(
        &self,
        ride_id: Uuid,
        actor_id: Uuid,
    ) -> ServiceResult<(RideSnapshot, PartyRole)> {
        let ride = self.load_ride(ride_id).await?;
        let role = ride
            .party_role(actor_id)
            .ok_or_else(|| ServiceError::forbidden("not authorized to cancel this ride"))?;
        if ride.status.is_terminal() {
            warn!(%ride_id, status = %ride.status, "Cancel rejected: ride is terminal");
            return Err(ServiceError::bad_request(ALREADY_FINISHED));
        }
        Ok((ride, role))
    }

    async fn evaluate(
        &self,
        ride: &RideSnapshot,
        role: PartyRole,
        actor_id: Uuid,
        now: DateTime<Utc>,
    ) -> ServiceResult<Evaluation> {
        let policy = self.policy().await?;
        // Advisory counts, read outside the commit
        let today_count = self
            .call("count_today", self.store.count_today(actor_id, role))
            .await?;
        let week_count = self
            .call("count_this_week", self.store.count_this_week(actor_id, role))
            .await?;

        let minutes_since_request = elapsed_minutes(ride.created_at, now);
        let minutes_since_accept = ride.accepted_at.map(|at| elapsed_minutes(at, now));

        let decision = self.calculator.decide(&FeeInputs {
            role,
            ride_status: ride.status,
            estimated_fare: ride.estimated_fare,
            minutes_since_request,
            today_count,
            week_count,
            policy: &policy,
        });
        debug!(
            ride_id = %ride.id,
            %role,
            today_count,
            week_count,
            fee = %decision.fee,
            waived = decision.waived,
            "Fee decided"
        );

        Ok(Evaluation {
            policy,
            today_count,
            decision,
            minutes_since_request,
            minutes_since_accept,
        })
    }

    /// Append the record and transition the ride together. A lost race is
    /// reported as a terminal ride once the re-read confirms it.
    async fn commit(&self, record: &CancellationRecordEntity) -> ServiceResult<()> {
        let err = match self
            .within("commit_cancellation", self.store.commit_cancellation(record))
            .await
        {
            Ok(()) => return Ok(()),
            Err(err @ (DbError::Duplicate(_) | DbError::InvalidState(_))) => err,
            Err(err) => return Err(ServiceError::internal("commit_cancellation", err)),
        };

        match self
            .call("load_ride", self.store.load_ride(record.ride_id))
            .await?
        {
            Some(ride) if ride.status.is_terminal() => {
                warn!(ride_id = %record.ride_id, error = %err, "Cancel lost race");
                Err(ServiceError::bad_request(ALREADY_FINISHED))
            }
            Some(_) => Err(ServiceError::internal("commit_cancellation", err)),
            None => Err(ServiceError::not_found("ride not found")),
        }
    }

    fn build_record(
        ride: &RideSnapshot,
        cancelled_by: CancelledBy,
        request: CancelRequest,
        decision: &FeeDecision,
        minutes_since_request: f64,
        minutes_since_accept: Option<f64>,
        now: DateTime<Utc>,
    ) -> CancellationRecordEntity {
        let cancelled_at = now.max(ride.created_at);
        CancellationRecordEntity {
            id: Uuid::new_v4(),
            ride_id: ride.id,
            rider_id: ride.rider_id,
            driver_id: ride.driver_id,
            cancelled_by,
            reason_code: request.reason_code,
            reason_text: request.reason_text,
            fee_amount: decision.fee,
            fee_waived: decision.waived,
            waiver_reason: decision.waiver_reason,
            minutes_since_request,
            minutes_since_accept,
            ride_status_at_cancel: ride.status,
            pickup_lat: ride.pickup.lat,
            pickup_lng: ride.pickup.lng,
            cancelled_at,
            created_at: now,
        }
    }

    fn check_reason_text(text: Option<&str>) -> ServiceResult<()> {
        match text {
            Some(t) if t.chars().count() > MAX_REASON_TEXT_CHARS => Err(ServiceError::bad_request(
                format!("reason_text must be at most {} characters", MAX_REASON_TEXT_CHARS),
            )),
            _ => Ok(()),
        }
    }

    fn require_admin(caller: &Caller) -> ServiceResult<()> {
        if caller.is_admin {
            Ok(())
        } else {
            Err(ServiceError::forbidden("admin access required"))
        }
    }

    // ------------------------------------------------------------------
    // Rider / driver operations
    // ------------------------------------------------------------------

    /// Compute what cancelling now would cost. No writes.
    #[instrument(skip(self))]
    pub async fn preview(&self, ride_id: Uuid, actor_id: Uuid) -> ServiceResult<CancellationPreview> {
        let (ride, role) = self.load_for_party(ride_id, actor_id).await?;
        let eval = self.evaluate(&ride, role, actor_id, Utc::now()).await?;

        Ok(CancellationPreview {
            fee: eval.decision.fee,
            waived: eval.decision.waived,
            waiver_reason: eval.decision.waiver_reason,
            explanation: eval.decision.explanation,
            free_cancels_remaining: eval.policy.free_cancels_remaining(eval.today_count),
            minutes_since_request: eval.minutes_since_request,
            minutes_since_accept: eval.minutes_since_accept,
        })
    }

    /// Cancel a ride as its rider or assigned driver
    #[instrument(skip(self, request), fields(reason = %request.reason_code))]
    pub async fn cancel(
        &self,
        ride_id: Uuid,
        actor_id: Uuid,
        request: CancelRequest,
    ) -> ServiceResult<CancellationOutcome> {
        Self::check_reason_text(request.reason_text.as_deref())?;
        let (ride, role) = self.load_for_party(ride_id, actor_id).await?;
        let cancelled_by = CancelledBy::from(role);
        request.reason_code.ensure_allowed_for(cancelled_by)?;

        let now = Utc::now();
        let eval = self.evaluate(&ride, role, actor_id, now).await?;
        let record = Self::build_record(
            &ride,
            cancelled_by,
            request,
            &eval.decision,
            eval.minutes_since_request,
            eval.minutes_since_accept,
            now,
        );
        self.commit(&record).await?;

        info!(
            %ride_id,
            %actor_id,
            %cancelled_by,
            fee = %record.fee_amount,
            waived = record.fee_waived,
            "Ride cancelled"
        );
        Ok(CancellationOutcome::from_record(&record, eval.decision.explanation))
    }

    /// Cancel a ride on behalf of the platform with a system reason code
    #[instrument(skip(self))]
    pub async fn system_cancel(
        &self,
        ride_id: Uuid,
        reason_code: ReasonCode,
    ) -> ServiceResult<CancellationOutcome> {
        reason_code.ensure_allowed_for(CancelledBy::System)?;
        let ride = self.load_ride(ride_id).await?;
        if ride.status.is_terminal() {
            warn!(%ride_id, status = %ride.status, "System cancel rejected: ride is terminal");
            return Err(ServiceError::bad_request(ALREADY_FINISHED));
        }

        let now = Utc::now();
        let decision = FeeDecision::system();
        let record = Self::build_record(
            &ride,
            CancelledBy::System,
            CancelRequest {
                reason_code,
                reason_text: None,
            },
            &decision,
            elapsed_minutes(ride.created_at, now),
            ride.accepted_at.map(|at| elapsed_minutes(at, now)),
            now,
        );
        self.commit(&record).await?;

        info!(%ride_id, reason = %reason_code, "Ride cancelled by system");
        Ok(CancellationOutcome::from_record(&record, decision.explanation))
    }

    /// The cancellation record of a ride, for its parties or an admin
    #[instrument(skip(self, caller), fields(caller = %caller.user_id))]
    pub async fn get_details(
        &self,
        ride_id: Uuid,
        caller: &Caller,
    ) -> ServiceResult<CancellationRecordEntity> {
        let ride = self.load_ride(ride_id).await?;
        if !caller.is_admin && !ride.involves(caller.user_id) {
            return Err(ServiceError::forbidden("not authorized to view this cancellation"));
        }
        self.call("by_ride", self.store.by_ride(ride_id))
            .await?
            .ok_or_else(|| ServiceError::not_found("cancellation not found"))
    }

    async fn user_stats(&self, user_id: Uuid) -> ServiceResult<UserCancellationStats> {
        let policy = self.policy().await?;
        let windows = CalendarWindows::current();
        let aggregate = self
            .call("user_aggregate", self.store.user_aggregate(user_id, &windows))
            .await?;
        Ok(UserCancellationStats::from_aggregate(user_id, &aggregate, &policy))
    }

    pub async fn my_stats(&self, caller: &Caller) -> ServiceResult<UserCancellationStats> {
        self.user_stats(caller.user_id).await
    }

    /// Caller's history, newest first. Paging is coerced, never rejected.
    pub async fn my_history(
        &self,
        caller: &Caller,
        page: Option<i64>,
        page_size: Option<i64>,
    ) -> ServiceResult<HistoryPage> {
        let (page, page_size) = normalize_paging(page, page_size);
        let offset = u64::from(page - 1) * u64::from(page_size);
        let (records, total) = self
            .call(
                "user_history",
                self.store.user_history(caller.user_id, page_size, offset),
            )
            .await?;
        Ok(HistoryPage {
            records,
            total,
            page,
            page_size,
        })
    }

    pub fn reasons(&self, is_driver: bool) -> Vec<ReasonInfo> {
        let role = if is_driver {
            PartyRole::Driver
        } else {
            PartyRole::Rider
        };
        reasons_for(role)
    }

    // ------------------------------------------------------------------
    // Admin operations
    // ------------------------------------------------------------------

    /// Waive a recorded fee. Repeating it appends another audit note.
    #[instrument(skip(self, caller, reason), fields(admin = %caller.user_id))]
    pub async fn admin_waive(
        &self,
        caller: &Caller,
        cancellation_id: Uuid,
        reason: &str,
    ) -> ServiceResult<CancellationRecordEntity> {
        Self::require_admin(caller)?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ServiceError::bad_request("reason is required"));
        }
        Self::check_reason_text(Some(reason))?;

        let note = admin_waiver_note(reason);
        match self
            .within("waive", self.store.waive(cancellation_id, &note))
            .await
        {
            Ok(record) => {
                warn!(%cancellation_id, fee = %record.fee_amount, "Cancellation fee waived by admin");
                Ok(record)
            }
            Err(DbError::NotFound(_)) => Err(ServiceError::not_found("cancellation not found")),
            Err(err) => Err(ServiceError::internal("waive", err)),
        }
    }

    #[instrument(skip(self, caller))]
    pub async fn admin_stats(
        &self,
        caller: &Caller,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> ServiceResult<PlatformCancellationStats> {
        Self::require_admin(caller)?;
        let (start, end) = stats_interval(from, to, Utc::now())?;
        let aggregate = self
            .call("platform_aggregate", self.store.platform_aggregate(start, end))
            .await?;
        Ok(PlatformCancellationStats::from_aggregate(start, end, aggregate))
    }

    pub async fn admin_user_stats(
        &self,
        caller: &Caller,
        user_id: Uuid,
    ) -> ServiceResult<UserCancellationStats> {
        Self::require_admin(caller)?;
        self.user_stats(user_id).await
    }

    /// Policy currently applied to fee decisions
    pub async fn active_policy(&self, caller: &Caller) -> ServiceResult<CancellationPolicy> {
        Self::require_admin(caller)?;
        self.policy().await
    }

    /// Datastore readiness
    pub async fn ping(&self) -> ServiceResult<()> {
        self.call("ping", self.store.ping()).await
    }
}
