//! Postgres datastore
//!
//! Enum columns are stored as their snake_case text form and parsed back
//! through `FromStr`; a value the domain does not know surfaces as
//! `DbError::Serialization`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ride_core::{
    CalendarWindows, CancellationPolicy, CancelledBy, GeoPoint, PartyRole, PlatformAggregate,
    ReasonCode, RideSnapshot, RideStatus, UserCancellationAggregate, WaiverReason,
};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::{CancellationLedger, HealthCheck, PolicyRepository, RideGateway};
use crate::entities::{CancellationPolicyEntity, CancellationRecordEntity, Entity, RideEntity};
use crate::error::{DbError, DbResult};
use crate::schema::CANCELLATION_SCHEMA;

const RECORDS: &str = CancellationRecordEntity::TABLE;
const RIDES: &str = RideEntity::TABLE;
const POLICIES: &str = CancellationPolicyEntity::TABLE;

const RECORD_COLUMNS: &str = "id, ride_id, rider_id, driver_id, cancelled_by, reason_code, \
     reason_text, fee_amount, fee_waived, waiver_reason, minutes_since_request, \
     minutes_since_accept, ride_status_at_cancel, pickup_lat, pickup_lng, cancelled_at, created_at";

/// Datastore over a Postgres connection pool
#[derive(Clone)]
pub struct PgDatastore {
    pool: PgPool,
}

impl PgDatastore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `database_url`
    pub async fn connect(database_url: &str, max_connections: u32) -> DbResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;
        info!(max_connections, "Connected to Postgres");
        Ok(Self { pool })
    }

    /// Create the cancellation tables and indexes if missing
    pub async fn init_schema(&self) -> DbResult<()> {
        sqlx::raw_sql(CANCELLATION_SCHEMA).execute(&self.pool).await?;
        info!("Cancellation schema initialized");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn parse<T>(column: &str, value: &str) -> DbResult<T>
where
    T: FromStr,
{
    value
        .parse()
        .map_err(|_| DbError::Serialization(format!("invalid {} value '{}'", column, value)))
}

fn to_count(value: i64) -> u64 {
    value.max(0) as u64
}

/// Guarded transition: only a non-terminal ride moves to `cancelled`
fn cancel_ride_sql() -> String {
    format!(
        "UPDATE {RIDES} SET status = 'cancelled', cancelled_at = $2, \
             cancellation_reason = $3, updated_at = $2 \
         WHERE id = $1 AND status NOT IN ('completed', 'cancelled')"
    )
}

#[derive(FromRow)]
struct RecordRow {
    id: Uuid,
    ride_id: Uuid,
    rider_id: Uuid,
    driver_id: Option<Uuid>,
    cancelled_by: String,
    reason_code: String,
    reason_text: Option<String>,
    fee_amount: Decimal,
    fee_waived: bool,
    waiver_reason: Option<String>,
    minutes_since_request: f64,
    minutes_since_accept: Option<f64>,
    ride_status_at_cancel: String,
    pickup_lat: f64,
    pickup_lng: f64,
    cancelled_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl TryFrom<RecordRow> for CancellationRecordEntity {
    type Error = DbError;

    fn try_from(row: RecordRow) -> DbResult<Self> {
        Ok(Self {
            id: row.id,
            ride_id: row.ride_id,
            rider_id: row.rider_id,
            driver_id: row.driver_id,
            cancelled_by: parse::<CancelledBy>("cancelled_by", &row.cancelled_by)?,
            reason_code: parse::<ReasonCode>("reason_code", &row.reason_code)?,
            reason_text: row.reason_text,
            fee_amount: row.fee_amount,
            fee_waived: row.fee_waived,
            waiver_reason: row
                .waiver_reason
                .as_deref()
                .map(|w| parse::<WaiverReason>("waiver_reason", w))
                .transpose()?,
            minutes_since_request: row.minutes_since_request,
            minutes_since_accept: row.minutes_since_accept,
            ride_status_at_cancel: parse::<RideStatus>("ride_status_at_cancel", &row.ride_status_at_cancel)?,
            pickup_lat: row.pickup_lat,
            pickup_lng: row.pickup_lng,
            cancelled_at: row.cancelled_at,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct RideRow {
    id: Uuid,
    rider_id: Uuid,
    driver_id: Option<Uuid>,
    status: String,
    pickup_lat: f64,
    pickup_lng: f64,
    estimated_fare: Decimal,
    created_at: DateTime<Utc>,
    accepted_at: Option<DateTime<Utc>>,
}

impl TryFrom<RideRow> for RideSnapshot {
    type Error = DbError;

    fn try_from(row: RideRow) -> DbResult<Self> {
        Ok(Self {
            id: row.id,
            rider_id: row.rider_id,
            driver_id: row.driver_id,
            status: parse::<RideStatus>("status", &row.status)?,
            pickup: GeoPoint {
                lat: row.pickup_lat,
                lng: row.pickup_lng,
            },
            estimated_fare: row.estimated_fare,
            created_at: row.created_at,
            accepted_at: row.accepted_at,
        })
    }
}

#[derive(FromRow)]
struct PolicyRow {
    id: Uuid,
    name: String,
    free_cancel_window_minutes: i32,
    max_free_cancels_per_day: i32,
    max_free_cancels_per_week: i32,
    driver_no_show_minutes: i32,
    rider_no_show_minutes: i32,
    driver_penalty_threshold: i32,
    rider_penalty_threshold: i32,
    is_default: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PolicyRow> for CancellationPolicyEntity {
    fn from(row: PolicyRow) -> Self {
        let unsigned = |v: i32| v.max(0) as u32;
        Self {
            id: row.id,
            name: row.name,
            policy: CancellationPolicy {
                free_cancel_window_minutes: unsigned(row.free_cancel_window_minutes),
                max_free_cancels_per_day: unsigned(row.max_free_cancels_per_day),
                max_free_cancels_per_week: unsigned(row.max_free_cancels_per_week),
                driver_no_show_minutes: unsigned(row.driver_no_show_minutes),
                rider_no_show_minutes: unsigned(row.rider_no_show_minutes),
                driver_penalty_threshold: unsigned(row.driver_penalty_threshold),
                rider_penalty_threshold: unsigned(row.rider_penalty_threshold),
                is_default: row.is_default,
                is_active: row.is_active,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct UserAggregateRow {
    total: i64,
    today: i64,
    this_week: i64,
    this_month: i64,
    rider_this_week: i64,
    driver_this_week: i64,
    recent: i64,
    fees_charged: Option<Decimal>,
    fees_waived: Option<Decimal>,
    last_cancellation_at: Option<DateTime<Utc>>,
}

#[derive(FromRow)]
struct PlatformAggregateRow {
    total: i64,
    by_rider: i64,
    by_driver: i64,
    by_system: i64,
    fees_collected: Option<Decimal>,
    fees_waived: Option<Decimal>,
    avg_minutes: Option<f64>,
}

async fn insert_record<'e, E>(executor: E, record: &CancellationRecordEntity) -> DbResult<()>
where
    E: sqlx::PgExecutor<'e>,
{
    let sql = format!(
        "INSERT INTO {RECORDS} ({RECORD_COLUMNS}) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)"
    );
    sqlx::query(&sql)
        .bind(record.id)
        .bind(record.ride_id)
        .bind(record.rider_id)
        .bind(record.driver_id)
        .bind(record.cancelled_by.as_str())
        .bind(record.reason_code.as_str())
        .bind(record.reason_text.as_deref())
        .bind(record.fee_amount)
        .bind(record.fee_waived)
        .bind(record.waiver_reason.map(|w| w.as_str()))
        .bind(record.minutes_since_request)
        .bind(record.minutes_since_accept)
        .bind(record.ride_status_at_cancel.as_str())
        .bind(record.pickup_lat)
        .bind(record.pickup_lng)
        .bind(record.cancelled_at)
        .bind(record.created_at)
        .execute(executor)
        .await?;
    Ok(())
}

#[async_trait]
impl CancellationLedger for PgDatastore {
    async fn insert(&self, record: &CancellationRecordEntity) -> DbResult<()> {
        insert_record(&self.pool, record).await
    }

    async fn by_ride(&self, ride_id: Uuid) -> DbResult<Option<CancellationRecordEntity>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM {RECORDS} WHERE ride_id = $1");
        sqlx::query_as::<_, RecordRow>(&sql)
            .bind(ride_id)
            .fetch_optional(&self.pool)
            .await?
            .map(CancellationRecordEntity::try_from)
            .transpose()
    }

    async fn by_id(&self, id: Uuid) -> DbResult<Option<CancellationRecordEntity>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM {RECORDS} WHERE id = $1");
        sqlx::query_as::<_, RecordRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(CancellationRecordEntity::try_from)
            .transpose()
    }

    async fn count_since(
        &self,
        user_id: Uuid,
        role: PartyRole,
        since: DateTime<Utc>,
    ) -> DbResult<u32> {
        let party = match role {
            PartyRole::Rider => "cancelled_by = 'rider' AND rider_id = $1",
            PartyRole::Driver => "cancelled_by = 'driver' AND driver_id = $1",
        };
        let sql = format!("SELECT COUNT(*) FROM {RECORDS} WHERE {party} AND cancelled_at >= $2");
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(user_id)
            .bind(since)
            .fetch_one(&self.pool)
            .await?;
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    #[instrument(skip(self, windows))]
    async fn user_aggregate(
        &self,
        user_id: Uuid,
        windows: &CalendarWindows,
    ) -> DbResult<UserCancellationAggregate> {
        let sql = format!(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE cancelled_at >= $2) AS today,
                COUNT(*) FILTER (WHERE cancelled_at >= $3) AS this_week,
                COUNT(*) FILTER (WHERE cancelled_at >= $4) AS this_month,
                COUNT(*) FILTER (
                    WHERE cancelled_at >= $3 AND cancelled_by = 'rider' AND rider_id = $1
                ) AS rider_this_week,
                COUNT(*) FILTER (
                    WHERE cancelled_at >= $3 AND cancelled_by = 'driver' AND driver_id = $1
                ) AS driver_this_week,
                COUNT(*) FILTER (WHERE cancelled_at >= $5) AS recent,
                SUM(fee_amount) FILTER (WHERE NOT fee_waived) AS fees_charged,
                SUM(fee_amount) FILTER (WHERE fee_waived) AS fees_waived,
                MAX(cancelled_at) AS last_cancellation_at
            FROM {RECORDS}
            WHERE (rider_id = $1 OR driver_id = $1) AND cancelled_by <> 'system'
            "#
        );
        let row = sqlx::query_as::<_, UserAggregateRow>(&sql)
            .bind(user_id)
            .bind(windows.day_start)
            .bind(windows.week_start)
            .bind(windows.month_start)
            .bind(windows.trailing_start)
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT COUNT(*) FROM {RIDES} WHERE (rider_id = $1 OR driver_id = $1) AND created_at >= $2"
        );
        let recent_rides: i64 = sqlx::query_scalar(&sql)
            .bind(user_id)
            .bind(windows.trailing_start)
            .fetch_one(&self.pool)
            .await?;

        debug!(total = row.total, recent_rides, "User aggregate loaded");

        Ok(UserCancellationAggregate {
            total: to_count(row.total),
            today: to_count(row.today),
            this_week: to_count(row.this_week),
            this_month: to_count(row.this_month),
            rider_this_week: to_count(row.rider_this_week),
            driver_this_week: to_count(row.driver_this_week),
            total_fees_charged: row.fees_charged.unwrap_or(Decimal::ZERO),
            total_fees_waived: row.fees_waived.unwrap_or(Decimal::ZERO),
            recent_cancellations: to_count(row.recent),
            recent_rides: to_count(recent_rides),
            last_cancellation_at: row.last_cancellation_at,
        })
    }

    async fn user_history(
        &self,
        user_id: Uuid,
        limit: u32,
        offset: u64,
    ) -> DbResult<(Vec<CancellationRecordEntity>, u64)> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM {RECORDS} \
             WHERE rider_id = $1 OR driver_id = $1 \
             ORDER BY cancelled_at DESC, id DESC LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, RecordRow>(&sql)
            .bind(user_id)
            .bind(i64::from(limit))
            .bind(i64::try_from(offset).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        let sql = format!("SELECT COUNT(*) FROM {RECORDS} WHERE rider_id = $1 OR driver_id = $1");
        let total: i64 = sqlx::query_scalar(&sql)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        let records = rows
            .into_iter()
            .map(CancellationRecordEntity::try_from)
            .collect::<DbResult<Vec<_>>>()?;
        Ok((records, to_count(total)))
    }

    async fn waive(&self, id: Uuid, note: &str) -> DbResult<CancellationRecordEntity> {
        let sql = format!(
            "UPDATE {RECORDS} SET \
                 fee_waived = TRUE, \
                 waiver_reason = $2, \
                 reason_text = CASE \
                     WHEN reason_text IS NULL OR reason_text = '' THEN $3 \
                     ELSE reason_text || ' ' || $3 END \
             WHERE id = $1 RETURNING {RECORD_COLUMNS}"
        );
        let row = sqlx::query_as::<_, RecordRow>(&sql)
            .bind(id)
            .bind(WaiverReason::AdminOverride.as_str())
            .bind(note)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("cancellation {}", id)))?;
        CancellationRecordEntity::try_from(row)
    }

    #[instrument(skip(self))]
    async fn platform_aggregate(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<PlatformAggregate> {
        let sql = format!(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE cancelled_by = 'rider') AS by_rider,
                COUNT(*) FILTER (WHERE cancelled_by = 'driver') AS by_driver,
                COUNT(*) FILTER (WHERE cancelled_by = 'system') AS by_system,
                SUM(fee_amount) FILTER (WHERE NOT fee_waived) AS fees_collected,
                SUM(fee_amount) FILTER (WHERE fee_waived) AS fees_waived,
                AVG(minutes_since_request) AS avg_minutes
            FROM {RECORDS}
            WHERE cancelled_at >= $1 AND cancelled_at < $2
            "#
        );
        let row = sqlx::query_as::<_, PlatformAggregateRow>(&sql)
            .bind(from)
            .bind(to)
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT reason_code, COUNT(*) FROM {RECORDS} \
             WHERE cancelled_at >= $1 AND cancelled_at < $2 GROUP BY reason_code"
        );
        let reason_rows: Vec<(String, i64)> = sqlx::query_as(&sql)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;

        let sql = format!("SELECT COUNT(*) FROM {RIDES} WHERE created_at >= $1 AND created_at < $2");
        let rides_created: i64 = sqlx::query_scalar(&sql)
            .bind(from)
            .bind(to)
            .fetch_one(&self.pool)
            .await?;

        let reason_counts = reason_rows
            .into_iter()
            .map(|(code, count)| Ok((parse::<ReasonCode>("reason_code", &code)?, to_count(count))))
            .collect::<DbResult<Vec<_>>>()?;

        Ok(PlatformAggregate {
            total: to_count(row.total),
            by_rider: to_count(row.by_rider),
            by_driver: to_count(row.by_driver),
            by_system: to_count(row.by_system),
            fees_collected: row.fees_collected.unwrap_or(Decimal::ZERO),
            fees_waived: row.fees_waived.unwrap_or(Decimal::ZERO),
            avg_minutes_to_cancel: row.avg_minutes.unwrap_or(0.0),
            rides_created: to_count(rides_created),
            reason_counts,
        })
    }
}

#[async_trait]
impl RideGateway for PgDatastore {
    async fn load_ride(&self, ride_id: Uuid) -> DbResult<Option<RideSnapshot>> {
        let sql = format!(
            "SELECT id, rider_id, driver_id, status, pickup_lat, pickup_lng, \
                    estimated_fare, created_at, accepted_at \
             FROM {RIDES} WHERE id = $1"
        );
        sqlx::query_as::<_, RideRow>(&sql)
            .bind(ride_id)
            .fetch_optional(&self.pool)
            .await?
            .map(RideSnapshot::try_from)
            .transpose()
    }

    async fn mark_cancelled(
        &self,
        ride_id: Uuid,
        reason: ReasonCode,
        at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let sql = cancel_ride_sql();
        let result = sqlx::query(&sql)
            .bind(ride_id)
            .bind(at)
            .bind(reason.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self, record), fields(ride_id = %record.ride_id))]
    async fn commit_cancellation(&self, record: &CancellationRecordEntity) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        // The status guard serializes concurrent cancels on the row lock
        let sql = cancel_ride_sql();
        let transitioned = sqlx::query(&sql)
            .bind(record.ride_id)
            .bind(record.cancelled_at)
            .bind(record.reason_code.as_str())
            .execute(&mut *tx)
            .await?;

        if transitioned.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(DbError::InvalidState(format!(
                "ride {} is missing or already terminal",
                record.ride_id
            )));
        }

        insert_record(&mut *tx, record).await?;
        tx.commit().await?;
        debug!("Cancellation committed");
        Ok(())
    }
}

#[async_trait]
impl PolicyRepository for PgDatastore {
    async fn find_default_active(&self) -> DbResult<Option<CancellationPolicyEntity>> {
        let sql = format!(
            "SELECT id, name, free_cancel_window_minutes, max_free_cancels_per_day, \
                    max_free_cancels_per_week, driver_no_show_minutes, rider_no_show_minutes, \
                    driver_penalty_threshold, rider_penalty_threshold, is_default, is_active, \
                    created_at, updated_at \
             FROM {POLICIES} \
             WHERE is_default AND is_active \
             ORDER BY updated_at DESC LIMIT 1"
        );
        let row = sqlx::query_as::<_, PolicyRow>(&sql)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(CancellationPolicyEntity::from))
    }
}

#[async_trait]
impl HealthCheck for PgDatastore {
    async fn ping(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
