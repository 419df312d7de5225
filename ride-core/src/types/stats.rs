//! Derived cancellation statistics

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::actor::PartyRole;
use super::policy::CancellationPolicy;
use super::reason::ReasonCode;

/// Maximum number of reasons reported in platform stats
pub const TOP_REASONS_LIMIT: usize = 10;

/// Raw per-user counters as read from the ledger.
///
/// Totals cover every rider or driver cancellation of a ride the user took
/// part in; system cancellations are never counted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserCancellationAggregate {
    pub total: u64,
    pub today: u64,
    pub this_week: u64,
    pub this_month: u64,
    /// Cancellations the user performed as rider since Monday
    pub rider_this_week: u64,
    /// Cancellations the user performed as driver since Monday
    pub driver_this_week: u64,
    pub total_fees_charged: Decimal,
    pub total_fees_waived: Decimal,
    /// Cancellations in the trailing 30 days
    pub recent_cancellations: u64,
    /// Rides the user took part in, created in the trailing 30 days
    pub recent_rides: u64,
    pub last_cancellation_at: Option<DateTime<Utc>>,
}

/// Per-user cancellation stats with warning/penalty flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserCancellationStats {
    pub user_id: Uuid,
    pub total_cancellations: u64,
    pub cancellations_today: u64,
    pub cancellations_this_week: u64,
    pub cancellations_this_month: u64,
    pub total_fees_charged: Decimal,
    pub total_fees_waived: Decimal,
    /// Percent of rides cancelled in the trailing 30 days
    pub cancellation_rate: f64,
    pub last_cancellation_at: Option<DateTime<Utc>>,
    pub is_warned: bool,
    pub is_penalized: bool,
}

impl UserCancellationStats {
    pub fn from_aggregate(
        user_id: Uuid,
        agg: &UserCancellationAggregate,
        policy: &CancellationPolicy,
    ) -> Self {
        let weekly = [
            (PartyRole::Rider, agg.rider_this_week),
            (PartyRole::Driver, agg.driver_this_week),
        ];

        // A role with no cancellations this week never raises a flag
        let is_warned = weekly.iter().any(|(role, count)| {
            *count > 0 && *count as f64 >= policy.penalty_threshold(*role) as f64 / 2.0
        });
        let is_penalized = weekly
            .iter()
            .any(|(role, count)| *count > 0 && *count >= policy.penalty_threshold(*role) as u64);

        Self {
            user_id,
            total_cancellations: agg.total,
            cancellations_today: agg.today,
            cancellations_this_week: agg.this_week,
            cancellations_this_month: agg.this_month,
            total_fees_charged: agg.total_fees_charged,
            total_fees_waived: agg.total_fees_waived,
            cancellation_rate: percentage(agg.recent_cancellations, agg.recent_rides),
            last_cancellation_at: agg.last_cancellation_at,
            is_warned,
            is_penalized,
        }
    }
}

/// Raw platform counters over an interval
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlatformAggregate {
    pub total: u64,
    pub by_rider: u64,
    pub by_driver: u64,
    pub by_system: u64,
    pub fees_collected: Decimal,
    pub fees_waived: Decimal,
    pub avg_minutes_to_cancel: f64,
    /// Rides created in the same interval
    pub rides_created: u64,
    pub reason_counts: Vec<(ReasonCode, u64)>,
}

/// A reason's share of all cancellations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasonStat {
    pub reason_code: ReasonCode,
    pub count: u64,
    pub percentage: f64,
}

/// Platform-wide cancellation stats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformCancellationStats {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub total_cancellations: u64,
    pub rider_cancellations: u64,
    pub driver_cancellations: u64,
    pub system_cancellations: u64,
    pub total_fees_collected: Decimal,
    pub total_fees_waived: Decimal,
    pub avg_minutes_to_cancel: f64,
    pub cancellation_rate: f64,
    pub top_reasons: Vec<ReasonStat>,
}

impl PlatformCancellationStats {
    pub fn from_aggregate(from: DateTime<Utc>, to: DateTime<Utc>, agg: PlatformAggregate) -> Self {
        let mut reasons = agg.reason_counts;
        reasons.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        reasons.truncate(TOP_REASONS_LIMIT);

        let top_reasons = reasons
            .into_iter()
            .map(|(reason_code, count)| ReasonStat {
                reason_code,
                count,
                percentage: percentage(count, agg.total),
            })
            .collect();

        Self {
            from,
            to,
            total_cancellations: agg.total,
            rider_cancellations: agg.by_rider,
            driver_cancellations: agg.by_driver,
            system_cancellations: agg.by_system,
            total_fees_collected: agg.fees_collected,
            total_fees_waived: agg.fees_waived,
            avg_minutes_to_cancel: round2(agg.avg_minutes_to_cancel),
            cancellation_rate: percentage(agg.total, agg.rides_created),
            top_reasons,
        }
    }
}

/// `part / whole * 100` rounded to two places; zero when `whole` is zero
pub fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round2(part as f64 / whole as f64 * 100.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_is_zero_without_rides() {
        let agg = UserCancellationAggregate {
            recent_cancellations: 4,
            ..Default::default()
        };
        let stats =
            UserCancellationStats::from_aggregate(Uuid::new_v4(), &agg, &CancellationPolicy::builtin());
        assert_eq!(stats.cancellation_rate, 0.0);
    }

    #[test]
    fn test_rider_warning_and_penalty_flags() {
        let policy = CancellationPolicy::builtin();
        let user = Uuid::new_v4();

        let quiet = UserCancellationAggregate {
            rider_this_week: 14,
            ..Default::default()
        };
        let s = UserCancellationStats::from_aggregate(user, &quiet, &policy);
        assert!(!s.is_warned);
        assert!(!s.is_penalized);

        let warned = UserCancellationAggregate {
            rider_this_week: 15,
            ..Default::default()
        };
        let s = UserCancellationStats::from_aggregate(user, &warned, &policy);
        assert!(s.is_warned);
        assert!(!s.is_penalized);

        let penalized = UserCancellationAggregate {
            rider_this_week: 30,
            ..Default::default()
        };
        let s = UserCancellationStats::from_aggregate(user, &penalized, &policy);
        assert!(s.is_warned);
        assert!(s.is_penalized);
    }

    #[test]
    fn test_driver_flags_use_driver_threshold() {
        let agg = UserCancellationAggregate {
            driver_this_week: 20,
            ..Default::default()
        };
        let s = UserCancellationStats::from_aggregate(
            Uuid::new_v4(),
            &agg,
            &CancellationPolicy::builtin(),
        );
        assert!(s.is_penalized);
    }

    #[test]
    fn test_platform_top_reasons_sorted_and_limited() {
        let mut reason_counts: Vec<(ReasonCode, u64)> = ReasonCode::RIDER
            .iter()
            .chain(ReasonCode::DRIVER.iter())
            .enumerate()
            .map(|(i, code)| (*code, i as u64 + 1))
            .collect();
        reason_counts.reverse();
        let total: u64 = reason_counts.iter().map(|(_, c)| c).sum();

        let agg = PlatformAggregate {
            total,
            rides_created: total * 4,
            reason_counts,
            ..Default::default()
        };
        let stats = PlatformCancellationStats::from_aggregate(Utc::now(), Utc::now(), agg);

        assert_eq!(stats.top_reasons.len(), TOP_REASONS_LIMIT);
        assert_eq!(stats.top_reasons[0].count, 15);
        assert!(stats
            .top_reasons
            .windows(2)
            .all(|w| w[0].count >= w[1].count));
        assert_eq!(stats.cancellation_rate, 25.0);
        assert_eq!(stats.top_reasons[0].percentage, percentage(15, total));
    }

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(2, 3), 66.67);
        assert_eq!(percentage(0, 0), 0.0);
    }
}
