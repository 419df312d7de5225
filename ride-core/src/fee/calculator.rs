//! Fee Calculator
//!
//! Decision order, first match wins:
//! 1. Driver cancelling
//! 2. Inside the free window
//! 3. Ride not yet accepted
//! 4. Inside the daily and weekly free budget
//! 5. Fee charged

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::pricing::PricingConfig;
use crate::types::{CancellationPolicy, PartyRole, RideStatus, WaiverReason};

/// Everything the fee decision depends on
#[derive(Debug, Clone)]
pub struct FeeInputs<'a> {
    pub role: PartyRole,
    pub ride_status: RideStatus,
    pub estimated_fare: Decimal,
    pub minutes_since_request: f64,
    /// Cancellations by this user in this role since local midnight
    pub today_count: u32,
    /// Cancellations by this user in this role since Monday 00:00 local
    pub week_count: u32,
    pub policy: &'a CancellationPolicy,
}

/// Outcome of the fee decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeDecision {
    pub fee: Decimal,
    pub waived: bool,
    pub waiver_reason: Option<WaiverReason>,
    pub explanation: String,
}

impl FeeDecision {
    fn free(reason: WaiverReason, explanation: impl Into<String>) -> Self {
        Self {
            fee: Decimal::ZERO,
            waived: true,
            waiver_reason: Some(reason),
            explanation: explanation.into(),
        }
    }

    /// Decision for a cancellation initiated by the platform
    pub fn system() -> Self {
        Self::free(WaiverReason::SystemIssue, "No fee for cancellations made by the platform")
    }

    /// The amount actually owed by the user
    pub fn amount_due(&self) -> Decimal {
        if self.waived {
            Decimal::ZERO
        } else {
            self.fee
        }
    }

    /// A waived fee always carries a reason and fees are never negative
    pub fn is_consistent(&self) -> bool {
        self.fee >= Decimal::ZERO && (!self.waived || self.waiver_reason.is_some())
    }
}

/// Pure fee decision function
#[derive(Debug, Clone, Default)]
pub struct FeeCalculator {
    pricing: PricingConfig,
}

impl FeeCalculator {
    pub fn new(pricing: PricingConfig) -> Self {
        Self { pricing }
    }

    pub fn pricing(&self) -> &PricingConfig {
        &self.pricing
    }

    pub fn decide(&self, inputs: &FeeInputs<'_>) -> FeeDecision {
        let policy = inputs.policy;

        if inputs.role == PartyRole::Driver {
            return FeeDecision::free(
                WaiverReason::DriverFault,
                "Drivers are not charged cancellation fees",
            );
        }

        if inputs.minutes_since_request < policy.free_cancel_window_minutes as f64 {
            return FeeDecision::free(
                WaiverReason::FreeCancellationWindow,
                format!(
                    "Free cancellation within {} minutes",
                    policy.free_cancel_window_minutes
                ),
            );
        }

        if inputs.ride_status == RideStatus::Requested {
            return FeeDecision::free(
                WaiverReason::FreeCancellationWindow,
                "No fee when ride hasn't been accepted",
            );
        }

        let fee = self
            .pricing
            .base_fee(inputs.minutes_since_request, inputs.estimated_fare);
        let within_day = inputs.today_count < policy.max_free_cancels_per_day;
        let within_week = inputs.week_count < policy.max_free_cancels_per_week;

        if within_day && within_week {
            return FeeDecision {
                fee,
                waived: true,
                waiver_reason: Some(WaiverReason::FirstCancellation),
                explanation: format!(
                    "Cancellation fee of {:.2} waived ({} of {} free cancellations used today)",
                    fee,
                    inputs.today_count + 1,
                    policy.max_free_cancels_per_day
                ),
            };
        }

        let exceeded = if within_day { "weekly" } else { "daily" };
        FeeDecision {
            fee,
            waived: false,
            waiver_reason: None,
            explanation: format!(
                "Cancellation fee of {:.2} applied (cancelled after {} minutes, {} free limit exceeded)",
                fee,
                inputs.minutes_since_request.floor() as i64,
                exceeded
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    static POLICY: CancellationPolicy = CancellationPolicy::BUILTIN;

    fn inputs(role: PartyRole, status: RideStatus, minutes: f64, today: u32) -> FeeInputs<'static> {
        FeeInputs {
            role,
            ride_status: status,
            estimated_fare: Decimal::new(20, 0),
            minutes_since_request: minutes,
            today_count: today,
            week_count: today,
            policy: &POLICY,
        }
    }

    #[test]
    fn test_rider_inside_free_window() {
        let d = FeeCalculator::default().decide(&inputs(PartyRole::Rider, RideStatus::Requested, 0.5, 0));
        assert_eq!(d.fee, Decimal::ZERO);
        assert!(d.waived);
        assert_eq!(d.waiver_reason, Some(WaiverReason::FreeCancellationWindow));
        assert_eq!(d.explanation, "Free cancellation within 2 minutes");
    }

    #[test]
    fn test_unaccepted_ride_is_free_after_window() {
        let d = FeeCalculator::default().decide(&inputs(PartyRole::Rider, RideStatus::Requested, 5.0, 0));
        assert_eq!(d.fee, Decimal::ZERO);
        assert!(d.waived);
        assert_eq!(d.waiver_reason, Some(WaiverReason::FreeCancellationWindow));
    }

    #[test]
    fn test_first_cancellation_records_fee() {
        let calc = FeeCalculator::default();
        let d = calc.decide(&inputs(PartyRole::Rider, RideStatus::Accepted, 5.0, 0));
        assert_eq!(d.fee, calc.pricing().base_fee(5.0, Decimal::new(20, 0)));
        assert!(d.fee > Decimal::ZERO);
        assert!(d.waived);
        assert_eq!(d.waiver_reason, Some(WaiverReason::FirstCancellation));
        assert_eq!(d.amount_due(), Decimal::ZERO);
    }

    #[test]
    fn test_daily_budget_exhausted_charges_fee() {
        let calc = FeeCalculator::default();
        let d = calc.decide(&inputs(PartyRole::Rider, RideStatus::Accepted, 5.0, 3));
        assert_eq!(d.fee, calc.pricing().base_fee(5.0, Decimal::new(20, 0)));
        assert!(!d.waived);
        assert_eq!(d.waiver_reason, None);
        assert_eq!(
            d.explanation,
            "Cancellation fee of 2.00 applied (cancelled after 5 minutes, daily free limit exceeded)"
        );
    }

    #[test]
    fn test_weekly_budget_exhausted_charges_fee() {
        let mut i = inputs(PartyRole::Rider, RideStatus::InProgress, 8.0, 1);
        i.week_count = 10;
        let d = FeeCalculator::default().decide(&i);
        assert!(!d.waived);
        assert!(d.explanation.contains("weekly free limit exceeded"));
    }

    #[test]
    fn test_driver_never_charged() {
        let d = FeeCalculator::default().decide(&inputs(PartyRole::Driver, RideStatus::Accepted, 10.0, 9));
        assert_eq!(d.fee, Decimal::ZERO);
        assert!(d.waived);
        assert_eq!(d.waiver_reason, Some(WaiverReason::DriverFault));
    }

    #[test]
    fn test_driver_rule_precedes_free_window() {
        let d = FeeCalculator::default().decide(&inputs(PartyRole::Driver, RideStatus::Requested, 0.1, 0));
        assert_eq!(d.waiver_reason, Some(WaiverReason::DriverFault));
    }

    #[test]
    fn test_system_decision() {
        let d = FeeDecision::system();
        assert!(d.waived);
        assert_eq!(d.waiver_reason, Some(WaiverReason::SystemIssue));
        assert!(d.is_consistent());
    }

    fn any_status() -> impl Strategy<Value = RideStatus> {
        prop_oneof![
            Just(RideStatus::Requested),
            Just(RideStatus::Accepted),
            Just(RideStatus::InProgress),
        ]
    }

    fn any_policy() -> impl Strategy<Value = CancellationPolicy> {
        (0u32..10, 0u32..6, 0u32..10).prop_map(|(window, per_day, extra_week)| CancellationPolicy {
            free_cancel_window_minutes: window,
            max_free_cancels_per_day: per_day,
            max_free_cancels_per_week: per_day + extra_week,
            ..CancellationPolicy::builtin()
        })
    }

    proptest! {
        #[test]
        fn prop_driver_always_free(
            status in any_status(),
            policy in any_policy(),
            minutes in 0.0f64..240.0,
            today in 0u32..20,
            week in 0u32..50,
            fare in 0i64..50_000,
        ) {
            let d = FeeCalculator::default().decide(&FeeInputs {
                role: PartyRole::Driver,
                ride_status: status,
                estimated_fare: Decimal::new(fare, 2),
                minutes_since_request: minutes,
                today_count: today,
                week_count: week,
                policy: &policy,
            });
            prop_assert_eq!(d.fee, Decimal::ZERO);
            prop_assert!(d.waived);
            prop_assert_eq!(d.waiver_reason, Some(WaiverReason::DriverFault));
        }

        #[test]
        fn prop_inside_window_is_free_for_riders(
            status in any_status(),
            policy in any_policy(),
            fraction in 0.0f64..1.0,
            today in 0u32..20,
        ) {
            prop_assume!(policy.free_cancel_window_minutes > 0);
            let minutes = fraction * policy.free_cancel_window_minutes as f64;
            let d = FeeCalculator::default().decide(&FeeInputs {
                role: PartyRole::Rider,
                ride_status: status,
                estimated_fare: Decimal::new(2000, 2),
                minutes_since_request: minutes,
                today_count: today,
                week_count: today,
                policy: &policy,
            });
            prop_assert!(d.waived);
            prop_assert_eq!(d.waiver_reason, Some(WaiverReason::FreeCancellationWindow));
        }

        #[test]
        fn prop_unaccepted_after_window_is_free(
            policy in any_policy(),
            extra in 0.0f64..120.0,
            today in 0u32..20,
        ) {
            let minutes = policy.free_cancel_window_minutes as f64 + extra;
            let d = FeeCalculator::default().decide(&FeeInputs {
                role: PartyRole::Rider,
                ride_status: RideStatus::Requested,
                estimated_fare: Decimal::new(2000, 2),
                minutes_since_request: minutes,
                today_count: today,
                week_count: today,
                policy: &policy,
            });
            prop_assert!(d.waived);
            prop_assert_eq!(d.waiver_reason, Some(WaiverReason::FreeCancellationWindow));
        }

        #[test]
        fn prop_daily_budget_exhausted_is_charged(
            status in prop_oneof![Just(RideStatus::Accepted), Just(RideStatus::InProgress)],
            policy in any_policy(),
            extra in 0.0f64..120.0,
            over in 0u32..5,
            week in 0u32..50,
        ) {
            let d = FeeCalculator::default().decide(&FeeInputs {
                role: PartyRole::Rider,
                ride_status: status,
                estimated_fare: Decimal::new(2000, 2),
                minutes_since_request: policy.free_cancel_window_minutes as f64 + extra,
                today_count: policy.max_free_cancels_per_day + over,
                week_count: week,
                policy: &policy,
            });
            prop_assert!(!d.waived);
            prop_assert!(d.waiver_reason.is_none());
        }

        #[test]
        fn prop_decisions_are_consistent(
            role in prop_oneof![Just(PartyRole::Rider), Just(PartyRole::Driver)],
            status in any_status(),
            policy in any_policy(),
            minutes in 0.0f64..240.0,
            today in 0u32..20,
            week in 0u32..50,
        ) {
            let d = FeeCalculator::default().decide(&FeeInputs {
                role,
                ride_status: status,
                estimated_fare: Decimal::new(3150, 2),
                minutes_since_request: minutes,
                today_count: today,
                week_count: week,
                policy: &policy,
            });
            prop_assert!(d.is_consistent());
        }
    }
}
