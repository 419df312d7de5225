//! Base-fee pricing

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Parameters of the base cancellation fee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Floor of the fare-proportional part
    pub minimum_fee: Decimal,
    /// Share of the estimated fare charged
    pub fare_percentage: Decimal,
    /// Late surcharge starts after this many minutes since the request
    pub late_after_minutes: u32,
    pub late_fee_per_minute: Decimal,
    /// Hard cap on the total fee
    pub maximum_fee: Decimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            minimum_fee: Decimal::new(200, 2),
            fare_percentage: Decimal::new(10, 2),
            late_after_minutes: 5,
            late_fee_per_minute: Decimal::new(50, 2),
            maximum_fee: Decimal::new(1000, 2),
        }
    }
}

impl PricingConfig {
    /// Fee for cancelling `minutes_since_request` minutes into a ride with
    /// the given estimated fare.
    ///
    /// `max(minimum, fare * percentage)` plus a per-minute surcharge for every
    /// whole minute past `late_after_minutes`, capped at `maximum_fee` and
    /// rounded to cents. Never negative.
    pub fn base_fee(&self, minutes_since_request: f64, estimated_fare: Decimal) -> Decimal {
        let fare = estimated_fare.max(Decimal::ZERO);
        let proportional = (fare * self.fare_percentage).max(self.minimum_fee);

        let minutes = if minutes_since_request.is_finite() {
            minutes_since_request.max(0.0)
        } else {
            0.0
        };
        let late_minutes = (minutes - self.late_after_minutes as f64).max(0.0).floor() as i64;
        let surcharge = self.late_fee_per_minute * Decimal::from(late_minutes);

        (proportional + surcharge)
            .min(self.maximum_fee)
            .max(Decimal::ZERO)
            .round_dp(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimum_fee_applies_to_small_fares() {
        let pricing = PricingConfig::default();
        assert_eq!(pricing.base_fee(5.0, Decimal::new(20, 0)), Decimal::new(200, 2));
        assert_eq!(pricing.base_fee(3.0, Decimal::new(5, 0)), Decimal::new(200, 2));
    }

    #[test]
    fn test_late_surcharge_counts_whole_minutes() {
        let pricing = PricingConfig::default();
        // max(2.00, 4.00) + 7 * 0.50
        assert_eq!(pricing.base_fee(12.5, Decimal::new(40, 0)), Decimal::new(750, 2));
    }

    #[test]
    fn test_fee_is_capped() {
        let pricing = PricingConfig::default();
        assert_eq!(pricing.base_fee(60.0, Decimal::new(200, 0)), Decimal::new(1000, 2));
    }

    #[test]
    fn test_degenerate_inputs_stay_non_negative() {
        let pricing = PricingConfig::default();
        assert!(pricing.base_fee(f64::NAN, Decimal::new(-10, 0)) >= Decimal::ZERO);
        assert_eq!(pricing.base_fee(-3.0, Decimal::ZERO), Decimal::new(200, 2));
    }
}
