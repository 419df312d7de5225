//! Cancellation ledger record

use chrono::{DateTime, Utc};
use ride_core::{CancelledBy, ReasonCode, RideStatus, WaiverReason};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Entity;

/// One cancellation event; amended only by admin waiver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancellationRecordEntity {
    pub id: Uuid,
    pub ride_id: Uuid,
    pub rider_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub cancelled_by: CancelledBy,
    pub reason_code: ReasonCode,
    pub reason_text: Option<String>,
    pub fee_amount: Decimal,
    pub fee_waived: bool,
    pub waiver_reason: Option<WaiverReason>,
    pub minutes_since_request: f64,
    pub minutes_since_accept: Option<f64>,
    pub ride_status_at_cancel: RideStatus,
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub cancelled_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Entity for CancellationRecordEntity {
    const TABLE: &'static str = "cancellation_records";
}

impl CancellationRecordEntity {
    /// The user is the ride's rider or its driver
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.rider_id == user_id || self.driver_id == Some(user_id)
    }

    /// The user performed this cancellation (system cancellations never match)
    pub fn cancelled_by_user(&self, user_id: Uuid) -> bool {
        match self.cancelled_by {
            CancelledBy::Rider => self.rider_id == user_id,
            CancelledBy::Driver => self.driver_id == Some(user_id),
            CancelledBy::System => false,
        }
    }

    /// Mark the fee waived by an administrator and append the audit note
    pub fn apply_admin_waiver(&mut self, note: &str) {
        self.fee_waived = true;
        self.waiver_reason = Some(WaiverReason::AdminOverride);
        self.reason_text = Some(append_note(self.reason_text.as_deref(), note));
    }

    /// Record-local invariants: waived implies a reason, non-negative fee,
    /// driver cancellations carry a driver.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.fee_waived && self.waiver_reason.is_none() {
            return Err(format!("record {} is waived without a waiver reason", self.id));
        }
        if self.fee_amount < Decimal::ZERO {
            return Err(format!("record {} has a negative fee", self.id));
        }
        if self.cancelled_by == CancelledBy::Driver && self.driver_id.is_none() {
            return Err(format!("record {} cancelled by driver without driver_id", self.id));
        }
        if self.minutes_since_request < 0.0 {
            return Err(format!("record {} has negative elapsed minutes", self.id));
        }
        Ok(())
    }
}

/// Audit note written by an admin waiver
pub fn admin_waiver_note(reason: &str) -> String {
    format!("[Admin waived: {}]", reason)
}

/// Append `note` to existing free text, separated by a space
pub fn append_note(existing: Option<&str>, note: &str) -> String {
    match existing {
        Some(text) if !text.is_empty() => format!("{} {}", text, note),
        _ => note.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(cancelled_by: CancelledBy, driver_id: Option<Uuid>) -> CancellationRecordEntity {
        let now = Utc::now();
        CancellationRecordEntity {
            id: Uuid::new_v4(),
            ride_id: Uuid::new_v4(),
            rider_id: Uuid::new_v4(),
            driver_id,
            cancelled_by,
            reason_code: ReasonCode::ChangedMind,
            reason_text: None,
            fee_amount: Decimal::new(250, 2),
            fee_waived: false,
            waiver_reason: None,
            minutes_since_request: 4.0,
            minutes_since_accept: Some(1.0),
            ride_status_at_cancel: RideStatus::Accepted,
            pickup_lat: 0.0,
            pickup_lng: 0.0,
            cancelled_at: now,
            created_at: now,
        }
    }

    #[test]
    fn test_admin_waiver_appends_note() {
        let mut r = record(CancelledBy::Rider, None);
        r.reason_text = Some("late".to_string());
        r.apply_admin_waiver(&admin_waiver_note("goodwill"));

        assert!(r.fee_waived);
        assert_eq!(r.waiver_reason, Some(WaiverReason::AdminOverride));
        assert_eq!(r.reason_text.as_deref(), Some("late [Admin waived: goodwill]"));
        assert!(r.check_invariants().is_ok());
    }

    #[test]
    fn test_admin_waiver_on_empty_text() {
        let mut r = record(CancelledBy::Rider, None);
        r.reason_text = Some(String::new());
        r.apply_admin_waiver(&admin_waiver_note("x"));
        assert_eq!(r.reason_text.as_deref(), Some("[Admin waived: x]"));
    }

    #[test]
    fn test_cancelled_by_user() {
        let driver = Uuid::new_v4();
        let r = record(CancelledBy::Driver, Some(driver));
        assert!(r.cancelled_by_user(driver));
        assert!(!r.cancelled_by_user(r.rider_id));
        assert!(r.involves(r.rider_id));

        let s = record(CancelledBy::System, Some(driver));
        assert!(!s.cancelled_by_user(driver));
        assert!(!s.cancelled_by_user(s.rider_id));
    }

    #[test]
    fn test_invariant_violations_detected() {
        let mut r = record(CancelledBy::Rider, None);
        r.fee_waived = true;
        assert!(r.check_invariants().is_err());

        let d = record(CancelledBy::Driver, None);
        assert!(d.check_invariants().is_err());
    }
}
