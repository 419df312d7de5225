//! Reason Catalog
//!
//! Display labels for the reason codes a party may choose from.

use serde::Serialize;

use crate::types::{PartyRole, ReasonCode};

/// A selectable reason with display text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReasonInfo {
    pub code: ReasonCode,
    pub label: &'static str,
    pub description: &'static str,
}

/// Label and description for any reason code
pub fn describe(code: ReasonCode) -> (&'static str, &'static str) {
    match code {
        ReasonCode::ChangedMind => ("Changed my mind", "I no longer need this ride"),
        ReasonCode::DriverTooFar => ("Driver too far", "The driver is too far away"),
        ReasonCode::WaitTooLong => ("Wait too long", "The estimated wait time is too long"),
        ReasonCode::WrongLocation => ("Wrong location", "I entered the wrong pickup or destination"),
        ReasonCode::PriceChanged => ("Price changed", "The price is different from what I expected"),
        ReasonCode::FoundOtherRide => ("Found another ride", "I found another way to get there"),
        ReasonCode::Emergency => ("Emergency", "I have an emergency"),
        ReasonCode::Other => ("Other", "Another reason"),
        ReasonCode::RiderNoShow => ("Rider no-show", "The rider did not show up at the pickup"),
        ReasonCode::RiderUnreachable => ("Rider unreachable", "I could not contact the rider"),
        ReasonCode::VehicleIssue => ("Vehicle issue", "My vehicle has a problem"),
        ReasonCode::UnsafePickup => ("Unsafe pickup", "The pickup location is unsafe"),
        ReasonCode::TooFar => ("Too far", "The pickup is too far away"),
        ReasonCode::DriverEmergency => ("Emergency", "I have an emergency"),
        ReasonCode::DriverOther => ("Other", "Another reason"),
        ReasonCode::NoDriverFound => ("No driver found", "No driver accepted the request"),
        ReasonCode::RequestTimeout => ("Request timed out", "The request expired before matching"),
        ReasonCode::PaymentFailed => ("Payment failed", "The payment method was declined"),
        ReasonCode::FraudDetected => ("Fraud detected", "The ride was flagged by fraud checks"),
    }
}

/// Reasons selectable by the given party, in display order
pub fn reasons_for(role: PartyRole) -> Vec<ReasonInfo> {
    let codes: &[ReasonCode] = match role {
        PartyRole::Rider => &ReasonCode::RIDER,
        PartyRole::Driver => &ReasonCode::DRIVER,
    };

    codes
        .iter()
        .map(|code| {
            let (label, description) = describe(*code);
            ReasonInfo {
                code: *code,
                label,
                description,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CancelledBy;

    #[test]
    fn test_rider_catalog() {
        let reasons = reasons_for(PartyRole::Rider);
        assert_eq!(reasons.len(), 8);
        assert_eq!(reasons[0].code, ReasonCode::ChangedMind);
        assert!(reasons.iter().all(|r| r.code.owner() == CancelledBy::Rider));
    }

    #[test]
    fn test_driver_catalog_excludes_system_codes() {
        let reasons = reasons_for(PartyRole::Driver);
        assert_eq!(reasons.len(), 7);
        assert!(reasons.iter().all(|r| r.code.owner() == CancelledBy::Driver));
        assert!(!reasons.iter().any(|r| r.code == ReasonCode::NoDriverFound));
    }

    #[test]
    fn test_catalog_serializes_codes() {
        let json = serde_json::to_value(reasons_for(PartyRole::Driver)).unwrap();
        assert_eq!(json[0]["code"], "rider_no_show");
        assert_eq!(json[0]["label"], "Rider no-show");
    }
}
