//! Reason codes and waiver reasons

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::actor::CancelledBy;
use crate::error::CoreError;

/// Selectable cancellation reason, segregated by the party that may use it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    // Rider reasons
    ChangedMind,
    DriverTooFar,
    WaitTooLong,
    WrongLocation,
    PriceChanged,
    FoundOtherRide,
    Emergency,
    Other,

    // Driver reasons
    RiderNoShow,
    RiderUnreachable,
    VehicleIssue,
    UnsafePickup,
    TooFar,
    DriverEmergency,
    DriverOther,

    // System reasons
    NoDriverFound,
    RequestTimeout,
    PaymentFailed,
    FraudDetected,
}

impl ReasonCode {
    pub const RIDER: [ReasonCode; 8] = [
        Self::ChangedMind,
        Self::DriverTooFar,
        Self::WaitTooLong,
        Self::WrongLocation,
        Self::PriceChanged,
        Self::FoundOtherRide,
        Self::Emergency,
        Self::Other,
    ];

    pub const DRIVER: [ReasonCode; 7] = [
        Self::RiderNoShow,
        Self::RiderUnreachable,
        Self::VehicleIssue,
        Self::UnsafePickup,
        Self::TooFar,
        Self::DriverEmergency,
        Self::DriverOther,
    ];

    pub const SYSTEM: [ReasonCode; 4] = [
        Self::NoDriverFound,
        Self::RequestTimeout,
        Self::PaymentFailed,
        Self::FraudDetected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChangedMind => "changed_mind",
            Self::DriverTooFar => "driver_too_far",
            Self::WaitTooLong => "wait_too_long",
            Self::WrongLocation => "wrong_location",
            Self::PriceChanged => "price_changed",
            Self::FoundOtherRide => "found_other_ride",
            Self::Emergency => "emergency",
            Self::Other => "other",
            Self::RiderNoShow => "rider_no_show",
            Self::RiderUnreachable => "rider_unreachable",
            Self::VehicleIssue => "vehicle_issue",
            Self::UnsafePickup => "unsafe_pickup",
            Self::TooFar => "too_far",
            Self::DriverEmergency => "driver_emergency",
            Self::DriverOther => "driver_other",
            Self::NoDriverFound => "no_driver_found",
            Self::RequestTimeout => "request_timeout",
            Self::PaymentFailed => "payment_failed",
            Self::FraudDetected => "fraud_detected",
        }
    }

    /// The party allowed to select this code
    pub fn owner(&self) -> CancelledBy {
        if Self::RIDER.contains(self) {
            CancelledBy::Rider
        } else if Self::DRIVER.contains(self) {
            CancelledBy::Driver
        } else {
            CancelledBy::System
        }
    }

    /// Check the code belongs to the cancelling party
    pub fn ensure_allowed_for(&self, by: CancelledBy) -> Result<(), CoreError> {
        if self.owner() == by {
            Ok(())
        } else {
            Err(CoreError::ReasonNotAllowed {
                code: self.as_str().to_string(),
                role: by.as_str().to_string(),
            })
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReasonCode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::RIDER
            .iter()
            .chain(Self::DRIVER.iter())
            .chain(Self::SYSTEM.iter())
            .find(|code| code.as_str() == s)
            .copied()
            .ok_or_else(|| CoreError::InvalidReasonCode(s.to_string()))
    }
}

/// Why a fee was not collected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaiverReason {
    FreeCancellationWindow,
    DriverFault,
    SystemIssue,
    FirstCancellation,
    AdminOverride,
    PromoExemption,
}

impl WaiverReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FreeCancellationWindow => "free_cancellation_window",
            Self::DriverFault => "driver_fault",
            Self::SystemIssue => "system_issue",
            Self::FirstCancellation => "first_cancellation",
            Self::AdminOverride => "admin_override",
            Self::PromoExemption => "promo_exemption",
        }
    }
}

impl std::fmt::Display for WaiverReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WaiverReason {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free_cancellation_window" => Ok(Self::FreeCancellationWindow),
            "driver_fault" => Ok(Self::DriverFault),
            "system_issue" => Ok(Self::SystemIssue),
            "first_cancellation" => Ok(Self::FirstCancellation),
            "admin_override" => Ok(Self::AdminOverride),
            "promo_exemption" => Ok(Self::PromoExemption),
            other => Err(CoreError::InvalidWaiverReason(other.to_string())),
        }
    }
}
