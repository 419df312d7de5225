//! Read-only view of a ride

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::actor::PartyRole;
use crate::error::CoreError;

/// Ride lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    Requested,
    Accepted,
    InProgress,
    Completed,
    Cancelled,
}

impl RideStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Accepted => "accepted",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Terminal rides accept no further cancellation
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl std::fmt::Display for RideStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RideStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "requested" => Ok(Self::Requested),
            "accepted" => Ok(Self::Accepted),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(CoreError::InvalidRideStatus(other.to_string())),
        }
    }
}

/// Pickup coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// The ride fields the cancellation subsystem consumes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideSnapshot {
    pub id: Uuid,
    pub rider_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub status: RideStatus,
    pub pickup: GeoPoint,
    pub estimated_fare: Decimal,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
}

impl RideSnapshot {
    /// Resolve the caller's role on this ride by identity match.
    ///
    /// The rider match wins if the same identity appears on both sides.
    pub fn party_role(&self, actor_id: Uuid) -> Option<PartyRole> {
        if self.rider_id == actor_id {
            Some(PartyRole::Rider)
        } else if self.driver_id == Some(actor_id) {
            Some(PartyRole::Driver)
        } else {
            None
        }
    }

    pub fn involves(&self, user_id: Uuid) -> bool {
        self.party_role(user_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ride(driver_id: Option<Uuid>) -> RideSnapshot {
        RideSnapshot {
            id: Uuid::new_v4(),
            rider_id: Uuid::new_v4(),
            driver_id,
            status: RideStatus::Accepted,
            pickup: GeoPoint { lat: 52.52, lng: 13.40 },
            estimated_fare: Decimal::new(2000, 2),
            created_at: Utc::now(),
            accepted_at: None,
        }
    }

    #[test]
    fn test_party_role_by_identity() {
        let driver = Uuid::new_v4();
        let r = ride(Some(driver));

        assert_eq!(r.party_role(r.rider_id), Some(PartyRole::Rider));
        assert_eq!(r.party_role(driver), Some(PartyRole::Driver));
        assert_eq!(r.party_role(Uuid::new_v4()), None);
    }

    #[test]
    fn test_unassigned_ride_only_authorizes_rider() {
        let r = ride(None);
        assert_eq!(r.party_role(r.rider_id), Some(PartyRole::Rider));
        assert!(!r.involves(Uuid::new_v4()));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(RideStatus::Completed.is_terminal());
        assert!(RideStatus::Cancelled.is_terminal());
        assert!(!RideStatus::Requested.is_terminal());
        assert!(!RideStatus::InProgress.is_terminal());
        assert_eq!("in_progress".parse::<RideStatus>(), Ok(RideStatus::InProgress));
        assert!("archived".parse::<RideStatus>().is_err());
    }
}
