//! Ride row as seen by the cancellation subsystem

use chrono::{DateTime, Utc};
use ride_core::{GeoPoint, ReasonCode, RideSnapshot, RideStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Entity;

/// Ride entity. Only `status`, `cancelled_at`, `cancellation_reason` and
/// `updated_at` are ever written by this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideEntity {
    pub id: Uuid,
    pub rider_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub status: RideStatus,
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub estimated_fare: Decimal,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<ReasonCode>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for RideEntity {
    const TABLE: &'static str = "rides";
}

impl RideEntity {
    /// A freshly requested ride
    pub fn requested(rider_id: Uuid, estimated_fare: Decimal, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            rider_id,
            driver_id: None,
            status: RideStatus::Requested,
            pickup_lat: 0.0,
            pickup_lng: 0.0,
            estimated_fare,
            created_at,
            accepted_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            updated_at: created_at,
        }
    }

    /// Assign a driver and move to `accepted`
    pub fn accepted_by(mut self, driver_id: Uuid, accepted_at: DateTime<Utc>) -> Self {
        self.driver_id = Some(driver_id);
        self.status = RideStatus::Accepted;
        self.accepted_at = Some(accepted_at);
        self.updated_at = accepted_at;
        self
    }

    pub fn with_pickup(mut self, lat: f64, lng: f64) -> Self {
        self.pickup_lat = lat;
        self.pickup_lng = lng;
        self
    }

    pub fn with_status(mut self, status: RideStatus) -> Self {
        self.status = status;
        self
    }

    pub fn snapshot(&self) -> RideSnapshot {
        RideSnapshot {
            id: self.id,
            rider_id: self.rider_id,
            driver_id: self.driver_id,
            status: self.status,
            pickup: GeoPoint {
                lat: self.pickup_lat,
                lng: self.pickup_lng,
            },
            estimated_fare: self.estimated_fare,
            created_at: self.created_at,
            accepted_at: self.accepted_at,
        }
    }

    /// Transition to `cancelled`. Returns false when the ride is already
    /// terminal and nothing was changed.
    pub fn mark_cancelled(&mut self, reason: ReasonCode, at: DateTime<Utc>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = RideStatus::Cancelled;
        self.cancelled_at = Some(at);
        self.cancellation_reason = Some(reason);
        self.updated_at = at;
        true
    }
}
