//! Data Transfer Objects for API requests and responses

use chrono::{DateTime, Utc};
use ride_core::{CancelledBy, GeoPoint, ReasonCode, RideStatus, WaiverReason};
use ride_db::{CancellationRecordEntity, HistoryPage};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============ Envelope ============

/// Success envelope: `{"success": true, "data": ..., "meta": ...}`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            meta: None,
        }
    }

    pub fn with_meta(data: T, meta: PageMeta) -> Self {
        Self {
            success: true,
            data,
            meta: Some(meta),
        }
    }
}

/// Paging metadata
#[derive(Debug, Serialize)]
pub struct PageMeta {
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}

// ============ Requests ============

/// Cancel ride request
#[derive(Debug, Deserialize)]
pub struct CancelRideRequest {
    /// Reason code from the caller's catalog
    pub reason_code: Option<String>,
    pub reason_text: Option<String>,
}

/// System cancellation request (admin)
#[derive(Debug, Deserialize)]
pub struct SystemCancelRequest {
    pub reason_code: Option<String>,
}

/// Admin waive request
#[derive(Debug, Deserialize)]
pub struct WaiveRequest {
    pub reason: Option<String>,
}

/// `?page=&page_size=`; unparsable values are coerced, not rejected
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub page: Option<String>,
    pub page_size: Option<String>,
}

/// `?type=rider|driver`
#[derive(Debug, Default, Deserialize)]
pub struct ReasonsQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// `?from=YYYY-MM-DD&to=YYYY-MM-DD`
#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

// ============ Responses ============

/// Cancellation record as returned to clients
#[derive(Debug, Serialize)]
pub struct CancellationRecordResponse {
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
    pub pickup: GeoPoint,
    pub cancelled_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<CancellationRecordEntity> for CancellationRecordResponse {
    fn from(r: CancellationRecordEntity) -> Self {
        Self {
            id: r.id,
            ride_id: r.ride_id,
            rider_id: r.rider_id,
            driver_id: r.driver_id,
            cancelled_by: r.cancelled_by,
            reason_code: r.reason_code,
            reason_text: r.reason_text,
            fee_amount: r.fee_amount,
            fee_waived: r.fee_waived,
            waiver_reason: r.waiver_reason,
            minutes_since_request: r.minutes_since_request,
            minutes_since_accept: r.minutes_since_accept,
            ride_status_at_cancel: r.ride_status_at_cancel,
            pickup: GeoPoint {
                lat: r.pickup_lat,
                lng: r.pickup_lng,
            },
            cancelled_at: r.cancelled_at,
            created_at: r.created_at,
        }
    }
}

/// History page body
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub cancellations: Vec<CancellationRecordResponse>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl HistoryResponse {
    pub fn meta(&self) -> PageMeta {
        let size = u64::from(self.page_size.max(1));
        PageMeta {
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total.div_ceil(size),
        }
    }
}

impl From<HistoryPage> for HistoryResponse {
    fn from(page: HistoryPage) -> Self {
        Self {
            cancellations: page.records.into_iter().map(Into::into).collect(),
            total: page.total,
            page: page.page,
            page_size: page.page_size,
        }
    }
}

/// Acknowledgement for commands without a payload
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Liveness body
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}
