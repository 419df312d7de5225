//! HTTP Handlers
//!
//! Handlers parse and validate input at the boundary, then delegate to
//! `CancellationService`.

pub mod admin;
pub mod cancellation;
pub mod health;

pub use admin::*;
pub use cancellation::*;
pub use health::*;

use axum::{extract::rejection::JsonRejection, Json};
use ride_core::ReasonCode;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// Parse a path segment as a UUID
pub(crate) fn parse_id(raw: &str, what: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::bad_request(format!("invalid {}", what)))
}

/// Unwrap a JSON body, turning any rejection into a 400
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::bad_request(format!("invalid request body: {}", rejection.body_text())))
}

/// A present, known reason code
pub(crate) fn parse_reason_code(raw: Option<&str>) -> ApiResult<ReasonCode> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("reason_code is required"))?;
    raw.parse::<ReasonCode>()
        .map_err(|err| ApiError::bad_request(err.to_string()))
}

/// Lenient integer query parameter: anything unparsable is treated as absent
pub(crate) fn lenient_int(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|v| v.trim().parse().ok())
}
