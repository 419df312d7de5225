//! Admin handlers
//!
//! Mounted behind `require_admin`; the service re-checks the role.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use ride_core::{CancellationPolicy, PlatformCancellationStats, UserCancellationStats};
use ride_db::CancellationOutcome;

use super::{json_body, parse_id, parse_reason_code};
use crate::dto::{ApiResponse, MessageResponse, StatsQuery, SystemCancelRequest, WaiveRequest};
use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::state::AppState;

fn parse_date(raw: Option<&str>, name: &str) -> ApiResult<Option<NaiveDate>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ApiError::bad_request(format!("'{}' must be a YYYY-MM-DD date", name))),
    }
}

/// POST /api/v1/admin/cancellations/:cancellation_id/waive
pub async fn waive_fee(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(cancellation_id): Path<String>,
    payload: Result<Json<WaiveRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<MessageResponse>>> {
    let cancellation_id = parse_id(&cancellation_id, "cancellation id")?;
    let body = json_body(payload)?;
    let reason = body.reason.unwrap_or_default();

    state
        .service
        .admin_waive(&caller, cancellation_id, &reason)
        .await?;
    Ok(Json(ApiResponse::ok(MessageResponse {
        message: "Cancellation fee waived".to_string(),
    })))
}

/// GET /api/v1/admin/cancellations/stats
pub async fn platform_stats(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Json<ApiResponse<PlatformCancellationStats>>> {
    let from = parse_date(query.from.as_deref(), "from")?;
    let to = parse_date(query.to.as_deref(), "to")?;
    let stats = state.service.admin_stats(&caller, from, to).await?;
    Ok(Json(ApiResponse::ok(stats)))
}

/// GET /api/v1/admin/cancellations/users/:user_id/stats
pub async fn user_stats(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(user_id): Path<String>,
) -> ApiResult<Json<ApiResponse<UserCancellationStats>>> {
    let user_id = parse_id(&user_id, "user id")?;
    let stats = state.service.admin_user_stats(&caller, user_id).await?;
    Ok(Json(ApiResponse::ok(stats)))
}

/// GET /api/v1/admin/cancellations/policy
pub async fn active_policy(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> ApiResult<Json<ApiResponse<CancellationPolicy>>> {
    let policy = state.service.active_policy(&caller).await?;
    Ok(Json(ApiResponse::ok(policy)))
}

/// POST /api/v1/admin/rides/:ride_id/cancel
pub async fn system_cancel(
    State(state): State<AppState>,
    Path(ride_id): Path<String>,
    payload: Result<Json<SystemCancelRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<CancellationOutcome>>> {
    let ride_id = parse_id(&ride_id, "ride id")?;
    let body = json_body(payload)?;
    let reason_code = parse_reason_code(body.reason_code.as_deref())?;

    let outcome = state.service.system_cancel(ride_id, reason_code).await?;
    Ok(Json(ApiResponse::ok(outcome)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date(None, "from").unwrap(), None);
        assert_eq!(parse_date(Some(""), "from").unwrap(), None);
        assert_eq!(
            parse_date(Some("2024-02-29"), "from").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
        assert!(parse_date(Some("29/02/2024"), "to").is_err());
    }
}
