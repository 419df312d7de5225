//! Rider / driver cancellation handlers

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use ride_core::{ReasonInfo, UserCancellationStats};
use ride_db::{CancelRequest, CancellationOutcome, CancellationPreview};

use super::{json_body, lenient_int, parse_id, parse_reason_code};
use crate::dto::{
    ApiResponse, CancelRideRequest, CancellationRecordResponse, HistoryQuery, HistoryResponse,
    ReasonsQuery,
};
use crate::error::ApiResult;
use crate::middleware::AuthUser;
use crate::state::AppState;

/// GET /api/v1/rides/:ride_id/cancel/preview
pub async fn preview_cancellation(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(ride_id): Path<String>,
) -> ApiResult<Json<ApiResponse<CancellationPreview>>> {
    let ride_id = parse_id(&ride_id, "ride id")?;
    let preview = state.service.preview(ride_id, caller.user_id).await?;
    Ok(Json(ApiResponse::ok(preview)))
}

/// POST /api/v1/rides/:ride_id/cancel
pub async fn cancel_ride(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(ride_id): Path<String>,
    payload: Result<Json<CancelRideRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<CancellationOutcome>>> {
    let ride_id = parse_id(&ride_id, "ride id")?;
    let body = json_body(payload)?;
    let request = CancelRequest {
        reason_code: parse_reason_code(body.reason_code.as_deref())?,
        reason_text: body.reason_text,
    };

    let outcome = state.service.cancel(ride_id, caller.user_id, request).await?;
    Ok(Json(ApiResponse::ok(outcome)))
}

/// GET /api/v1/rides/:ride_id/cancellation
pub async fn get_cancellation(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(ride_id): Path<String>,
) -> ApiResult<Json<ApiResponse<CancellationRecordResponse>>> {
    let ride_id = parse_id(&ride_id, "ride id")?;
    let record = state.service.get_details(ride_id, &caller).await?;
    Ok(Json(ApiResponse::ok(record.into())))
}

/// GET /api/v1/cancellations/stats
pub async fn my_stats(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> ApiResult<Json<ApiResponse<UserCancellationStats>>> {
    let stats = state.service.my_stats(&caller).await?;
    Ok(Json(ApiResponse::ok(stats)))
}

/// GET /api/v1/cancellations/history
pub async fn my_history(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<ApiResponse<HistoryResponse>>> {
    let page = state
        .service
        .my_history(
            &caller,
            lenient_int(query.page.as_deref()),
            lenient_int(query.page_size.as_deref()),
        )
        .await?;

    let body = HistoryResponse::from(page);
    let meta = body.meta();
    Ok(Json(ApiResponse::with_meta(body, meta)))
}

/// GET /api/v1/cancellations/reasons
pub async fn list_reasons(
    State(state): State<AppState>,
    Query(query): Query<ReasonsQuery>,
) -> Json<ApiResponse<Vec<ReasonInfo>>> {
    let is_driver = query
        .kind
        .as_deref()
        .is_some_and(|k| k.trim().eq_ignore_ascii_case("driver"));
    Json(ApiResponse::ok(state.service.reasons(is_driver)))
}
