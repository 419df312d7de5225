//! API Router
//!
//! Three groups share one state: public routes, routes behind `require_auth`
//! and admin routes behind `require_auth` then `require_admin`.

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware, state::AppState};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let auth = state.auth.clone();

    let public = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/health/ready", get(handlers::readiness))
        .route("/api/v1/cancellations/reasons", get(handlers::list_reasons));

    let user = Router::new()
        .route(
            "/api/v1/rides/:ride_id/cancel/preview",
            get(handlers::preview_cancellation),
        )
        .route("/api/v1/rides/:ride_id/cancel", post(handlers::cancel_ride))
        .route(
            "/api/v1/rides/:ride_id/cancellation",
            get(handlers::get_cancellation),
        )
        .route("/api/v1/cancellations/stats", get(handlers::my_stats))
        .route("/api/v1/cancellations/history", get(handlers::my_history))
        .route_layer(from_fn_with_state(auth.clone(), middleware::require_auth));

    // route_layer: the last layer added runs first
    let admin = Router::new()
        .route(
            "/api/v1/admin/cancellations/:cancellation_id/waive",
            post(handlers::waive_fee),
        )
        .route(
            "/api/v1/admin/cancellations/stats",
            get(handlers::platform_stats),
        )
        .route(
            "/api/v1/admin/cancellations/users/:user_id/stats",
            get(handlers::user_stats),
        )
        .route(
            "/api/v1/admin/cancellations/policy",
            get(handlers::active_policy),
        )
        .route(
            "/api/v1/admin/rides/:ride_id/cancel",
            post(handlers::system_cancel),
        )
        .route_layer(from_fn(middleware::require_admin))
        .route_layer(from_fn_with_state(auth, middleware::require_auth));

    public.merge(user).merge(admin).with_state(state)
}
