//! Ride Cancellation API
//!
//! REST surface over [`ride_db::CancellationService`].
//!
//! ## Endpoints
//!
//! ### Health
//! - GET /health - Liveness
//! - GET /health/ready - Datastore readiness
//!
//! ### Rider / Driver (JWT required, except reasons)
//! - GET /api/v1/rides/:ride_id/cancel/preview - Preview the fee
//! - POST /api/v1/rides/:ride_id/cancel - Cancel the ride
//! - GET /api/v1/rides/:ride_id/cancellation - Cancellation record
//! - GET /api/v1/cancellations/stats - Caller's stats
//! - GET /api/v1/cancellations/history - Caller's history
//! - GET /api/v1/cancellations/reasons?type=rider|driver - Reason catalog
//!
//! ### Admin (JWT with `admin` role)
//! - POST /api/v1/admin/cancellations/:cancellation_id/waive - Waive a fee
//! - GET /api/v1/admin/cancellations/stats - Platform stats
//! - GET /api/v1/admin/cancellations/users/:user_id/stats - Per-user stats
//! - GET /api/v1/admin/cancellations/policy - Active policy
//! - POST /api/v1/admin/rides/:ride_id/cancel - System cancellation

pub mod cli;
pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use router::create_router;
pub use server::{create_server, run_server};
pub use state::AppState;

/// API version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
