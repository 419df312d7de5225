//! Ride Cancellation Core
//!
//! Pure domain layer for ride cancellations. Nothing in this crate performs
//! I/O; persistence and transport live in `ride-db` and `ride-api`.
//!
//! # Modules
//!
//! - `types` - Closed domain types (ride status, roles, reason codes, policy, stats)
//! - `catalog` - Selectable reason codes per role with display labels
//! - `fee` - Fee decision and base-fee pricing
//! - `window` - Calendar windows used by the cancellation budgets
//!
//! # Fee decision order
//!
//! 1. Driver cancelling: never charged (`driver_fault`)
//! 2. Inside the free window (`free_cancellation_window`)
//! 3. Ride not yet accepted (`free_cancellation_window`)
//! 4. Inside the daily and weekly free budget (`first_cancellation`, fee still recorded)
//! 5. Otherwise the base fee is charged

pub mod catalog;
pub mod error;
pub mod fee;
pub mod types;
pub mod window;

pub use catalog::{reasons_for, ReasonInfo};
pub use error::{CoreError, CoreResult};
pub use fee::{FeeCalculator, FeeDecision, FeeInputs, PricingConfig};
pub use types::*;
pub use window::{elapsed_minutes, CalendarWindows};
