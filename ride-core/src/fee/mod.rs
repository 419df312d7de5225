//! Fee decision
//!
//! The calculator is a pure function of the actor role, ride state, elapsed
//! time, recent cancellation counts and the active policy. The base fee
//! itself is delegated to [`PricingConfig::base_fee`].

mod calculator;
mod pricing;

pub use calculator::*;
pub use pricing::*;
