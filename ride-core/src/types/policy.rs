//! Cancellation policy

use serde::{Deserialize, Serialize};

use super::actor::PartyRole;
use crate::error::{CoreError, CoreResult};

/// Thresholds and budgets applied to cancellations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationPolicy {
    /// Minutes after the request during which a rider cancels for free
    pub free_cancel_window_minutes: u32,
    pub max_free_cancels_per_day: u32,
    pub max_free_cancels_per_week: u32,
    pub driver_no_show_minutes: u32,
    pub rider_no_show_minutes: u32,
    /// Weekly driver cancellations at which the driver is penalized
    pub driver_penalty_threshold: u32,
    /// Weekly rider cancellations at which the rider is penalized
    pub rider_penalty_threshold: u32,
    pub is_default: bool,
    pub is_active: bool,
}

impl CancellationPolicy {
    /// Built-in policy used when no default+active policy is configured
    pub const BUILTIN: CancellationPolicy = CancellationPolicy {
        free_cancel_window_minutes: 2,
        max_free_cancels_per_day: 3,
        max_free_cancels_per_week: 10,
        driver_no_show_minutes: 5,
        rider_no_show_minutes: 5,
        driver_penalty_threshold: 20,
        rider_penalty_threshold: 30,
        is_default: true,
        is_active: true,
    };

    pub fn builtin() -> Self {
        Self::BUILTIN
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.max_free_cancels_per_week < self.max_free_cancels_per_day {
            return Err(CoreError::InvalidPolicy(format!(
                "max_free_cancels_per_week ({}) must be >= max_free_cancels_per_day ({})",
                self.max_free_cancels_per_week, self.max_free_cancels_per_day
            )));
        }
        Ok(())
    }

    /// Free cancellations left today given today's count
    pub fn free_cancels_remaining(&self, used_today: u32) -> u32 {
        self.max_free_cancels_per_day.saturating_sub(used_today)
    }

    pub fn penalty_threshold(&self, role: PartyRole) -> u32 {
        match role {
            PartyRole::Rider => self.rider_penalty_threshold,
            PartyRole::Driver => self.driver_penalty_threshold,
        }
    }
}

impl Default for CancellationPolicy {
    fn default() -> Self {
        Self::BUILTIN
    }
}
