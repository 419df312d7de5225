//! Postgres schema for the cancellation subsystem
//!
//! The `rides` relation belongs to the ride lifecycle service and is not
//! created here.

/// Cancellation tables and indexes
pub const CANCELLATION_SCHEMA: &str = r#"
-- ============================================
-- Cancellation Ledger (append-only)
-- ============================================
CREATE TABLE IF NOT EXISTS cancellation_records (
    id UUID PRIMARY KEY,
    ride_id UUID NOT NULL,
    rider_id UUID NOT NULL,
    driver_id UUID,
    cancelled_by TEXT NOT NULL CHECK (cancelled_by IN ('rider', 'driver', 'system')),
    reason_code TEXT NOT NULL,
    reason_text TEXT,
    fee_amount NUMERIC(12, 2) NOT NULL DEFAULT 0 CHECK (fee_amount >= 0),
    fee_waived BOOLEAN NOT NULL DEFAULT FALSE,
    waiver_reason TEXT,
    minutes_since_request DOUBLE PRECISION NOT NULL CHECK (minutes_since_request >= 0),
    minutes_since_accept DOUBLE PRECISION,
    ride_status_at_cancel TEXT NOT NULL,
    pickup_lat DOUBLE PRECISION NOT NULL,
    pickup_lng DOUBLE PRECISION NOT NULL,
    cancelled_at TIMESTAMPTZ NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT cancellation_waiver_has_reason CHECK (NOT fee_waived OR waiver_reason IS NOT NULL),
    CONSTRAINT cancellation_driver_present CHECK (cancelled_by <> 'driver' OR driver_id IS NOT NULL)
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_cancellation_records_ride_id
    ON cancellation_records (ride_id);
CREATE INDEX IF NOT EXISTS idx_cancellation_records_cancelled_at
    ON cancellation_records (cancelled_at);
CREATE INDEX IF NOT EXISTS idx_cancellation_records_rider
    ON cancellation_records (rider_id, cancelled_at);
CREATE INDEX IF NOT EXISTS idx_cancellation_records_driver
    ON cancellation_records (driver_id, cancelled_at);

-- ============================================
-- Cancellation Policies
-- ============================================
CREATE TABLE IF NOT EXISTS cancellation_policies (
    id UUID PRIMARY KEY,
    name TEXT NOT NULL,
    free_cancel_window_minutes INTEGER NOT NULL CHECK (free_cancel_window_minutes >= 0),
    max_free_cancels_per_day INTEGER NOT NULL CHECK (max_free_cancels_per_day >= 0),
    max_free_cancels_per_week INTEGER NOT NULL,
    driver_no_show_minutes INTEGER NOT NULL,
    rider_no_show_minutes INTEGER NOT NULL,
    driver_penalty_threshold INTEGER NOT NULL,
    rider_penalty_threshold INTEGER NOT NULL,
    is_default BOOLEAN NOT NULL DEFAULT FALSE,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT cancellation_policy_week_covers_day
        CHECK (max_free_cancels_per_week >= max_free_cancels_per_day)
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_cancellation_policies_single_default
    ON cancellation_policies ((is_default))
    WHERE is_default AND is_active;
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_defines_both_tables() {
        assert!(CANCELLATION_SCHEMA.contains("CREATE TABLE IF NOT EXISTS cancellation_records"));
        assert!(CANCELLATION_SCHEMA.contains("CREATE TABLE IF NOT EXISTS cancellation_policies"));
    }

    #[test]
    fn test_schema_enforces_one_record_per_ride() {
        assert!(CANCELLATION_SCHEMA.contains("CREATE UNIQUE INDEX IF NOT EXISTS idx_cancellation_records_ride_id"));
        assert!(!CANCELLATION_SCHEMA.contains("CREATE TABLE IF NOT EXISTS rides"));
    }
}
