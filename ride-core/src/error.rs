//! Error types for the cancellation core

use thiserror::Error;

/// Core domain errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid reason code: {0}")]
    InvalidReasonCode(String),

    #[error("Reason code {code} cannot be used by {role}")]
    ReasonNotAllowed { code: String, role: String },

    #[error("Invalid waiver reason: {0}")]
    InvalidWaiverReason(String),

    #[error("Invalid actor role: {0}")]
    InvalidRole(String),

    #[error("Invalid ride status: {0}")]
    InvalidRideStatus(String),

    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),
}

/// Result type alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;
