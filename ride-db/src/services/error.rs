//! Service error categories

use thiserror::Error;
use tracing::error;

use crate::error::DbError;

/// Categorized failure returned by the cancellation service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn forbidden(what: impl Into<String>) -> Self {
        Self::Forbidden(what.into())
    }

    pub fn bad_request(what: impl Into<String>) -> Self {
        Self::BadRequest(what.into())
    }

    /// Log a persistence failure and hide it behind a generic message
    pub fn internal(operation: &'static str, err: DbError) -> Self {
        error!(operation, error = %err, "Persistence failure");
        Self::Internal("internal server error".to_string())
    }
}

impl From<ride_core::CoreError> for ServiceError {
    fn from(err: ride_core::CoreError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_hides_database_detail() {
        let err = ServiceError::internal("load_ride", DbError::Database("password=hunter2".into()));
        assert_eq!(err, ServiceError::Internal("internal server error".into()));
    }

    #[test]
    fn test_core_error_is_bad_request() {
        let err: ServiceError = ride_core::CoreError::InvalidReasonCode("warp".into()).into();
        assert!(matches!(err, ServiceError::BadRequest(msg) if msg.contains("warp")));
    }
}
