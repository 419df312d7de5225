//! Database error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Entity already exists: {0}")]
    Duplicate(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::NotFound("row not found".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::Duplicate(db.message().to_string())
            }
            sqlx::Error::PoolTimedOut => Self::Timeout("connection pool timed out".to_string()),
            _ => Self::Database(err.to_string()),
        }
    }
}

impl From<ride_core::CoreError> for DbError {
    fn from(err: ride_core::CoreError) -> Self {
        Self::Serialization(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        assert!(matches!(DbError::from(sqlx::Error::RowNotFound), DbError::NotFound(_)));
        assert!(matches!(DbError::from(sqlx::Error::PoolTimedOut), DbError::Timeout(_)));
    }

    #[test]
    fn test_core_errors_are_serialization_errors() {
        let err: DbError = ride_core::CoreError::InvalidReasonCode("x".to_string()).into();
        assert!(matches!(err, DbError::Serialization(_)));
    }
}
