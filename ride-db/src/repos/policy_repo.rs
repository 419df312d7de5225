//! Cancellation policy repository

use async_trait::async_trait;

use crate::entities::CancellationPolicyEntity;
use crate::error::DbResult;

#[async_trait]
pub trait PolicyRepository: Send + Sync {
    /// The policy flagged both default and active, if any
    async fn find_default_active(&self) -> DbResult<Option<CancellationPolicyEntity>>;
}
