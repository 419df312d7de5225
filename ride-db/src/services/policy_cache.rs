//! Active policy with a TTL cache

use ride_core::CancellationPolicy;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::DbResult;
use crate::repos::PolicyRepository;

struct Cached {
    policy: CancellationPolicy,
    loaded_at: Instant,
}

/// Read-mostly cache in front of a [`PolicyRepository`].
///
/// Falls back to [`CancellationPolicy::BUILTIN`] when no default active policy
/// is stored. A zero TTL disables caching.
pub struct PolicyCache {
    ttl: Duration,
    slot: RwLock<Option<Cached>>,
}

impl PolicyCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: RwLock::new(None),
        }
    }

    pub async fn active_policy<R>(&self, repo: &R) -> DbResult<CancellationPolicy>
    where
        R: PolicyRepository + ?Sized,
    {
        if let Some(policy) = self.fresh().await {
            return Ok(policy);
        }

        let policy = match repo.find_default_active().await? {
            Some(entity) => match entity.policy.validate() {
                Ok(()) => {
                    debug!(policy = %entity.name, "Loaded active cancellation policy");
                    entity.policy
                }
                Err(err) => {
                    warn!(policy = %entity.name, error = %err, "Stored policy is invalid, using built-in");
                    CancellationPolicy::builtin()
                }
            },
            None => {
                debug!("No active cancellation policy, using built-in");
                CancellationPolicy::builtin()
            }
        };

        if !self.ttl.is_zero() {
            *self.slot.write().await = Some(Cached {
                policy: policy.clone(),
                loaded_at: Instant::now(),
            });
        }
        Ok(policy)
    }

    async fn fresh(&self) -> Option<CancellationPolicy> {
        let slot = self.slot.read().await;
        slot.as_ref()
            .filter(|cached| cached.loaded_at.elapsed() < self.ttl)
            .map(|cached| cached.policy.clone())
    }
}

impl Default for PolicyCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}
