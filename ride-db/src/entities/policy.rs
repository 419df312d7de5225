//! Cancellation policy row

use chrono::{DateTime, Utc};
use ride_core::CancellationPolicy;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Entity;

/// Stored policy. At most one row is both default and active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancellationPolicyEntity {
    pub id: Uuid,
    pub name: String,
    #[serde(flatten)]
    pub policy: CancellationPolicy,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for CancellationPolicyEntity {
    const TABLE: &'static str = "cancellation_policies";
}

impl CancellationPolicyEntity {
    pub fn new(name: impl Into<String>, policy: CancellationPolicy) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            policy,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_default_active(&self) -> bool {
        self.policy.is_default && self.policy.is_active
    }
}
