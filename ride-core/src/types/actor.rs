//! Cancelling parties

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::CoreError;

/// Who cancelled a ride, as recorded on the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelledBy {
    Rider,
    Driver,
    System,
}

impl CancelledBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rider => "rider",
            Self::Driver => "driver",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for CancelledBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CancelledBy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rider" => Ok(Self::Rider),
            "driver" => Ok(Self::Driver),
            "system" => Ok(Self::System),
            other => Err(CoreError::InvalidRole(other.to_string())),
        }
    }
}

/// A party to the ride (the only roles that can request a cancellation)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyRole {
    Rider,
    Driver,
}

impl PartyRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rider => "rider",
            Self::Driver => "driver",
        }
    }
}

impl From<PartyRole> for CancelledBy {
    fn from(role: PartyRole) -> Self {
        match role {
            PartyRole::Rider => CancelledBy::Rider,
            PartyRole::Driver => CancelledBy::Driver,
        }
    }
}

impl std::fmt::Display for PartyRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
