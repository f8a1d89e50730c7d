//! Ranking lifecycle
//!
//! ```text
//! DRAFT ──publish──▶ PUBLISHED
//!   │  ▲
//! reject resubmit
//!   ▼  │
//! REJECTED
//! ```
//!
//! Transitions are driven by callers; nothing expires on its own.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Lifecycle status of a ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RankingStatus {
    Draft,
    Published,
    Rejected,
}

impl RankingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RankingStatus::Draft => "DRAFT",
            RankingStatus::Published => "PUBLISHED",
            RankingStatus::Rejected => "REJECTED",
        }
    }

    /// Status after the author publishes
    pub fn publish(self) -> Result<Self, CoreError> {
        match self {
            RankingStatus::Draft => Ok(RankingStatus::Published),
            other => Err(other.invalid("publish")),
        }
    }

    /// Status after a moderator rejects
    pub fn reject(self) -> Result<Self, CoreError> {
        match self {
            RankingStatus::Draft => Ok(RankingStatus::Rejected),
            other => Err(other.invalid("reject")),
        }
    }

    /// Status after the author resubmits a rejected ranking
    pub fn resubmit(self) -> Result<Self, CoreError> {
        match self {
            RankingStatus::Rejected => Ok(RankingStatus::Draft),
            other => Err(other.invalid("resubmit")),
        }
    }

    /// Status after the author edits; edits send a rejected ranking back to draft
    pub fn after_edit(self) -> Self {
        match self {
            RankingStatus::Rejected => RankingStatus::Draft,
            other => other,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RankingStatus::Published)
    }

    fn invalid(self, action: &'static str) -> CoreError {
        CoreError::InvalidTransition {
            action,
            from: self.as_str().to_string(),
        }
    }
}

impl fmt::Display for RankingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RankingStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DRAFT" => Ok(RankingStatus::Draft),
            "PUBLISHED" => Ok(RankingStatus::Published),
            "REJECTED" => Ok(RankingStatus::Rejected),
            _ => Err(CoreError::unknown("ranking status", s)),
        }
    }
}
