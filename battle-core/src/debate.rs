//! Debate rules
//!
//! A creator stakes a coin reward on one of their rankings. Another author
//! challenges with their own ranking, the community votes, and either
//! participant can end the debate. The side with strictly more votes takes
//! twice the stake; a tie pays nobody.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Stake used when the creator does not name one
pub const DEFAULT_DEBATE_REWARD: i64 = 100;

/// Number of debates returned by the listing
pub const DEBATE_PAGE_SIZE: i64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebateStatus {
    Open,
    Active,
    Ended,
}

impl DebateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DebateStatus::Open => "open",
            DebateStatus::Active => "active",
            DebateStatus::Ended => "ended",
        }
    }

    /// Open debates accept one challenger
    pub fn challenge(self) -> Result<Self, CoreError> {
        self.expect(DebateStatus::Open)?;
        Ok(DebateStatus::Active)
    }

    /// Votes are only counted while active
    pub fn ensure_voting(self) -> Result<(), CoreError> {
        self.expect(DebateStatus::Active)
    }

    pub fn end(self) -> Result<Self, CoreError> {
        self.expect(DebateStatus::Active)?;
        Ok(DebateStatus::Ended)
    }

    fn expect(self, expected: DebateStatus) -> Result<(), CoreError> {
        if self == expected {
            Ok(())
        } else {
            Err(CoreError::DebateState {
                expected: expected.as_str().to_string(),
                actual: self.as_str().to_string(),
            })
        }
    }
}

impl fmt::Display for DebateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DebateStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(DebateStatus::Open),
            "active" => Ok(DebateStatus::Active),
            "ended" => Ok(DebateStatus::Ended),
            _ => Err(CoreError::unknown("debate status", s)),
        }
    }
}

/// Side a vote is cast for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebateSide {
    Creator,
    Challenger,
}

impl DebateSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            DebateSide::Creator => "creator",
            DebateSide::Challenger => "challenger",
        }
    }
}

impl FromStr for DebateSide {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "creator" => Ok(DebateSide::Creator),
            "challenger" => Ok(DebateSide::Challenger),
            _ => Err(CoreError::unknown("debate side", s)),
        }
    }
}

/// Winning side, or `None` on a tie
pub fn decide_winner(creator_votes: i64, challenger_votes: i64) -> Option<DebateSide> {
    match creator_votes.cmp(&challenger_votes) {
        std::cmp::Ordering::Greater => Some(DebateSide::Creator),
        std::cmp::Ordering::Less => Some(DebateSide::Challenger),
        std::cmp::Ordering::Equal => None,
    }
}

/// Coins credited to the winner
pub fn winner_payout(reward: i64) -> i64 {
    reward.saturating_mul(2)
}

/// Reject non-positive stakes
pub fn validate_reward(reward: i64) -> Result<i64, CoreError> {
    if reward <= 0 {
        return Err(CoreError::InvalidAmount("Reward must be greater than zero".into()));
    }
    Ok(reward)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle() {
        let active = DebateStatus::Open.challenge().unwrap();
        assert_eq!(active, DebateStatus::Active);
        assert!(active.ensure_voting().is_ok());
        assert_eq!(active.end().unwrap(), DebateStatus::Ended);

        assert!(DebateStatus::Active.challenge().is_err());
        assert!(DebateStatus::Open.ensure_voting().is_err());
        assert!(DebateStatus::Ended.end().is_err());
    }

    #[test]
    fn test_winner() {
        assert_eq!(decide_winner(3, 1), Some(DebateSide::Creator));
        assert_eq!(decide_winner(0, 2), Some(DebateSide::Challenger));
        assert_eq!(decide_winner(4, 4), None);
    }

    #[test]
    fn test_payout_and_reward() {
        assert_eq!(winner_payout(DEFAULT_DEBATE_REWARD), 200);
        assert!(validate_reward(0).is_err());
        assert_eq!(validate_reward(50).unwrap(), 50);
    }

    #[test]
    fn test_state_error_message() {
        let err = DebateStatus::Ended.challenge().unwrap_err();
        assert_eq!(err.to_string(), "Debate is ended, expected open");
    }
}
