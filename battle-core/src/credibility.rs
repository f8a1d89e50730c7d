//! Author credibility
//!
//! Credibility is recomputed from scratch from two counters every time one of
//! them changes, so liking and then unliking a ranking leaves the author's
//! score exactly where it started.

use serde::{Deserialize, Serialize};

/// Weights and thresholds for credibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredibilityWeights {
    /// Points per like received
    #[serde(default = "default_like_weight")]
    pub per_like: i64,

    /// Points per published ranking
    #[serde(default = "default_ranking_weight")]
    pub per_published_ranking: i64,

    /// Minimum score for the authoritative flag
    #[serde(default = "default_authoritative_score")]
    pub authoritative_score: i64,

    /// Minimum published rankings for the authoritative flag
    #[serde(default = "default_authoritative_rankings")]
    pub authoritative_rankings: i64,
}

fn default_like_weight() -> i64 {
    2
}

fn default_ranking_weight() -> i64 {
    10
}

fn default_authoritative_score() -> i64 {
    100
}

fn default_authoritative_rankings() -> i64 {
    5
}

impl Default for CredibilityWeights {
    fn default() -> Self {
        Self {
            per_like: default_like_weight(),
            per_published_ranking: default_ranking_weight(),
            authoritative_score: default_authoritative_score(),
            authoritative_rankings: default_authoritative_rankings(),
        }
    }
}

impl CredibilityWeights {
    pub fn score(&self, likes_received: i64, rankings_published: i64) -> i64 {
        likes_received.max(0) * self.per_like
            + rankings_published.max(0) * self.per_published_ranking
    }

    pub fn authoritative(&self, score: i64, rankings_published: i64) -> bool {
        score >= self.authoritative_score && rankings_published >= self.authoritative_rankings
    }
}

/// Credibility score under the default weights
pub fn credibility_score(likes_received: i64, rankings_published: i64) -> i64 {
    CredibilityWeights::default().score(likes_received, rankings_published)
}

/// Authoritative flag under the default thresholds. Both must hold.
pub fn is_authoritative(score: i64, rankings_published: i64) -> bool {
    CredibilityWeights::default().authoritative(score, rankings_published)
}
