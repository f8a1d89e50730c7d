//! battle-core: the rules behind Battle Top
//!
//! Everything here is a pure function or a static table. The server crate
//! persists the outputs; nothing in this crate touches storage or the clock
//! except through arguments.
//!
//! ## Modules
//!
//! - `level` - experience thresholds, level lookups, cosmetic unlocks
//! - `credibility` - author credibility score and the authoritative flag
//! - `ranking` - ranking lifecycle (draft, published, rejected)
//! - `economy` - recharge conversion, shop catalog, VIP plans
//! - `debate` - debate lifecycle and payout rules
//! - `tasks` - daily task catalog and streak arithmetic
//! - `achievements` - achievement catalog and progress metrics
//! - `features` - feature flag table

pub mod achievements;
pub mod credibility;
pub mod debate;
pub mod economy;
pub mod error;
pub mod features;
pub mod level;
pub mod ranking;
pub mod tasks;

pub use credibility::{credibility_score, is_authoritative, CredibilityWeights};
pub use error::CoreError;
pub use features::{Feature, FeatureFlags};
pub use level::{
    config_for_level, experience_from_recharge, experience_progress_percent, level_for_experience,
    next_level_threshold, ChatFrame, LevelConfig, NameStyle, MAX_LEVEL,
};
pub use ranking::RankingStatus;
