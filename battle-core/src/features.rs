//! Feature flags
//!
//! Each optional product area can be switched off. A fresh deployment only
//! has subscriptions turned on; everything else is opt-in through config.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Optional product areas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Wallet,
    Shop,
    Vip,
    Debate,
    Tasks,
    Achievements,
    Leaderboard,
    Collaboration,
    Donation,
    Verification,
    LevelSystem,
    Subscription,
}

impl Feature {
    pub const ALL: [Feature; 12] = [
        Feature::Wallet,
        Feature::Shop,
        Feature::Vip,
        Feature::Debate,
        Feature::Tasks,
        Feature::Achievements,
        Feature::Leaderboard,
        Feature::Collaboration,
        Feature::Donation,
        Feature::Verification,
        Feature::LevelSystem,
        Feature::Subscription,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Wallet => "wallet",
            Feature::Shop => "shop",
            Feature::Vip => "vip",
            Feature::Debate => "debate",
            Feature::Tasks => "tasks",
            Feature::Achievements => "achievements",
            Feature::Leaderboard => "leaderboard",
            Feature::Collaboration => "collaboration",
            Feature::Donation => "donation",
            Feature::Verification => "verification",
            Feature::LevelSystem => "level_system",
            Feature::Subscription => "subscription",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feature {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Feature::ALL
            .into_iter()
            .find(|f| f.as_str() == normalized)
            .ok_or_else(|| CoreError::unknown("feature", s))
    }
}

/// On/off table for every feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    pub wallet: bool,
    pub shop: bool,
    pub vip: bool,
    pub debate: bool,
    pub tasks: bool,
    pub achievements: bool,
    pub leaderboard: bool,
    pub collaboration: bool,
    pub donation: bool,
    pub verification: bool,
    pub level_system: bool,
    pub subscription: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            wallet: false,
            shop: false,
            vip: false,
            debate: false,
            tasks: false,
            achievements: false,
            leaderboard: false,
            collaboration: false,
            donation: false,
            verification: false,
            level_system: false,
            subscription: true,
        }
    }
}

impl FeatureFlags {
    /// Every feature switched on
    pub fn all_enabled() -> Self {
        let mut flags = Self::default();
        for feature in Feature::ALL {
            flags.set(feature, true);
        }
        flags
    }

    pub fn is_enabled(&self, feature: Feature) -> bool {
        match feature {
            Feature::Wallet => self.wallet,
            Feature::Shop => self.shop,
            Feature::Vip => self.vip,
            Feature::Debate => self.debate,
            Feature::Tasks => self.tasks,
            Feature::Achievements => self.achievements,
            Feature::Leaderboard => self.leaderboard,
            Feature::Collaboration => self.collaboration,
            Feature::Donation => self.donation,
            Feature::Verification => self.verification,
            Feature::LevelSystem => self.level_system,
            Feature::Subscription => self.subscription,
        }
    }

    pub fn set(&mut self, feature: Feature, enabled: bool) {
        let slot = match feature {
            Feature::Wallet => &mut self.wallet,
            Feature::Shop => &mut self.shop,
            Feature::Vip => &mut self.vip,
            Feature::Debate => &mut self.debate,
            Feature::Tasks => &mut self.tasks,
            Feature::Achievements => &mut self.achievements,
            Feature::Leaderboard => &mut self.leaderboard,
            Feature::Collaboration => &mut self.collaboration,
            Feature::Donation => &mut self.donation,
            Feature::Verification => &mut self.verification,
            Feature::LevelSystem => &mut self.level_system,
            Feature::Subscription => &mut self.subscription,
        };
        *slot = enabled;
    }

    pub fn enabled(&self) -> Vec<Feature> {
        Feature::ALL
            .into_iter()
            .filter(|f| self.is_enabled(*f))
            .collect()
    }

    pub fn disabled(&self) -> Vec<Feature> {
        Feature::ALL
            .into_iter()
            .filter(|f| !self.is_enabled(*f))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_only_subscription() {
        let flags = FeatureFlags::default();
        assert_eq!(flags.enabled(), vec![Feature::Subscription]);
        assert_eq!(flags.disabled().len(), 11);
    }

    #[test]
    fn test_all_enabled() {
        let flags = FeatureFlags::all_enabled();
        assert!(flags.disabled().is_empty());
        assert!(flags.is_enabled(Feature::LevelSystem));
    }

    #[test]
    fn test_parse_feature() {
        assert_eq!("VIP".parse::<Feature>().unwrap(), Feature::Vip);
        assert_eq!("level_system".parse::<Feature>().unwrap(), Feature::LevelSystem);
        assert!("teleport".parse::<Feature>().is_err());
    }

    #[test]
    fn test_partial_table_keeps_defaults() {
        let flags: FeatureFlags = serde_json::from_str(r#"{"wallet": true}"#).unwrap();
        assert!(flags.wallet);
        assert!(flags.subscription);
        assert!(!flags.shop);
    }
}
