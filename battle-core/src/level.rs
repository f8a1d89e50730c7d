//! Level table and experience arithmetic
//!
//! Experience only comes from recharging: one currency unit is worth 100
//! experience. Levels run from 1 to 20 and each level carries the cosmetic
//! tiers a user unlocks on reaching it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Highest reachable level
pub const MAX_LEVEL: u32 = 20;

/// Experience granted per currency unit recharged
pub const EXP_PER_RECHARGE_UNIT: f64 = 100.0;

/// Chat frame tier shown around a user's messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatFrame {
    Bronze,
    Silver,
    Gold,
    Diamond,
}

impl ChatFrame {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatFrame::Bronze => "bronze",
            ChatFrame::Silver => "silver",
            ChatFrame::Gold => "gold",
            ChatFrame::Diamond => "diamond",
        }
    }
}

impl fmt::Display for ChatFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name rendering style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameStyle {
    Default,
    Colorful,
}

impl NameStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            NameStyle::Default => "default",
            NameStyle::Colorful => "colorful",
        }
    }
}

impl fmt::Display for NameStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the level table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelConfig {
    pub level: u32,
    pub name: &'static str,
    pub exp_threshold: u64,
    pub chat_frame: ChatFrame,
    pub name_style: NameStyle,
}

const fn row(
    level: u32,
    name: &'static str,
    exp_threshold: u64,
    chat_frame: ChatFrame,
    name_style: NameStyle,
) -> LevelConfig {
    LevelConfig {
        level,
        name,
        exp_threshold,
        chat_frame,
        name_style,
    }
}

use ChatFrame::{Bronze, Diamond, Gold, Silver};
use NameStyle::{Colorful, Default as Plain};

/// Level table, ordered by level. Thresholds strictly increase.
pub const LEVEL_TABLE: [LevelConfig; MAX_LEVEL as usize] = [
    row(1, "Recruit", 0, Bronze, Plain),
    row(2, "Private", 500, Bronze, Plain),
    row(3, "Private First Class", 1_500, Bronze, Plain),
    row(4, "Corporal", 3_000, Bronze, Plain),
    row(5, "Lance Sergeant", 5_000, Silver, Plain),
    row(6, "Sergeant", 7_500, Silver, Plain),
    row(7, "Staff Sergeant", 10_500, Silver, Plain),
    row(8, "Sergeant Major", 14_000, Silver, Plain),
    row(9, "Warrant Officer", 18_000, Silver, Plain),
    row(10, "Centurion", 22_500, Gold, Colorful),
    row(11, "Major", 28_000, Gold, Colorful),
    row(12, "Lieutenant Colonel", 34_000, Gold, Colorful),
    row(13, "Colonel", 41_000, Gold, Colorful),
    row(14, "Senior Colonel", 49_000, Gold, Colorful),
    row(15, "Brigadier", 58_000, Gold, Colorful),
    row(16, "Major General", 68_000, Gold, Colorful),
    row(17, "Lieutenant General", 79_000, Gold, Colorful),
    row(18, "General", 91_000, Gold, Colorful),
    row(19, "Grand General", 95_000, Diamond, Colorful),
    row(20, "Marshal", 100_000, Diamond, Colorful),
];

/// Highest level whose threshold is at or below `exp`
pub fn level_for_experience(exp: u64) -> u32 {
    LEVEL_TABLE
        .iter()
        .rev()
        .find(|cfg| cfg.exp_threshold <= exp)
        .map(|cfg| cfg.level)
        .unwrap_or(1)
}

/// Table row for `level`, falling back to level 1 when out of range
pub fn config_for_level(level: u32) -> LevelConfig {
    LEVEL_TABLE
        .iter()
        .find(|cfg| cfg.level == level)
        .copied()
        .unwrap_or(LEVEL_TABLE[0])
}

/// Experience needed for the level after `level`, capped at the top level
pub fn next_level_threshold(level: u32) -> u64 {
    let next = level.saturating_add(1).min(MAX_LEVEL);
    config_for_level(next.max(1)).exp_threshold
}

/// Progress through the current level as a whole percentage in 0..=100
pub fn experience_progress_percent(exp: u64, level: u32) -> u8 {
    let level = level.clamp(1, MAX_LEVEL);
    let current = config_for_level(level).exp_threshold;
    let next = next_level_threshold(level);

    if next <= current {
        return 100;
    }

    let gained = exp.saturating_sub(current);
    let span = next - current;
    let percent = gained.saturating_mul(100) / span;
    percent.min(100) as u8
}

/// Experience earned by recharging `amount` currency units
///
/// Fractional experience is floored; negative or non-finite amounts earn
/// nothing.
pub fn experience_from_recharge(amount: f64) -> u64 {
    if !amount.is_finite() || amount <= 0.0 {
        return 0;
    }
    (amount * EXP_PER_RECHARGE_UNIT).floor() as u64
}

/// Cosmetic unlocks held at a level
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelUnlocks {
    pub chat_frames: Vec<ChatFrame>,
    pub name_styles: Vec<NameStyle>,
}

/// Every frame and name style available at `level`
pub fn level_unlocks(level: u32) -> LevelUnlocks {
    let level = level.clamp(1, MAX_LEVEL);
    let mut chat_frames = vec![ChatFrame::Bronze];
    if level >= 5 {
        chat_frames.push(ChatFrame::Silver);
    }
    if level >= 10 {
        chat_frames.push(ChatFrame::Gold);
    }
    if level >= MAX_LEVEL {
        chat_frames.push(ChatFrame::Diamond);
    }

    let mut name_styles = vec![NameStyle::Default];
    if level >= 10 {
        name_styles.push(NameStyle::Colorful);
    }

    LevelUnlocks {
        chat_frames,
        name_styles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_strictly_increasing() {
        for pair in LEVEL_TABLE.windows(2) {
            assert_eq!(pair[1].level, pair[0].level + 1);
            assert!(pair[1].exp_threshold > pair[0].exp_threshold);
        }
    }

    #[test]
    fn test_level_bounds() {
        assert_eq!(level_for_experience(0), 1);
        assert_eq!(level_for_experience(499), 1);
        assert_eq!(level_for_experience(500), 2);
        assert_eq!(level_for_experience(99_999), 19);
        assert_eq!(level_for_experience(100_000), 20);
        assert_eq!(level_for_experience(u64::MAX), 20);
    }

    #[test]
    fn test_level_is_monotonic() {
        let mut previous = 1;
        for exp in (0..120_000).step_by(250) {
            let level = level_for_experience(exp);
            assert!(level >= previous, "level dropped at exp {}", exp);
            previous = level;
        }
    }

    #[test]
    fn test_config_fallback() {
        assert_eq!(config_for_level(0).level, 1);
        assert_eq!(config_for_level(21).level, 1);
        assert_eq!(config_for_level(10).chat_frame, ChatFrame::Gold);
        assert_eq!(config_for_level(10).name_style, NameStyle::Colorful);
        assert_eq!(config_for_level(9).name_style, NameStyle::Default);
    }

    #[test]
    fn test_next_threshold_caps() {
        assert_eq!(next_level_threshold(1), 500);
        assert_eq!(next_level_threshold(19), 100_000);
        assert_eq!(next_level_threshold(20), 100_000);
        assert_eq!(next_level_threshold(99), 100_000);
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(experience_progress_percent(0, 1), 0);
        assert_eq!(experience_progress_percent(250, 1), 50);
        assert_eq!(experience_progress_percent(100_000, 20), 100);
        // Stale level against larger exp still clamps
        assert_eq!(experience_progress_percent(50_000, 1), 100);
        for exp in (0..110_000).step_by(777) {
            let level = level_for_experience(exp);
            assert!(experience_progress_percent(exp, level) <= 100);
        }
    }

    #[test]
    fn test_recharge_experience() {
        assert_eq!(experience_from_recharge(68.0), 6_800);
        assert_eq!(experience_from_recharge(9.999), 999);
        assert_eq!(experience_from_recharge(-3.0), 0);
        assert_eq!(experience_from_recharge(f64::NAN), 0);
        assert_eq!(level_for_experience(experience_from_recharge(68.0)), 5);
    }

    #[test]
    fn test_unlocks() {
        assert_eq!(level_unlocks(1).chat_frames, vec![ChatFrame::Bronze]);
        assert_eq!(level_unlocks(5).chat_frames.len(), 2);
        assert_eq!(
            level_unlocks(12).name_styles,
            vec![NameStyle::Default, NameStyle::Colorful]
        );
        assert!(level_unlocks(20).chat_frames.contains(&ChatFrame::Diamond));
        assert!(!level_unlocks(19).chat_frames.contains(&ChatFrame::Diamond));
    }

    #[test]
    fn test_serialized_names() {
        let json = serde_json::to_string(&config_for_level(19)).unwrap();
        assert!(json.contains("\"chatFrame\":\"diamond\""));
        assert!(json.contains("\"expThreshold\":95000"));
    }
}
