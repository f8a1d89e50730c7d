//! Achievement catalog
//!
//! Each achievement watches one user metric and unlocks once the metric
//! reaches its requirement.

use serde::Serialize;

/// User counters achievements are measured against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AchievementMetric {
    RankingsPublished,
    LikesReceived,
    CommentsWritten,
    MvpCount,
    BattleWins,
    Subscribers,
    DailyStreak,
}

/// Snapshot of every metric for one user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMetrics {
    pub rankings_published: i64,
    pub likes_received: i64,
    pub comments_written: i64,
    pub mvp_count: i64,
    pub battle_wins: i64,
    pub subscribers: i64,
    pub daily_streak: i64,
}

impl UserMetrics {
    pub fn get(&self, metric: AchievementMetric) -> i64 {
        match metric {
            AchievementMetric::RankingsPublished => self.rankings_published,
            AchievementMetric::LikesReceived => self.likes_received,
            AchievementMetric::CommentsWritten => self.comments_written,
            AchievementMetric::MvpCount => self.mvp_count,
            AchievementMetric::BattleWins => self.battle_wins,
            AchievementMetric::Subscribers => self.subscribers,
            AchievementMetric::DailyStreak => self.daily_streak,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementDef {
    #[serde(rename = "type")]
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub metric: AchievementMetric,
    pub requirement: i64,
    pub reward: i64,
}

impl AchievementDef {
    pub fn is_reached(&self, metrics: &UserMetrics) -> bool {
        metrics.get(self.metric) >= self.requirement
    }
}

const fn def(
    id: &'static str,
    name: &'static str,
    description: &'static str,
    metric: AchievementMetric,
    requirement: i64,
    reward: i64,
) -> AchievementDef {
    AchievementDef {
        id,
        name,
        description,
        metric,
        requirement,
        reward,
    }
}

use AchievementMetric::*;

pub const ACHIEVEMENTS: [AchievementDef; 16] = [
    def("FIRST_RANKING", "First Steps", "Publish your first ranking", RankingsPublished, 1, 5),
    def("RANKING_COUNT_5", "Ranking Enthusiast", "Publish 5 rankings", RankingsPublished, 5, 10),
    def("RANKING_COUNT_10", "Ranking Master", "Publish 10 rankings", RankingsPublished, 10, 20),
    def("LIKE_RECEIVED_10", "Getting Noticed", "Receive 10 likes", LikesReceived, 10, 3),
    def("LIKE_RECEIVED_100", "Rising Star", "Receive 100 likes", LikesReceived, 100, 15),
    def("LIKE_RECEIVED_500", "Center Stage", "Receive 500 likes", LikesReceived, 500, 50),
    def("COMMENT_COUNT_10", "Commentator", "Post 10 comments", CommentsWritten, 10, 3),
    def("COMMENT_COUNT_50", "Voice of the Crowd", "Post 50 comments", CommentsWritten, 50, 10),
    def("MVP_COUNT_1", "First MVP", "Earn MVP once", MvpCount, 1, 5),
    def("MVP_COUNT_10", "MVP Regular", "Earn MVP 10 times", MvpCount, 10, 20),
    def("BATTLE_WIN_1", "First Victory", "Win a debate", BattleWins, 1, 5),
    def("BATTLE_WIN_10", "Undefeated General", "Win 10 debates", BattleWins, 10, 30),
    def("SUBSCRIBER_10", "Small Following", "Gain 10 subscribers", Subscribers, 10, 5),
    def("SUBSCRIBER_100", "Popular Voice", "Gain 100 subscribers", Subscribers, 100, 30),
    def("DAILY_STREAK_7", "One Week Strong", "Check in 7 days in a row", DailyStreak, 7, 10),
    def("DAILY_STREAK_30", "Monthly Regular", "Check in 30 days in a row", DailyStreak, 30, 50),
];

pub fn achievement(id: &str) -> Option<&'static AchievementDef> {
    ACHIEVEMENTS.iter().find(|a| a.id == id)
}
