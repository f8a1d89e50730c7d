//! Daily tasks and check-in streaks

use chrono::{Duration, NaiveDate};
use serde::Serialize;

/// Task id whose claim also advances the check-in streak
pub const DAILY_CHECKIN: &str = "DAILY_CHECKIN";

/// A repeatable task that resets every day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTaskDef {
    #[serde(rename = "type")]
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub reward: i64,
    pub requirement: i64,
}

pub const DAILY_TASKS: [DailyTaskDef; 5] = [
    DailyTaskDef {
        id: DAILY_CHECKIN,
        name: "Daily Check-in",
        description: "Check in once today",
        reward: 1,
        requirement: 1,
    },
    DailyTaskDef {
        id: "CREATE_RANKING",
        name: "Publish a Ranking",
        description: "Create and publish a ranking",
        reward: 2,
        requirement: 1,
    },
    DailyTaskDef {
        id: "LIKE_RANKING",
        name: "Like Rankings",
        description: "Like 3 rankings",
        reward: 1,
        requirement: 3,
    },
    DailyTaskDef {
        id: "COMMENT_RANKING",
        name: "Leave Comments",
        description: "Post 2 comments",
        reward: 2,
        requirement: 2,
    },
    DailyTaskDef {
        id: "SHARE_RANKING",
        name: "Share a Ranking",
        description: "Share one ranking",
        reward: 1,
        requirement: 1,
    },
];

pub fn daily_task(id: &str) -> Option<&'static DailyTaskDef> {
    DAILY_TASKS.iter().find(|task| task.id == id)
}

/// Today's state of one task for one user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskProgress {
    pub progress: i64,
    pub completed: bool,
    pub claimed: bool,
}

impl TaskProgress {
    /// Record one unit of progress. Completed tasks stay where they are.
    pub fn advance(self, requirement: i64) -> Self {
        if self.completed {
            return self;
        }
        let progress = self.progress + 1;
        Self {
            progress,
            completed: progress >= requirement,
            claimed: self.claimed,
        }
    }

    pub fn can_claim(&self) -> bool {
        self.completed && !self.claimed
    }
}

/// Streak after checking in on `today`
///
/// Checking in the day after the last check-in extends the streak; any gap
/// starts over at one.
pub fn next_daily_streak(last_checkin: Option<NaiveDate>, today: NaiveDate, streak: i64) -> i64 {
    match last_checkin {
        Some(last) if last == today => streak.max(1),
        Some(last) if last + Duration::days(1) == today => streak + 1,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[test]
    fn test_catalog() {
        assert_eq!(daily_task("LIKE_RANKING").unwrap().requirement, 3);
        assert_eq!(daily_task(DAILY_CHECKIN).unwrap().reward, 1);
        assert!(daily_task("SLEEP").is_none());
    }

    #[test]
    fn test_advance_until_complete() {
        let p = TaskProgress::default().advance(3);
        assert_eq!(p.progress, 1);
        assert!(!p.can_claim());

        let p = p.advance(3).advance(3);
        assert!(p.completed);
        assert!(p.can_claim());

        let after = p.advance(3);
        assert_eq!(after.progress, 3);
    }

    #[test]
    fn test_claimed_cannot_claim_again() {
        let p = TaskProgress {
            progress: 1,
            completed: true,
            claimed: true,
        };
        assert!(!p.can_claim());
    }

    #[test]
    fn test_streak() {
        assert_eq!(next_daily_streak(None, day(5), 0), 1);
        assert_eq!(next_daily_streak(Some(day(4)), day(5), 6), 7);
        assert_eq!(next_daily_streak(Some(day(2)), day(5), 6), 1);
        assert_eq!(next_daily_streak(Some(day(5)), day(5), 6), 6);
    }
}
