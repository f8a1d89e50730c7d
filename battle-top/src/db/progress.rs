//! Daily tasks, check-in streaks and achievements
//!
//! Task and achievement definitions live in `battle_core`; these functions
//! keep per-user state and pay rewards into the wallet.

use battle_core::achievements::{achievement, AchievementDef, UserMetrics, ACHIEVEMENTS};
use battle_core::tasks::{daily_task, next_daily_streak, DailyTaskDef, TaskProgress, DAILY_CHECKIN, DAILY_TASKS};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::collections::HashMap;

use super::comments::count_by_author;
use super::economy::{credit, ensure_wallet, log_transaction, TransactionKind};
use super::social::subscriber_count;
use super::users::require_user;
use crate::error::ApiError;

/// A task with the caller's progress for one day
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTaskView {
    #[serde(flatten)]
    pub task: DailyTaskDef,
    #[serde(flatten)]
    pub state: TaskProgress,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskClaim {
    pub task: DailyTaskView,
    pub reward: i64,
    pub balance: i64,
    pub daily_streak: i64,
}

fn require_task(id: &str) -> Result<&'static DailyTaskDef, ApiError> {
    daily_task(id).ok_or_else(|| ApiError::not_found("Task"))
}

fn task_state(conn: &Connection, user_id: &str, task_id: &str, day: NaiveDate) -> Result<TaskProgress, ApiError> {
    Ok(conn
        .query_row(
            "SELECT progress, completed, claimed FROM user_daily_tasks
             WHERE user_id = ? AND task_id = ? AND day = ?",
            params![user_id, task_id, day],
            |row| {
                Ok(TaskProgress {
                    progress: row.get(0)?,
                    completed: row.get(1)?,
                    claimed: row.get(2)?,
                })
            },
        )
        .optional()?
        .unwrap_or_default())
}

fn save_task_state(
    conn: &Connection,
    user_id: &str,
    task_id: &str,
    day: NaiveDate,
    state: TaskProgress,
) -> Result<(), ApiError> {
    conn.execute(
        "INSERT INTO user_daily_tasks (user_id, task_id, day, progress, completed, claimed)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(user_id, task_id, day) DO UPDATE SET progress = excluded.progress,
            completed = excluded.completed, claimed = excluded.claimed",
        params![user_id, task_id, day, state.progress, state.completed, state.claimed],
    )?;
    Ok(())
}

/// Every task with the user's state on `day`
pub fn list_daily_tasks(conn: &Connection, user_id: &str, day: NaiveDate) -> Result<Vec<DailyTaskView>, ApiError> {
    let mut stmt = conn.prepare(
        "SELECT task_id, progress, completed, claimed FROM user_daily_tasks WHERE user_id = ? AND day = ?",
    )?;
    let states: HashMap<String, TaskProgress> = stmt
        .query_map(params![user_id, day], |row| {
            Ok((
                row.get::<_, String>(0)?,
                TaskProgress {
                    progress: row.get(1)?,
                    completed: row.get(2)?,
                    claimed: row.get(3)?,
                },
            ))
        })?
        .collect::<Result<_, _>>()?;

    Ok(DAILY_TASKS
        .iter()
        .map(|task| DailyTaskView {
            task: *task,
            state: states.get(task.id).copied().unwrap_or_default(),
        })
        .collect())
}

/// Record one unit of progress on a task for `day`
pub fn progress_task(conn: &Connection, user_id: &str, task_id: &str, day: NaiveDate) -> Result<DailyTaskView, ApiError> {
    let task = require_task(task_id)?;
    let state = task_state(conn, user_id, task.id, day)?.advance(task.requirement);
    save_task_state(conn, user_id, task.id, day, state)?;
    Ok(DailyTaskView { task: *task, state })
}

/// Pay out a completed task once per day
///
/// Claiming the check-in completes it on the spot and moves the streak.
pub fn claim_task(
    conn: &mut Connection,
    user_id: &str,
    task_id: &str,
    now: DateTime<Utc>,
) -> Result<TaskClaim, ApiError> {
    let task = require_task(task_id)?;
    let day = now.date_naive();
    let tx = conn.transaction()?;

    let mut state = task_state(&tx, user_id, task.id, day)?;
    if task.id == DAILY_CHECKIN && !state.completed {
        state = state.advance(task.requirement);
    }
    if state.claimed {
        return Err(ApiError::bad_request("Reward already claimed today"));
    }
    if !state.can_claim() {
        return Err(ApiError::bad_request("Task is not completed yet"));
    }
    state.claimed = true;
    save_task_state(&tx, user_id, task.id, day, state)?;

    credit(&tx, user_id, task.reward)?;
    log_transaction(
        &tx,
        user_id,
        TransactionKind::DailyTask,
        task.reward,
        &format!("Daily task: {}", task.name),
    )?;

    let user = require_user(&tx, user_id)?;
    let mut streak = user.daily_streak;
    if task.id == DAILY_CHECKIN {
        let last = user.last_daily_at.map(|at| at.date_naive());
        streak = next_daily_streak(last, day, streak);
        tx.execute(
            "UPDATE users SET daily_streak = ?2, last_daily_at = ?3 WHERE id = ?1",
            params![user_id, streak, now],
        )?;
    }
    let balance = ensure_wallet(&tx, user_id)?.balance;
    tx.commit()?;

    Ok(TaskClaim {
        task: DailyTaskView { task: *task, state },
        reward: task.reward,
        balance,
        daily_streak: streak,
    })
}

/// Current value of every achievement metric for a user
pub fn user_metrics(conn: &Connection, user_id: &str) -> Result<UserMetrics, ApiError> {
    let user = require_user(conn, user_id)?;
    Ok(UserMetrics {
        rankings_published: user.total_rankings_published,
        likes_received: user.total_likes_received,
        comments_written: count_by_author(conn, user_id)?,
        mvp_count: user.mvp_count,
        battle_wins: user.battle_wins,
        subscribers: subscriber_count(conn, user_id)?,
        daily_streak: user.daily_streak,
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementView {
    #[serde(flatten)]
    pub achievement: AchievementDef,
    pub current_progress: i64,
    pub unlocked: bool,
    pub unlocked_at: Option<DateTime<Utc>>,
    pub can_unlock: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementUnlock {
    pub achievement: AchievementView,
    pub reward: i64,
    pub balance: i64,
}

fn unlocked_at(conn: &Connection, user_id: &str) -> Result<HashMap<String, DateTime<Utc>>, ApiError> {
    let mut stmt = conn.prepare("SELECT achievement_id, unlocked_at FROM user_achievements WHERE user_id = ?")?;
    let rows = stmt
        .query_map([user_id], |row| Ok((row.get::<_, String>(0)?, row.get::<_, DateTime<Utc>>(1)?)))?
        .collect::<Result<_, _>>()?;
    Ok(rows)
}

fn view(def: &AchievementDef, metrics: &UserMetrics, unlocked_at: Option<DateTime<Utc>>) -> AchievementView {
    let unlocked = unlocked_at.is_some();
    AchievementView {
        achievement: *def,
        current_progress: metrics.get(def.metric),
        unlocked,
        unlocked_at,
        can_unlock: !unlocked && def.is_reached(metrics),
    }
}

pub fn list_achievements(conn: &Connection, user_id: &str) -> Result<Vec<AchievementView>, ApiError> {
    let metrics = user_metrics(conn, user_id)?;
    let unlocked = unlocked_at(conn, user_id)?;
    Ok(ACHIEVEMENTS
        .iter()
        .map(|def| view(def, &metrics, unlocked.get(def.id).copied()))
        .collect())
}

/// Unlock an achievement whose requirement the user has met, paying its reward
pub fn unlock_achievement(conn: &mut Connection, user_id: &str, achievement_id: &str) -> Result<AchievementUnlock, ApiError> {
    let def = achievement(achievement_id).ok_or_else(|| ApiError::not_found("Achievement"))?;
    let tx = conn.transaction()?;

    let metrics = user_metrics(&tx, user_id)?;
    if unlocked_at(&tx, user_id)?.contains_key(def.id) {
        return Err(ApiError::bad_request("Achievement already unlocked"));
    }
    if !def.is_reached(&metrics) {
        return Err(ApiError::bad_request(format!(
            "Achievement requires {} but progress is {}",
            def.requirement,
            metrics.get(def.metric)
        )));
    }

    let now = Utc::now();
    tx.execute(
        "INSERT INTO user_achievements (user_id, achievement_id, unlocked_at) VALUES (?1, ?2, ?3)",
        params![user_id, def.id, now],
    )?;
    credit(&tx, user_id, def.reward)?;
    log_transaction(
        &tx,
        user_id,
        TransactionKind::Achievement,
        def.reward,
        &format!("Achievement: {}", def.name),
    )?;
    let balance = ensure_wallet(&tx, user_id)?.balance;
    tx.commit()?;

    Ok(AchievementUnlock {
        achievement: view(def, &metrics, Some(now)),
        reward: def.reward,
        balance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::rankings::{create_ranking, publish_ranking, tests::input};
    use crate::db::users::tests::{conn, user};
    use battle_core::CredibilityWeights;
    use chrono::{Duration, TimeZone};

    fn noon(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_task_progress_and_claim() {
        let mut conn = conn();
        let ada = user(&conn, "ada");
        let today = noon(5);

        let listed = list_daily_tasks(&conn, &ada.id, today.date_naive()).unwrap();
        assert_eq!(listed.len(), DAILY_TASKS.len());
        assert!(listed.iter().all(|t| t.state.progress == 0));

        assert!(matches!(
            claim_task(&mut conn, &ada.id, "LIKE_RANKING", today),
            Err(ApiError::BadRequest(_))
        ));
        for _ in 0..4 {
            progress_task(&conn, &ada.id, "LIKE_RANKING", today.date_naive()).unwrap();
        }
        let state = task_state(&conn, &ada.id, "LIKE_RANKING", today.date_naive()).unwrap();
        assert_eq!(state.progress, 3);
        assert!(state.completed);

        let claim = claim_task(&mut conn, &ada.id, "LIKE_RANKING", today).unwrap();
        assert_eq!(claim.reward, 1);
        assert_eq!(claim.balance, 1);
        assert!(claim_task(&mut conn, &ada.id, "LIKE_RANKING", today).is_err());

        // A new day starts from scratch
        let tomorrow = (today + Duration::days(1)).date_naive();
        let fresh = list_daily_tasks(&conn, &ada.id, tomorrow).unwrap();
        assert!(fresh.iter().all(|t| !t.state.claimed));

        assert!(matches!(
            progress_task(&conn, &ada.id, "SLEEP", tomorrow),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn test_checkin_streak() {
        let mut conn = conn();
        let ada = user(&conn, "ada");

        assert_eq!(claim_task(&mut conn, &ada.id, DAILY_CHECKIN, noon(1)).unwrap().daily_streak, 1);
        assert_eq!(claim_task(&mut conn, &ada.id, DAILY_CHECKIN, noon(2)).unwrap().daily_streak, 2);
        assert!(claim_task(&mut conn, &ada.id, DAILY_CHECKIN, noon(2)).is_err());
        assert_eq!(claim_task(&mut conn, &ada.id, DAILY_CHECKIN, noon(5)).unwrap().daily_streak, 1);
    }

    #[test]
    fn test_unlock_checks_progress() {
        let mut conn = conn();
        let ada = user(&conn, "ada");
        let weights = CredibilityWeights::default();

        assert!(matches!(
            unlock_achievement(&mut conn, &ada.id, "FIRST_RANKING"),
            Err(ApiError::BadRequest(_))
        ));

        let r = create_ranking(&mut conn, &ada.id, &input("Firsts", 2)).unwrap();
        publish_ranking(&mut conn, &r.ranking.id, &ada.id, &weights).unwrap();

        let listed = list_achievements(&conn, &ada.id).unwrap();
        let first = listed.iter().find(|a| a.achievement.id == "FIRST_RANKING").unwrap();
        assert!(first.can_unlock);
        assert_eq!(first.current_progress, 1);

        let unlock = unlock_achievement(&mut conn, &ada.id, "FIRST_RANKING").unwrap();
        assert_eq!(unlock.balance, 5);
        assert!(unlock.achievement.unlocked);
        assert!(!unlock.achievement.can_unlock);

        assert!(unlock_achievement(&mut conn, &ada.id, "FIRST_RANKING").is_err());
        assert!(matches!(
            unlock_achievement(&mut conn, &ada.id, "NOPE"),
            Err(ApiError::NotFound(_))
        ));
    }
}
