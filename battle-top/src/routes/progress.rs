//! Daily tasks and achievements

use axum::{extract::State, response::Response};
use battle_core::Feature;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use super::extract::Body;
use crate::auth::AuthUser;
use crate::db::progress::{claim_task, list_achievements, list_daily_tasks, progress_task, unlock_achievement};
use crate::error::ApiError;
use crate::events::BattleEvent;
use crate::response::{ok, ok_with_message};
use crate::state::AppState;

/// GET /api/tasks/daily
pub async fn daily_tasks(State(state): State<AppState>, user: AuthUser) -> Result<Response, ApiError> {
    state.require(Feature::Tasks)?;
    let today = Utc::now().date_naive();
    let tasks = state.db.with_conn(|conn| list_daily_tasks(conn, &user.id, today))?;
    Ok(ok(tasks))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskAction {
    Progress,
    Claim,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRequest {
    pub task_id: String,
    pub action: TaskAction,
}

/// POST /api/tasks/daily
pub async fn update_task(
    State(state): State<AppState>,
    user: AuthUser,
    Body(req): Body<TaskRequest>,
) -> Result<Response, ApiError> {
    state.require(Feature::Tasks)?;
    let now = Utc::now();

    match req.action {
        TaskAction::Progress => {
            let view = state
                .db
                .with_conn(|conn| progress_task(conn, &user.id, &req.task_id, now.date_naive()))?;
            Ok(ok(view))
        }
        TaskAction::Claim => {
            let claim = state
                .db
                .with_conn_mut(|conn| claim_task(conn, &user.id, &req.task_id, now))?;

            info!(user = %user.id, task = %req.task_id, reward = claim.reward, "Task reward claimed");
            state.events.emit(BattleEvent::TaskRewardClaimed {
                user_id: user.id,
                task_id: req.task_id,
                reward: claim.reward,
            });
            let message = format!("Claimed {} battle coins", claim.reward);
            Ok(ok_with_message(claim, message))
        }
    }
}

/// GET /api/achievements
pub async fn achievements(State(state): State<AppState>, user: AuthUser) -> Result<Response, ApiError> {
    state.require(Feature::Achievements)?;
    let rows = state.db.with_conn(|conn| list_achievements(conn, &user.id))?;
    Ok(ok(rows))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockRequest {
    pub achievement_id: String,
}

/// POST /api/achievements
pub async fn unlock(
    State(state): State<AppState>,
    user: AuthUser,
    Body(req): Body<UnlockRequest>,
) -> Result<Response, ApiError> {
    state.require(Feature::Achievements)?;
    let unlock = state
        .db
        .with_conn_mut(|conn| unlock_achievement(conn, &user.id, &req.achievement_id))?;

    state.events.emit(BattleEvent::AchievementUnlocked {
        user_id: user.id,
        achievement_id: req.achievement_id,
        reward: unlock.reward,
    });
    let message = format!("Achievement unlocked: {}", unlock.achievement.achievement.name);
    Ok(ok_with_message(unlock, message))
}
