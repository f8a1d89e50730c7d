//! Debate endpoints

use axum::{
    extract::{Path, State},
    response::Response,
};
use battle_core::debate::{DebateSide, DebateStatus};
use battle_core::Feature;
use serde::Deserialize;

use super::extract::{Body, Params};
use crate::auth::AuthUser;
use crate::db::debates::{challenge_debate, create_debate, end_debate, list_debates, require_debate, vote};
use crate::error::ApiError;
use crate::events::BattleEvent;
use crate::response::{created, ok, ok_with_message};
use crate::state::AppState;
use crate::validation;

#[derive(Debug, Default, Deserialize)]
pub struct DebateQuery {
    #[serde(default)]
    pub status: Option<DebateStatus>,
}

/// GET /api/debates
pub async fn list(State(state): State<AppState>, Params(query): Params<DebateQuery>) -> Result<Response, ApiError> {
    state.require(Feature::Debate)?;
    let rows = state.db.with_conn(|conn| list_debates(conn, query.status))?;
    Ok(ok(rows))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDebate {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub ranking_id: String,
    #[serde(default)]
    pub reward: Option<i64>,
}

/// POST /api/debates
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Body(req): Body<NewDebate>,
) -> Result<Response, ApiError> {
    state.require(Feature::Debate)?;
    let title = req.title.trim();
    validation::length("Title", title, 1, 100)?;
    validation::max_length("Description", req.description.as_deref(), 1000)?;
    let description = validation::non_empty(req.description);
    let reward = req.reward.unwrap_or(state.config.economy.default_debate_reward);

    let debate = state.db.with_conn_mut(|conn| {
        create_debate(conn, &user.id, title, description.as_deref(), &req.ranking_id, reward)
    })?;

    state.events.emit(BattleEvent::DebateCreated {
        id: debate.id.clone(),
        creator_id: user.id,
        reward: debate.reward,
    });
    Ok(created(debate))
}

/// GET /api/debates/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response, ApiError> {
    state.require(Feature::Debate)?;
    let debate = state.db.with_conn(|conn| require_debate(conn, &id))?;
    Ok(ok(debate))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebateAction {
    Challenge,
    Vote,
    End,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebateActionRequest {
    pub action: DebateAction,
    #[serde(default)]
    pub ranking_id: Option<String>,
    #[serde(default)]
    pub vote_for: Option<DebateSide>,
}

/// POST /api/debates/:id
pub async fn act(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Body(req): Body<DebateActionRequest>,
) -> Result<Response, ApiError> {
    state.require(Feature::Debate)?;
    match req.action {
        DebateAction::Challenge => {
            let ranking_id = req
                .ranking_id
                .ok_or_else(|| ApiError::bad_request("rankingId is required"))?;
            let debate = state
                .db
                .with_conn_mut(|conn| challenge_debate(conn, &id, &user.id, &ranking_id))?;
            Ok(ok_with_message(debate, "Challenge accepted"))
        }
        DebateAction::Vote => {
            let side = req
                .vote_for
                .ok_or_else(|| ApiError::bad_request("voteFor must be creator or challenger"))?;
            let debate = state.db.with_conn_mut(|conn| vote(conn, &id, &user.id, side))?;
            Ok(ok_with_message(debate, "Vote recorded"))
        }
        DebateAction::End => {
            let debate = state.db.with_conn_mut(|conn| end_debate(conn, &id, &user.id))?;
            state.events.emit(BattleEvent::DebateEnded {
                id,
                winner_id: debate.winner_id.clone(),
            });
            let message = if debate.winner_id.is_some() {
                "Debate ended"
            } else {
                "Debate ended in a tie"
            };
            Ok(ok_with_message(debate, message))
        }
    }
}
