//! Ranking CRUD, publishing, moderation, likes and collaborators

use axum::{
    extract::{Path, State},
    response::Response,
};
use battle_core::Feature;
use serde::Deserialize;
use tracing::info;

use super::extract::{Body, Params};
use crate::auth::{AuthUser, MaybeUser};
use crate::db::rankings::{
    create_ranking, delete_ranking, increment_views, list_rankings, publish_ranking, reject_ranking,
    require_ranking_view, toggle_like, update_ranking, RankingInput, RankingQuery,
};
use crate::db::social::{accept_invite, invite_collaborator, list_collaborators, remove_collaborator};
use crate::error::ApiError;
use crate::events::BattleEvent;
use crate::response::{created, message, ok, ok_with_message};
use crate::state::AppState;
use crate::validation;

/// Reject a ranking body with the first field violation
fn validate_ranking(input: &RankingInput) -> Result<(), ApiError> {
    validation::length("Title", input.title.trim(), 3, 100)?;
    validation::max_length("Description", input.description.as_deref(), 1000)?;

    if input.items.len() < 2 || input.items.len() > 50 {
        return Err(ApiError::bad_request("A ranking needs between 2 and 50 items"));
    }
    for item in &input.items {
        validation::length("Item name", item.name.trim(), 1, 100)?;
        validation::max_length("Item description", item.description.as_deref(), 500)?;
        validation::url_or_empty("Item image URL", item.image_url.as_deref())?;
        validation::max_length("Justification", item.justification.as_deref(), 500)?;
    }

    if input.tags.len() > 10 {
        return Err(ApiError::bad_request("At most 10 tags are allowed"));
    }
    for tag in &input.tags {
        validation::max_length("Tag", Some(tag.trim()), 30)?;
    }
    Ok(())
}

/// GET /api/rankings
pub async fn list(State(state): State<AppState>, Params(query): Params<RankingQuery>) -> Result<Response, ApiError> {
    let page = state.db.with_conn(|conn| list_rankings(conn, &query))?;
    Ok(ok(page))
}

/// POST /api/rankings
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Body(input): Body<RankingInput>,
) -> Result<Response, ApiError> {
    validate_ranking(&input)?;
    let view = state.db.with_conn_mut(|conn| create_ranking(conn, &user.id, &input))?;

    state.events.emit(BattleEvent::RankingCreated {
        id: view.ranking.id.clone(),
        author_id: user.id,
    });
    Ok(created(view))
}

/// GET /api/rankings/:id
pub async fn get(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let view = state.db.with_conn(|conn| {
        let mut view = require_ranking_view(conn, &id, viewer.id())?;
        increment_views(conn, &id)?;
        view.ranking.view_count += 1;
        Ok(view)
    })?;
    Ok(ok(view))
}

/// PUT /api/rankings/:id
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Body(input): Body<RankingInput>,
) -> Result<Response, ApiError> {
    validate_ranking(&input)?;
    let view = state.db.with_conn_mut(|conn| update_ranking(conn, &id, &user.id, &input))?;
    Ok(ok(view))
}

/// DELETE /api/rankings/:id
pub async fn remove(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    state.db.with_conn(|conn| delete_ranking(conn, &id, &user.id))?;
    state.events.emit(BattleEvent::RankingDeleted { id });
    Ok(message("Ranking deleted"))
}

/// POST /api/rankings/:id/publish
pub async fn publish(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let weights = *state.weights();
    let view = state.db.with_conn_mut(|conn| publish_ranking(conn, &id, &user.id, &weights))?;

    info!(ranking = %id, author = %user.id, "Ranking published");
    state.events.emit(BattleEvent::RankingPublished {
        id,
        author_id: user.id,
    });
    Ok(ok_with_message(view, "Ranking published"))
}

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub reason: String,
}

/// POST /api/rankings/:id/reject
pub async fn reject(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Body(req): Body<RejectRequest>,
) -> Result<Response, ApiError> {
    user.require_admin()?;
    validation::length("Reason", req.reason.trim(), 1, 500)?;
    let ranking = state.db.with_conn(|conn| reject_ranking(conn, &id, &user.id, req.reason.trim()))?;

    info!(ranking = %id, reviewer = %user.id, "Ranking rejected");
    state.events.emit(BattleEvent::RankingRejected {
        id,
        reviewer_id: user.id,
    });
    Ok(ok(ranking))
}

/// POST /api/rankings/:id/like
pub async fn like(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let weights = *state.weights();
    let toggle = state.db.with_conn_mut(|conn| toggle_like(conn, &user.id, &id, &weights))?;

    state.events.emit(BattleEvent::RankingLikeToggled {
        ranking_id: id,
        user_id: user.id,
        liked: toggle.liked,
    });
    Ok(ok(toggle))
}

/// GET /api/rankings/:id/collaborators
pub async fn collaborators(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response, ApiError> {
    state.require(Feature::Collaboration)?;
    let rows = state.db.with_conn(|conn| list_collaborators(conn, &id))?;
    Ok(ok(rows))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteRequest {
    pub user_id: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// POST /api/rankings/:id/collaborators
pub async fn invite(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Body(req): Body<InviteRequest>,
) -> Result<Response, ApiError> {
    state.require(Feature::Collaboration)?;
    validation::max_length("Role", req.role.as_deref(), 20)?;
    let row = state
        .db
        .with_conn_mut(|conn| invite_collaborator(conn, &id, &user.id, &req.user_id, req.role.as_deref()))?;
    Ok(created(row))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollaboratorAction {
    Accept,
    Remove,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollaboratorUpdate {
    pub action: CollaboratorAction,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// PUT /api/rankings/:id/collaborators
pub async fn update_collaborator(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Body(req): Body<CollaboratorUpdate>,
) -> Result<Response, ApiError> {
    state.require(Feature::Collaboration)?;
    match req.action {
        CollaboratorAction::Accept => {
            let row = state.db.with_conn(|conn| accept_invite(conn, &id, &user.id))?;
            Ok(ok(row))
        }
        CollaboratorAction::Remove => {
            let target = req
                .user_id
                .ok_or_else(|| ApiError::bad_request("userId is required"))?;
            state.db.with_conn(|conn| remove_collaborator(conn, &id, &user.id, &target))?;
            Ok(message("Collaborator removed"))
        }
    }
}
