//! Ranking comments, comment likes and MVP selection

use axum::{
    extract::{Path, State},
    response::Response,
};
use serde::Deserialize;

use super::extract::{Body, Params};
use crate::auth::{AuthUser, MaybeUser};
use crate::db::comments::{create_comment, list_comments, set_mvp, toggle_comment_like, CommentSort};
use crate::error::ApiError;
use crate::events::BattleEvent;
use crate::response::{created, ok};
use crate::state::AppState;
use crate::validation;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentQuery {
    #[serde(default)]
    pub sort_by: CommentSort,
}

/// GET /api/rankings/:id/comments
pub async fn list(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(ranking_id): Path<String>,
    Params(query): Params<CommentQuery>,
) -> Result<Response, ApiError> {
    let comments = state
        .db
        .with_conn(|conn| list_comments(conn, &ranking_id, query.sort_by, viewer.id()))?;
    Ok(ok(comments))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRequest {
    pub content: String,
    #[serde(default)]
    pub parent_id: Option<String>,
}

/// POST /api/rankings/:id/comments
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Path(ranking_id): Path<String>,
    Body(req): Body<CommentRequest>,
) -> Result<Response, ApiError> {
    let content = req.content.trim();
    validation::length("Comment", content, 1, 500)?;
    let parent_id = validation::non_empty(req.parent_id);

    let comment = state
        .db
        .with_conn_mut(|conn| create_comment(conn, &ranking_id, &user.id, content, parent_id.as_deref()))?;

    state.events.emit(BattleEvent::CommentPosted {
        id: comment.id.clone(),
        ranking_id,
        author_id: user.id,
    });
    Ok(created(comment))
}

/// POST /api/comments/:id/like
pub async fn like(
    State(state): State<AppState>,
    user: AuthUser,
    Path(comment_id): Path<String>,
) -> Result<Response, ApiError> {
    let toggle = state
        .db
        .with_conn_mut(|conn| toggle_comment_like(conn, &user.id, &comment_id))?;
    Ok(ok(toggle))
}

/// POST /api/comments/:id/mvp
pub async fn mvp(
    State(state): State<AppState>,
    user: AuthUser,
    Path(comment_id): Path<String>,
) -> Result<Response, ApiError> {
    let comment = state.db.with_conn_mut(|conn| set_mvp(conn, &comment_id, &user.id))?;

    state.events.emit(BattleEvent::MvpSelected {
        comment_id,
        ranking_id: comment.ranking_id.clone(),
    });
    Ok(ok(comment))
}
