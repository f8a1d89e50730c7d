//! Comments, replies, comment likes and MVP selection

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::new_id;
use super::rankings::{require_ranking, LikeToggle};
use super::users::{bump_counter, summary_columns, UserCounter, UserSummary};
use crate::error::ApiError;

/// Replies shown under each top-level comment
pub const REPLY_PREVIEW: i64 = 5;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRow {
    pub id: String,
    pub ranking_id: String,
    pub parent_id: Option<String>,
    pub content: String,
    pub like_count: i64,
    pub reply_count: i64,
    pub is_mvp: bool,
    pub created_at: DateTime<Utc>,
    pub author: UserSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_liked: Option<bool>,
}

impl CommentRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            ranking_id: row.get("ranking_id")?,
            parent_id: row.get("parent_id")?,
            content: row.get("content")?,
            like_count: row.get("like_count")?,
            reply_count: row.get("reply_count")?,
            is_mvp: row.get("is_mvp")?,
            created_at: row.get("created_at")?,
            author: UserSummary::from_prefixed(row, "author_")?,
            is_liked: None,
        })
    }
}

/// Top-level comment with its first replies
#[derive(Debug, Clone, Serialize)]
pub struct CommentThread {
    #[serde(flatten)]
    pub comment: CommentRow,
    pub replies: Vec<CommentRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentList {
    pub comments: Vec<CommentThread>,
    /// Every comment on the ranking, replies included
    pub total: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentSort {
    #[default]
    Hot,
    New,
}

fn select() -> String {
    format!(
        "SELECT c.id, c.ranking_id, c.parent_id, c.content, c.like_count, c.reply_count, c.is_mvp, c.created_at, {}
         FROM comments c JOIN users a ON a.id = c.author_id",
        summary_columns("a", "author_")
    )
}

fn fill_liked(conn: &Connection, comment: &mut CommentRow, viewer: Option<&str>) -> Result<(), ApiError> {
    if let Some(user_id) = viewer {
        let liked = conn
            .query_row(
                "SELECT 1 FROM comment_likes WHERE user_id = ? AND comment_id = ?",
                params![user_id, comment.id],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        comment.is_liked = Some(liked);
    }
    Ok(())
}

pub fn get_comment(conn: &Connection, id: &str) -> Result<Option<CommentRow>, ApiError> {
    let sql = format!("{} WHERE c.id = ?", select());
    Ok(conn.query_row(&sql, [id], |row| CommentRow::from_row(row)).optional()?)
}

pub fn require_comment(conn: &Connection, id: &str) -> Result<CommentRow, ApiError> {
    get_comment(conn, id)?.ok_or_else(|| ApiError::not_found("Comment"))
}

/// Top-level comments of a ranking with up to five replies each, oldest reply first
pub fn list_comments(
    conn: &Connection,
    ranking_id: &str,
    sort: CommentSort,
    viewer: Option<&str>,
) -> Result<CommentList, ApiError> {
    let order = match sort {
        CommentSort::Hot => "c.like_count DESC, c.created_at DESC",
        CommentSort::New => "c.created_at DESC",
    };
    let sql = format!("{} WHERE c.ranking_id = ? AND c.parent_id IS NULL ORDER BY {}", select(), order);
    let mut stmt = conn.prepare(&sql)?;
    let top_level = stmt
        .query_map([ranking_id], |row| CommentRow::from_row(row))?
        .collect::<Result<Vec<_>, _>>()?;

    let reply_sql = format!("{} WHERE c.parent_id = ? ORDER BY c.created_at ASC LIMIT ?", select());
    let mut reply_stmt = conn.prepare(&reply_sql)?;

    let mut comments = Vec::with_capacity(top_level.len());
    for mut comment in top_level {
        fill_liked(conn, &mut comment, viewer)?;
        let mut replies = reply_stmt
            .query_map(params![comment.id, REPLY_PREVIEW], |row| CommentRow::from_row(row))?
            .collect::<Result<Vec<_>, _>>()?;
        for reply in replies.iter_mut() {
            fill_liked(conn, reply, viewer)?;
        }
        comments.push(CommentThread { comment, replies });
    }

    let total: i64 = conn.query_row("SELECT COUNT(*) FROM comments WHERE ranking_id = ?", [ranking_id], |row| {
        row.get(0)
    })?;

    Ok(CommentList { comments, total })
}

/// Post a comment or reply. Bumps the ranking's comment count and the parent's reply count.
pub fn create_comment(
    conn: &mut Connection,
    ranking_id: &str,
    author_id: &str,
    content: &str,
    parent_id: Option<&str>,
) -> Result<CommentRow, ApiError> {
    let tx = conn.transaction()?;
    require_ranking(&tx, ranking_id)?;

    if let Some(parent_id) = parent_id {
        let parent_ranking: Option<String> = tx
            .query_row("SELECT ranking_id FROM comments WHERE id = ?", [parent_id], |row| row.get(0))
            .optional()?;
        match parent_ranking {
            Some(ref r) if r == ranking_id => {}
            Some(_) => return Err(ApiError::bad_request("Parent comment belongs to another ranking")),
            None => return Err(ApiError::not_found("Parent comment")),
        }
        tx.execute("UPDATE comments SET reply_count = reply_count + 1 WHERE id = ?", [parent_id])?;
    }

    let id = new_id();
    tx.execute(
        "INSERT INTO comments (id, ranking_id, author_id, parent_id, content, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![id, ranking_id, author_id, parent_id, content, Utc::now()],
    )?;
    tx.execute("UPDATE rankings SET comment_count = comment_count + 1 WHERE id = ?", [ranking_id])?;
    tx.commit()?;

    let mut comment = require_comment(conn, &id)?;
    comment.is_liked = Some(false);
    Ok(comment)
}

pub fn toggle_comment_like(conn: &mut Connection, user_id: &str, comment_id: &str) -> Result<LikeToggle, ApiError> {
    let tx = conn.transaction()?;
    require_comment(&tx, comment_id)?;

    let removed = tx.execute(
        "DELETE FROM comment_likes WHERE user_id = ? AND comment_id = ?",
        params![user_id, comment_id],
    )?;
    let (liked, delta) = if removed > 0 {
        (false, -1)
    } else {
        tx.execute(
            "INSERT INTO comment_likes (user_id, comment_id, created_at) VALUES (?1, ?2, ?3)",
            params![user_id, comment_id, Utc::now()],
        )?;
        (true, 1)
    };
    tx.execute(
        "UPDATE comments SET like_count = MAX(0, like_count + ?2) WHERE id = ?1",
        params![comment_id, delta],
    )?;
    let count: i64 = tx.query_row("SELECT like_count FROM comments WHERE id = ?", [comment_id], |row| row.get(0))?;
    tx.commit()?;

    Ok(LikeToggle { liked, count })
}

/// Mark a comment as the ranking's single MVP. Only the ranking's author may choose.
pub fn set_mvp(conn: &mut Connection, comment_id: &str, caller_id: &str) -> Result<CommentRow, ApiError> {
    let tx = conn.transaction()?;
    let comment = require_comment(&tx, comment_id)?;
    let ranking = require_ranking(&tx, &comment.ranking_id)?;
    if ranking.author_id != caller_id {
        return Err(ApiError::Forbidden("Only the ranking author can choose the MVP".into()));
    }

    if !comment.is_mvp {
        tx.execute(
            "UPDATE comments SET is_mvp = 0 WHERE ranking_id = ? AND is_mvp = 1",
            [&comment.ranking_id],
        )?;
        tx.execute("UPDATE comments SET is_mvp = 1 WHERE id = ?", [comment_id])?;
        bump_counter(&tx, &comment.author.id, UserCounter::MvpCount, 1)?;
    }
    tx.commit()?;

    require_comment(conn, comment_id)
}

/// Comments written by a user, replies included
pub fn count_by_author(conn: &Connection, user_id: &str) -> Result<i64, ApiError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM comments WHERE author_id = ?", [user_id], |row| row.get(0))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::rankings::{create_ranking, get_ranking, tests::input};
    use crate::db::users::require_user;
    use crate::db::users::tests::{conn, user};

    #[test]
    fn test_replies_and_counts() {
        let mut conn = conn();
        let ada = user(&conn, "ada");
        let bob = user(&conn, "bob");
        let ranking = create_ranking(&mut conn, &ada.id, &input("Best schools", 2)).unwrap();
        let rid = ranking.ranking.id.clone();

        let top = create_comment(&mut conn, &rid, &bob.id, "Great list", None).unwrap();
        for i in 0..7 {
            create_comment(&mut conn, &rid, &ada.id, &format!("reply {}", i), Some(&top.id)).unwrap();
        }

        let list = list_comments(&conn, &rid, CommentSort::New, Some(&bob.id)).unwrap();
        assert_eq!(list.total, 8);
        assert_eq!(list.comments.len(), 1);
        assert_eq!(list.comments[0].replies.len(), 5);
        assert_eq!(list.comments[0].replies[0].content, "reply 0");
        assert_eq!(list.comments[0].comment.reply_count, 7);
        assert_eq!(list.comments[0].comment.is_liked, Some(false));
        assert_eq!(get_ranking(&conn, &rid).unwrap().unwrap().comment_count, 8);
        assert_eq!(count_by_author(&conn, &ada.id).unwrap(), 7);
    }

    #[test]
    fn test_reply_to_other_ranking_rejected() {
        let mut conn = conn();
        let ada = user(&conn, "ada");
        let r1 = create_ranking(&mut conn, &ada.id, &input("One", 2)).unwrap();
        let r2 = create_ranking(&mut conn, &ada.id, &input("Two", 2)).unwrap();
        let c = create_comment(&mut conn, &r1.ranking.id, &ada.id, "hi", None).unwrap();
        let err = create_comment(&mut conn, &r2.ranking.id, &ada.id, "hi", Some(&c.id)).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn test_comment_like_toggle() {
        let mut conn = conn();
        let ada = user(&conn, "ada");
        let r = create_ranking(&mut conn, &ada.id, &input("One", 2)).unwrap();
        let c = create_comment(&mut conn, &r.ranking.id, &ada.id, "hi", None).unwrap();
        assert!(toggle_comment_like(&mut conn, &ada.id, &c.id).unwrap().liked);
        let off = toggle_comment_like(&mut conn, &ada.id, &c.id).unwrap();
        assert!(!off.liked);
        assert_eq!(off.count, 0);
    }

    #[test]
    fn test_single_mvp_per_ranking() {
        let mut conn = conn();
        let ada = user(&conn, "ada");
        let bob = user(&conn, "bob");
        let r = create_ranking(&mut conn, &ada.id, &input("One", 2)).unwrap();
        let rid = r.ranking.id.clone();
        let first = create_comment(&mut conn, &rid, &bob.id, "first", None).unwrap();
        let second = create_comment(&mut conn, &rid, &bob.id, "second", None).unwrap();

        assert!(matches!(set_mvp(&mut conn, &first.id, &bob.id), Err(ApiError::Forbidden(_))));

        set_mvp(&mut conn, &first.id, &ada.id).unwrap();
        set_mvp(&mut conn, &first.id, &ada.id).unwrap();
        let chosen = set_mvp(&mut conn, &second.id, &ada.id).unwrap();
        assert!(chosen.is_mvp);
        assert!(!require_comment(&conn, &first.id).unwrap().is_mvp);
        // Re-selecting the current MVP does not count twice
        assert_eq!(require_user(&conn, &bob.id).unwrap().mvp_count, 2);
    }
}
