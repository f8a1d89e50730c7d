//! Rankings, their items and tags, and ranking likes

use battle_core::{CredibilityWeights, RankingStatus};
use chrono::{DateTime, Duration, Months, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::catalog::CategorySummary;
use super::users::{bump_counter, recompute_credibility, summary_columns, UserCounter, UserSummary};
use super::{new_id, param_refs, Page};
use crate::error::ApiError;

/// Ranking row from database
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingRow {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: RankingStatus,
    pub author_id: String,
    pub category_id: Option<String>,
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
    pub is_collaborative: bool,
    pub rejection_reason: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

impl RankingRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        let status: String = row.get("status")?;
        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            status: status.parse().map_err(|e: battle_core::CoreError| {
                rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
            })?,
            author_id: row.get("author_id")?,
            category_id: row.get("category_id")?,
            view_count: row.get("view_count")?,
            like_count: row.get("like_count")?,
            comment_count: row.get("comment_count")?,
            is_collaborative: row.get("is_collaborative")?,
            rejection_reason: row.get("rejection_reason")?,
            reviewed_at: row.get("reviewed_at")?,
            reviewed_by: row.get("reviewed_by")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            published_at: row.get("published_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingItemRow {
    pub id: String,
    pub position: i64,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub justification: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagRef {
    pub id: String,
    pub name: String,
}

/// Ranking with everything a page needs to render it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingView {
    #[serde(flatten)]
    pub ranking: RankingRow,
    pub author: UserSummary,
    pub category: Option<CategorySummary>,
    pub items: Vec<RankingItemRow>,
    pub tags: Vec<TagRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_liked: Option<bool>,
}

/// Ranking body sent on create and update
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    pub items: Vec<RankingItemInput>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingItemInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub justification: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Newest,
    Popular,
    Views,
    Comments,
}

impl SortBy {
    fn order_clause(&self) -> &'static str {
        match self {
            SortBy::Newest => "r.created_at DESC",
            SortBy::Popular => "r.like_count DESC, r.created_at DESC",
            SortBy::Views => "r.view_count DESC, r.created_at DESC",
            SortBy::Comments => "r.comment_count DESC, r.created_at DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    Today,
    Week,
    Month,
    Year,
}

impl TimeRange {
    /// Earliest creation time included in the range
    pub fn since(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            TimeRange::Today => now
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .map(|midnight| midnight.and_utc())
                .unwrap_or(now),
            TimeRange::Week => now - Duration::days(7),
            TimeRange::Month => now.checked_sub_months(Months::new(1)).unwrap_or(now),
            TimeRange::Year => now.checked_sub_months(Months::new(12)).unwrap_or(now),
        }
    }
}

/// Query parameters for listing rankings - camelCase for URL params
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingQuery {
    /// Status filter; defaults to published, `all` disables the filter
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub min_likes: Option<i64>,
    #[serde(default)]
    pub time_range: Option<TimeRange>,
    #[serde(default)]
    pub sort_by: SortBy,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

pub const DEFAULT_PAGE_SIZE: i64 = 12;
const MAX_PAGE_SIZE: i64 = 100;

/// Result of toggling a like
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeToggle {
    pub liked: bool,
    pub count: i64,
}

fn view_select() -> String {
    format!(
        "SELECT r.*, {author}, cat.name AS category_name, cat.slug AS category_slug
         FROM rankings r
         JOIN users a ON a.id = r.author_id
         LEFT JOIN categories cat ON cat.id = r.category_id",
        author = summary_columns("a", "author_")
    )
}

fn view_from_row(row: &Row) -> Result<RankingView, rusqlite::Error> {
    let ranking = RankingRow::from_row(row)?;
    let category = match ranking.category_id.clone() {
        Some(id) => Some(CategorySummary {
            id,
            name: row.get("category_name")?,
            slug: row.get("category_slug")?,
        }),
        None => None,
    };
    Ok(RankingView {
        ranking,
        author: UserSummary::from_prefixed(row, "author_")?,
        category,
        items: vec![], // Loaded separately
        tags: vec![],
        is_liked: None,
    })
}

fn load_items(conn: &Connection, ranking_id: &str, limit: Option<i64>) -> Result<Vec<RankingItemRow>, ApiError> {
    let mut stmt = conn.prepare(
        "SELECT id, position, name, description, image_url, justification
         FROM ranking_items WHERE ranking_id = ?1 ORDER BY position ASC LIMIT ?2",
    )?;
    let items = stmt
        .query_map(params![ranking_id, limit.unwrap_or(-1)], |row| {
            Ok(RankingItemRow {
                id: row.get(0)?,
                position: row.get(1)?,
                name: row.get(2)?,
                description: row.get(3)?,
                image_url: row.get(4)?,
                justification: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(items)
}

fn load_tags(conn: &Connection, ranking_id: &str) -> Result<Vec<TagRef>, ApiError> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.name FROM tags t
         JOIN ranking_tags rt ON rt.tag_id = t.id
         WHERE rt.ranking_id = ? ORDER BY t.name",
    )?;
    let tags = stmt
        .query_map([ranking_id], |row| Ok(TagRef { id: row.get(0)?, name: row.get(1)? }))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tags)
}

pub fn is_liked(conn: &Connection, user_id: &str, ranking_id: &str) -> Result<bool, ApiError> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM likes WHERE user_id = ? AND ranking_id = ?",
            params![user_id, ranking_id],
            |_| Ok(()),
        )
        .optional()?
        .is_some())
}

/// Get a bare ranking row
pub fn get_ranking(conn: &Connection, id: &str) -> Result<Option<RankingRow>, ApiError> {
    Ok(conn
        .query_row("SELECT * FROM rankings WHERE id = ?", [id], |row| RankingRow::from_row(row))
        .optional()?)
}

pub fn require_ranking(conn: &Connection, id: &str) -> Result<RankingRow, ApiError> {
    get_ranking(conn, id)?.ok_or_else(|| ApiError::not_found("Ranking"))
}

/// Ranking owned by `user_id`; 404 if missing, 403 if someone else's
pub fn require_author(conn: &Connection, id: &str, user_id: &str) -> Result<RankingRow, ApiError> {
    let ranking = require_ranking(conn, id)?;
    if ranking.author_id != user_id {
        return Err(ApiError::Forbidden("Only the author can do this".into()));
    }
    Ok(ranking)
}

/// Full view of one ranking, with `is_liked` filled in for `viewer`
pub fn get_ranking_view(
    conn: &Connection,
    id: &str,
    viewer: Option<&str>,
) -> Result<Option<RankingView>, ApiError> {
    let sql = format!("{} WHERE r.id = ?", view_select());
    let view = conn.query_row(&sql, [id], view_from_row).optional()?;

    match view {
        Some(mut view) => {
            view.items = load_items(conn, id, None)?;
            view.tags = load_tags(conn, id)?;
            if let Some(user_id) = viewer {
                view.is_liked = Some(is_liked(conn, user_id, id)?);
            }
            Ok(Some(view))
        }
        None => Ok(None),
    }
}

pub fn require_ranking_view(conn: &Connection, id: &str, viewer: Option<&str>) -> Result<RankingView, ApiError> {
    get_ranking_view(conn, id, viewer)?.ok_or_else(|| ApiError::not_found("Ranking"))
}

pub fn increment_views(conn: &Connection, id: &str) -> Result<(), ApiError> {
    conn.execute("UPDATE rankings SET view_count = view_count + 1 WHERE id = ?", [id])?;
    Ok(())
}

/// List rankings with filters, sorting and pagination
pub fn list_rankings(conn: &Connection, query: &RankingQuery) -> Result<Page<RankingView>, ApiError> {
    list_rankings_with_items(conn, query, None)
}

/// Like [`list_rankings`], keeping only the first `item_limit` items per ranking
pub fn list_rankings_with_items(
    conn: &Connection,
    query: &RankingQuery,
    item_limit: Option<i64>,
) -> Result<Page<RankingView>, ApiError> {
    let mut conditions = vec![];
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![];

    match query.status.as_deref() {
        Some("all") => {}
        Some(status) => {
            let status: RankingStatus = status.parse()?;
            conditions.push("r.status = ?".to_string());
            params.push(Box::new(status.as_str()));
        }
        None => {
            conditions.push("r.status = ?".to_string());
            params.push(Box::new(RankingStatus::Published.as_str()));
        }
    }

    if let Some(ref category_id) = query.category_id {
        conditions.push("r.category_id = ?".to_string());
        params.push(Box::new(category_id.clone()));
    }

    if let Some(ref author_id) = query.author_id {
        conditions.push("r.author_id = ?".to_string());
        params.push(Box::new(author_id.clone()));
    }

    if let Some(ref search) = query.search {
        conditions.push(r"(r.title LIKE ? ESCAPE '\' OR r.description LIKE ? ESCAPE '\')".to_string());
        let pattern = format!("%{}%", escape_like(search));
        params.push(Box::new(pattern.clone()));
        params.push(Box::new(pattern));
    }

    if let Some(min_likes) = query.min_likes {
        conditions.push("r.like_count >= ?".to_string());
        params.push(Box::new(min_likes));
    }

    if let Some(range) = query.time_range {
        conditions.push("r.created_at >= ?".to_string());
        params.push(Box::new(range.since(Utc::now())));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    let count_sql = format!("SELECT COUNT(*) FROM rankings r{}", where_clause);
    let total: i64 = conn.query_row(&count_sql, param_refs(&params).as_slice(), |row| row.get(0))?;

    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

    let sql = format!(
        "{}{} ORDER BY {} LIMIT ? OFFSET ?",
        view_select(),
        where_clause,
        query.sort_by.order_clause()
    );
    let offset = (page - 1)
        .checked_mul(limit)
        .ok_or_else(|| ApiError::bad_request("Page is out of range"))?;
    params.push(Box::new(limit));
    params.push(Box::new(offset));

    debug!("Executing query: {}", sql);

    let mut stmt = conn.prepare(&sql)?;
    let mut views = stmt
        .query_map(param_refs(&params).as_slice(), view_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    for view in views.iter_mut() {
        view.items = load_items(conn, &view.ranking.id, item_limit)?;
        view.tags = load_tags(conn, &view.ranking.id)?;
    }

    Ok(Page::new(views, total, page, limit))
}

/// Escape LIKE wildcards so a search matches them literally
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn check_category(conn: &Connection, category_id: Option<&str>) -> Result<(), ApiError> {
    if let Some(id) = category_id {
        let exists = conn
            .query_row("SELECT 1 FROM categories WHERE id = ?", [id], |_| Ok(()))
            .optional()?
            .is_some();
        if !exists {
            return Err(ApiError::bad_request("Unknown category"));
        }
    }
    Ok(())
}

fn write_items(conn: &Connection, ranking_id: &str, items: &[RankingItemInput]) -> Result<(), ApiError> {
    conn.execute("DELETE FROM ranking_items WHERE ranking_id = ?", [ranking_id])?;
    let mut stmt = conn.prepare(
        "INSERT INTO ranking_items (id, ranking_id, position, name, description, image_url, justification)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    for (index, item) in items.iter().enumerate() {
        stmt.execute(params![
            new_id(),
            ranking_id,
            index as i64 + 1,
            item.name.trim(),
            item.description,
            item.image_url.as_deref().filter(|u| !u.is_empty()),
            item.justification,
        ])?;
    }
    Ok(())
}

fn write_tags(conn: &Connection, ranking_id: &str, tags: &[String]) -> Result<(), ApiError> {
    conn.execute("DELETE FROM ranking_tags WHERE ranking_id = ?", [ranking_id])?;
    let now = Utc::now();
    for name in tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        conn.execute(
            "INSERT INTO tags (id, name, created_at) VALUES (?1, ?2, ?3) ON CONFLICT(name) DO NOTHING",
            params![new_id(), name, now],
        )?;
        conn.execute(
            "INSERT OR IGNORE INTO ranking_tags (ranking_id, tag_id)
             SELECT ?1, id FROM tags WHERE name = ?2",
            params![ranking_id, name],
        )?;
    }
    Ok(())
}

/// Create a draft ranking with items numbered from 1
pub fn create_ranking(conn: &mut Connection, author_id: &str, input: &RankingInput) -> Result<RankingView, ApiError> {
    let tx = conn.transaction()?;
    check_category(&tx, input.category_id.as_deref())?;

    let id = new_id();
    let now = Utc::now();
    tx.execute(
        "INSERT INTO rankings (id, title, description, status, author_id, category_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![
            id,
            input.title.trim(),
            input.description,
            RankingStatus::Draft.as_str(),
            author_id,
            input.category_id,
            now,
        ],
    )?;
    write_items(&tx, &id, &input.items)?;
    write_tags(&tx, &id, &input.tags)?;
    tx.commit()?;

    debug!(ranking = %id, author = %author_id, "Created ranking");
    require_ranking_view(conn, &id, Some(author_id))
}

/// Replace a ranking's fields, items and tags. Editing a rejected ranking resubmits it as a draft.
pub fn update_ranking(
    conn: &mut Connection,
    id: &str,
    user_id: &str,
    input: &RankingInput,
) -> Result<RankingView, ApiError> {
    let tx = conn.transaction()?;
    let ranking = require_author(&tx, id, user_id)?;
    check_category(&tx, input.category_id.as_deref())?;

    let status = ranking.status.after_edit();
    tx.execute(
        "UPDATE rankings SET title = ?2, description = ?3, category_id = ?4, status = ?5, updated_at = ?6
         WHERE id = ?1",
        params![id, input.title.trim(), input.description, input.category_id, status.as_str(), Utc::now()],
    )?;
    write_items(&tx, id, &input.items)?;
    write_tags(&tx, id, &input.tags)?;
    tx.commit()?;

    require_ranking_view(conn, id, Some(user_id))
}

pub fn delete_ranking(conn: &Connection, id: &str, user_id: &str) -> Result<(), ApiError> {
    require_author(conn, id, user_id)?;
    conn.execute("DELETE FROM rankings WHERE id = ?", [id])?;
    Ok(())
}

/// Publish a draft: stamp it, count it for the author and refresh their credibility
pub fn publish_ranking(
    conn: &mut Connection,
    id: &str,
    user_id: &str,
    weights: &CredibilityWeights,
) -> Result<RankingView, ApiError> {
    let tx = conn.transaction()?;
    let ranking = require_author(&tx, id, user_id)?;
    let status = ranking.status.publish()?;

    let now = Utc::now();
    tx.execute(
        "UPDATE rankings SET status = ?2, published_at = ?3, updated_at = ?3 WHERE id = ?1",
        params![id, status.as_str(), now],
    )?;
    bump_counter(&tx, user_id, UserCounter::RankingsPublished, 1)?;
    recompute_credibility(&tx, user_id, weights)?;
    tx.commit()?;

    require_ranking_view(conn, id, Some(user_id))
}

/// Moderator rejection of a draft
pub fn reject_ranking(conn: &Connection, id: &str, reviewer_id: &str, reason: &str) -> Result<RankingRow, ApiError> {
    let ranking = require_ranking(conn, id)?;
    let status = ranking.status.reject()?;

    let now = Utc::now();
    conn.execute(
        "UPDATE rankings SET status = ?2, rejection_reason = ?3, reviewed_at = ?4, reviewed_by = ?5, updated_at = ?4
         WHERE id = ?1",
        params![id, status.as_str(), reason, now, reviewer_id],
    )?;
    require_ranking(conn, id)
}

/// Like or unlike a ranking
///
/// Adjusts the ranking's like count and the author's likes-received
/// counter, then recomputes the author's credibility from scratch.
pub fn toggle_like(
    conn: &mut Connection,
    user_id: &str,
    ranking_id: &str,
    weights: &CredibilityWeights,
) -> Result<LikeToggle, ApiError> {
    let tx = conn.transaction()?;
    let ranking = require_ranking(&tx, ranking_id)?;

    let removed = tx.execute(
        "DELETE FROM likes WHERE user_id = ? AND ranking_id = ?",
        params![user_id, ranking_id],
    )?;
    let (liked, delta) = if removed > 0 {
        (false, -1)
    } else {
        tx.execute(
            "INSERT INTO likes (user_id, ranking_id, created_at) VALUES (?1, ?2, ?3)",
            params![user_id, ranking_id, Utc::now()],
        )?;
        (true, 1)
    };

    tx.execute(
        "UPDATE rankings SET like_count = MAX(0, like_count + ?2) WHERE id = ?1",
        params![ranking_id, delta],
    )?;
    bump_counter(&tx, &ranking.author_id, UserCounter::LikesReceived, delta)?;
    recompute_credibility(&tx, &ranking.author_id, weights)?;

    let count: i64 = tx.query_row("SELECT like_count FROM rankings WHERE id = ?", [ranking_id], |row| row.get(0))?;
    tx.commit()?;

    Ok(LikeToggle { liked, count })
}

pub fn set_collaborative(conn: &Connection, id: &str) -> Result<(), ApiError> {
    conn.execute("UPDATE rankings SET is_collaborative = 1 WHERE id = ?", [id])?;
    Ok(())
}

/// Rankings liked by `user_id`
pub fn count_likes_given(conn: &Connection, user_id: &str) -> Result<i64, ApiError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM likes WHERE user_id = ?", [user_id], |row| row.get(0))?)
}

pub fn count_published(conn: &Connection) -> Result<i64, ApiError> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM rankings WHERE status = ?",
        [RankingStatus::Published.as_str()],
        |row| row.get(0),
    )?)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::users::tests::{conn, user};
    use crate::db::users::require_user;

    pub(crate) fn input(title: &str, items: usize) -> RankingInput {
        RankingInput {
            title: title.into(),
            description: Some("best of".into()),
            category_id: None,
            items: (0..items)
                .map(|i| RankingItemInput {
                    name: format!("item {}", i + 1),
                    description: None,
                    image_url: Some(String::new()),
                    justification: None,
                })
                .collect(),
            tags: vec!["ai".into(), " ai ".into(), "llm".into()],
        }
    }

    #[test]
    fn test_create_draft_with_positions() {
        let mut conn = conn();
        let ada = user(&conn, "ada");
        let view = create_ranking(&mut conn, &ada.id, &input("Best models", 3)).unwrap();

        assert_eq!(view.ranking.status, RankingStatus::Draft);
        let positions: Vec<_> = view.items.iter().map(|i| i.position).collect();
        assert_eq!(positions, vec![1, 2, 3]);
        assert_eq!(view.items[0].image_url, None);
        assert_eq!(view.tags.len(), 2);
        assert_eq!(view.is_liked, Some(false));
    }

    #[test]
    fn test_publish_updates_author() {
        let mut conn = conn();
        let ada = user(&conn, "ada");
        let weights = CredibilityWeights::default();
        let view = create_ranking(&mut conn, &ada.id, &input("Best models", 2)).unwrap();

        let published = publish_ranking(&mut conn, &view.ranking.id, &ada.id, &weights).unwrap();
        assert_eq!(published.ranking.status, RankingStatus::Published);
        assert!(published.ranking.published_at.is_some());

        let author = require_user(&conn, &ada.id).unwrap();
        assert_eq!(author.total_rankings_published, 1);
        assert_eq!(author.credibility_score, 10);

        let err = publish_ranking(&mut conn, &view.ranking.id, &ada.id, &weights).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn test_only_author_may_publish() {
        let mut conn = conn();
        let ada = user(&conn, "ada");
        let bob = user(&conn, "bob");
        let view = create_ranking(&mut conn, &ada.id, &input("Best models", 2)).unwrap();
        let err = publish_ranking(&mut conn, &view.ranking.id, &bob.id, &CredibilityWeights::default())
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[test]
    fn test_reject_then_edit_resubmits() {
        let mut conn = conn();
        let ada = user(&conn, "ada");
        let admin = user(&conn, "mod");
        let view = create_ranking(&mut conn, &ada.id, &input("Best models", 2)).unwrap();

        let rejected = reject_ranking(&conn, &view.ranking.id, &admin.id, "duplicate").unwrap();
        assert_eq!(rejected.status, RankingStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("duplicate"));

        let edited = update_ranking(&mut conn, &view.ranking.id, &ada.id, &input("Best models v2", 4)).unwrap();
        assert_eq!(edited.ranking.status, RankingStatus::Draft);
        assert_eq!(edited.items.len(), 4);
    }

    #[test]
    fn test_like_unlike_restores_credibility() {
        let mut conn = conn();
        let ada = user(&conn, "ada");
        let bob = user(&conn, "bob");
        let weights = CredibilityWeights::default();
        let view = create_ranking(&mut conn, &ada.id, &input("Best models", 2)).unwrap();
        publish_ranking(&mut conn, &view.ranking.id, &ada.id, &weights).unwrap();
        let before = require_user(&conn, &ada.id).unwrap().credibility_score;

        let liked = toggle_like(&mut conn, &bob.id, &view.ranking.id, &weights).unwrap();
        assert!(liked.liked);
        assert_eq!(liked.count, 1);
        assert_eq!(require_user(&conn, &ada.id).unwrap().credibility_score, before + 2);

        let unliked = toggle_like(&mut conn, &bob.id, &view.ranking.id, &weights).unwrap();
        assert!(!unliked.liked);
        assert_eq!(unliked.count, 0);
        assert_eq!(require_user(&conn, &ada.id).unwrap().credibility_score, before);
    }

    #[test]
    fn test_list_defaults_to_published() {
        let mut conn = conn();
        let ada = user(&conn, "ada");
        let weights = CredibilityWeights::default();
        let first = create_ranking(&mut conn, &ada.id, &input("Anime heroes", 2)).unwrap();
        create_ranking(&mut conn, &ada.id, &input("Draft only", 2)).unwrap();
        publish_ranking(&mut conn, &first.ranking.id, &ada.id, &weights).unwrap();

        let page = list_rankings(&conn, &RankingQuery::default()).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].ranking.title, "Anime heroes");
        assert_eq!(page.page_size, DEFAULT_PAGE_SIZE);

        let all = list_rankings(&conn, &RankingQuery { status: Some("all".into()), ..Default::default() }).unwrap();
        assert_eq!(all.total, 2);

        let search = list_rankings(
            &conn,
            &RankingQuery { status: Some("all".into()), search: Some("Draft".into()), ..Default::default() },
        )
        .unwrap();
        assert_eq!(search.total, 1);
    }

    #[test]
    fn test_search_matches_wildcards_literally() {
        let mut conn = conn();
        let ada = user(&conn, "ada");
        create_ranking(&mut conn, &ada.id, &input("Top 100% picks", 2)).unwrap();
        create_ranking(&mut conn, &ada.id, &input("Plain list", 2)).unwrap();

        let search = |term: &str| {
            list_rankings(
                &conn,
                &RankingQuery { status: Some("all".into()), search: Some(term.into()), ..Default::default() },
            )
            .unwrap()
            .total
        };
        assert_eq!(search("%"), 1);
        assert_eq!(search("_"), 0);
        assert_eq!(search("100%"), 1);
        assert_eq!(escape_like(r"50%_off\"), r"50\%\_off\\");
    }

    #[test]
    fn test_out_of_range_pages() {
        let conn = conn();

        let err = list_rankings(&conn, &RankingQuery { page: Some(i64::MAX), ..Default::default() }).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let page = list_rankings(
            &conn,
            &RankingQuery { page: Some(-4), limit: Some(-1), ..Default::default() },
        )
        .unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, 1);

        let page = list_rankings(&conn, &RankingQuery { limit: Some(i64::MAX), ..Default::default() }).unwrap();
        assert_eq!(page.page_size, MAX_PAGE_SIZE);
    }

    #[test]
    fn test_time_range_bounds() {
        let now = Utc::now();
        assert!(TimeRange::Week.since(now) < now);
        assert!(TimeRange::Year.since(now) < TimeRange::Month.since(now));
        assert!(TimeRange::Today.since(now) <= now);
    }
}
