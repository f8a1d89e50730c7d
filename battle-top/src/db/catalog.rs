//! Categories, tags, leaderboards and the static catalogs mirrored into SQLite

use battle_core::{achievements::ACHIEVEMENTS, economy::SHOP_CATALOG, tasks::DAILY_TASKS, RankingStatus};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::new_id;
use super::users::{summary_columns, UserSummary};
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CategoryKind {
    AiModel,
    AnimeCharacter,
    EducationalInstitution,
    Custom,
}

impl CategoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryKind::AiModel => "AI_MODEL",
            CategoryKind::AnimeCharacter => "ANIME_CHARACTER",
            CategoryKind::EducationalInstitution => "EDUCATIONAL_INSTITUTION",
            CategoryKind::Custom => "CUSTOM",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRow {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub kind: String,
    pub created_at: DateTime<Utc>,
    /// Published rankings in this category
    pub ranking_count: i64,
}

/// Category reference embedded in rankings
#[derive(Debug, Clone, Serialize)]
pub struct CategorySummary {
    pub id: String,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagCount {
    pub id: String,
    pub name: String,
    pub ranking_count: i64,
}

pub fn list_categories(conn: &Connection) -> Result<Vec<CategoryRow>, ApiError> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.name, c.slug, c.description, c.kind, c.created_at,
                (SELECT COUNT(*) FROM rankings r WHERE r.category_id = c.id AND r.status = ?1) AS ranking_count
         FROM categories c ORDER BY c.name ASC",
    )?;
    let rows = stmt
        .query_map([RankingStatus::Published.as_str()], |row| {
            Ok(CategoryRow {
                id: row.get("id")?,
                name: row.get("name")?,
                slug: row.get("slug")?,
                description: row.get("description")?,
                kind: row.get("kind")?,
                created_at: row.get("created_at")?,
                ranking_count: row.get("ranking_count")?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Create a category unless one with the same name exists. Returns whether it was created.
pub fn ensure_category(
    conn: &Connection,
    name: &str,
    slug: &str,
    description: &str,
    kind: CategoryKind,
) -> Result<bool, ApiError> {
    let existing: Option<String> = conn
        .query_row("SELECT id FROM categories WHERE name = ?", [name], |row| row.get(0))
        .optional()?;
    if existing.is_some() {
        return Ok(false);
    }
    conn.execute(
        "INSERT INTO categories (id, name, slug, description, kind, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![new_id(), name, slug, description, kind.as_str(), Utc::now()],
    )?;
    Ok(true)
}

pub fn list_tags(conn: &Connection) -> Result<Vec<TagCount>, ApiError> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.name, COUNT(rt.ranking_id) AS ranking_count
         FROM tags t LEFT JOIN ranking_tags rt ON rt.tag_id = t.id
         GROUP BY t.id ORDER BY ranking_count DESC, t.name ASC",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(TagCount {
                id: row.get(0)?,
                name: row.get(1)?,
                ranking_count: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Leaderboard ordering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaderboardKind {
    #[default]
    Credibility,
    Likes,
    Rankings,
    Battle,
    Mvp,
    Subscribers,
    Level,
}

impl LeaderboardKind {
    fn order_clause(&self) -> &'static str {
        match self {
            LeaderboardKind::Credibility => "u.credibility_score DESC",
            LeaderboardKind::Likes => "u.total_likes_received DESC",
            LeaderboardKind::Rankings => "u.total_rankings_published DESC",
            LeaderboardKind::Battle => "u.battle_wins DESC",
            LeaderboardKind::Mvp => "u.mvp_count DESC",
            LeaderboardKind::Subscribers => "subscriber_count DESC",
            LeaderboardKind::Level => "u.level DESC, u.exp DESC",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardUser {
    #[serde(flatten)]
    pub user: UserSummary,
    pub total_likes_received: i64,
    pub total_rankings_published: i64,
    pub battle_wins: i64,
    pub mvp_count: i64,
    pub subscriber_count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardRanking {
    pub id: String,
    pub title: String,
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
    pub category_name: Option<String>,
    pub author: UserSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct Leaderboard {
    pub users: Vec<LeaderboardUser>,
    pub rankings: Vec<LeaderboardRanking>,
}

/// Top regular users by `kind`, plus the most liked published rankings
pub fn leaderboard(conn: &Connection, kind: LeaderboardKind, limit: i64) -> Result<Leaderboard, ApiError> {
    let sql = format!(
        "SELECT {cols}, u.total_likes_received, u.total_rankings_published, u.battle_wins, u.mvp_count,
                (SELECT COUNT(*) FROM subscriptions s WHERE s.target_id = u.id) AS subscriber_count
         FROM users u WHERE u.role = 'user'
         ORDER BY {order}, u.created_at ASC LIMIT ?",
        cols = summary_columns("u", "u_"),
        order = kind.order_clause()
    );
    let mut stmt = conn.prepare(&sql)?;
    let users = stmt
        .query_map([limit], |row| {
            Ok(LeaderboardUser {
                user: UserSummary::from_prefixed(row, "u_")?,
                total_likes_received: row.get("total_likes_received")?,
                total_rankings_published: row.get("total_rankings_published")?,
                battle_wins: row.get("battle_wins")?,
                mvp_count: row.get("mvp_count")?,
                subscriber_count: row.get("subscriber_count")?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let sql = format!(
        "SELECT r.id, r.title, r.view_count, r.like_count, r.comment_count, r.created_at,
                c.name AS category_name, {cols}
         FROM rankings r JOIN users a ON a.id = r.author_id
         LEFT JOIN categories c ON c.id = r.category_id
         WHERE r.status = ?1 ORDER BY r.like_count DESC, r.created_at DESC LIMIT ?2",
        cols = summary_columns("a", "author_")
    );
    let mut stmt = conn.prepare(&sql)?;
    let rankings = stmt
        .query_map(params![RankingStatus::Published.as_str(), limit], |row| {
            Ok(LeaderboardRanking {
                id: row.get("id")?,
                title: row.get("title")?,
                view_count: row.get("view_count")?,
                like_count: row.get("like_count")?,
                comment_count: row.get("comment_count")?,
                created_at: row.get("created_at")?,
                category_name: row.get("category_name")?,
                author: UserSummary::from_prefixed(row, "author_")?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Leaderboard { users, rankings })
}

/// Mirror the shop, task and achievement catalogs into their tables
///
/// Shop items that left the catalog are deactivated rather than deleted so
/// existing inventories keep their foreign keys.
pub fn sync_catalogs(conn: &Connection) -> Result<(), ApiError> {
    let mut stmt = conn.prepare(
        "INSERT INTO items (id, name, description, price, item_type, effect, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)
         ON CONFLICT(id) DO UPDATE SET name = excluded.name, description = excluded.description,
            price = excluded.price, item_type = excluded.item_type, effect = excluded.effect, is_active = 1",
    )?;
    for item in SHOP_CATALOG.iter() {
        stmt.execute(params![item.id, item.name, item.description, item.price, item.item_type, item.effect])?;
    }

    let known: Vec<&str> = SHOP_CATALOG.iter().map(|i| i.id).collect();
    let placeholders = vec!["?"; known.len()].join(", ");
    let retired = conn.execute(
        &format!("UPDATE items SET is_active = 0 WHERE is_active = 1 AND id NOT IN ({})", placeholders),
        rusqlite::params_from_iter(known.iter()),
    )?;
    if retired > 0 {
        info!(count = retired, "Deactivated retired shop items");
    }

    let mut stmt = conn.prepare(
        "INSERT INTO daily_tasks (id, name, description, reward, requirement, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, 1)
         ON CONFLICT(id) DO UPDATE SET name = excluded.name, description = excluded.description,
            reward = excluded.reward, requirement = excluded.requirement",
    )?;
    for task in DAILY_TASKS.iter() {
        stmt.execute(params![task.id, task.name, task.description, task.reward, task.requirement])?;
    }

    let mut stmt = conn.prepare(
        "INSERT INTO achievements (id, name, description, requirement, reward, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, 1)
         ON CONFLICT(id) DO UPDATE SET name = excluded.name, description = excluded.description,
            requirement = excluded.requirement, reward = excluded.reward",
    )?;
    for achievement in ACHIEVEMENTS.iter() {
        stmt.execute(params![
            achievement.id,
            achievement.name,
            achievement.description,
            achievement.requirement,
            achievement.reward
        ])?;
    }

    debug!("Catalogs synced");
    Ok(())
}
