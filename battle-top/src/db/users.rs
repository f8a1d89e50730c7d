//! User accounts, profiles and per-user counters

use battle_core::CredibilityWeights;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::new_id;
use crate::auth::Role;
use crate::error::ApiError;

/// User row from database
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub security_question: Option<String>,
    #[serde(skip_serializing)]
    pub security_answer_hash: Option<String>,
    pub role: Role,
    pub image: Option<String>,
    pub image_source: Option<String>,
    pub bio: Option<String>,
    pub title: Option<String>,
    pub website: Option<String>,
    pub weibo: Option<String>,
    pub twitter: Option<String>,
    pub github: Option<String>,
    #[serde(skip_serializing)]
    pub real_name: Option<String>,
    #[serde(skip_serializing)]
    pub id_card: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub credibility_score: i64,
    pub is_authoritative: bool,
    pub total_likes_received: i64,
    pub total_rankings_published: i64,
    pub mvp_count: i64,
    pub battle_wins: i64,
    pub battle_losses: i64,
    pub level: u32,
    pub exp: i64,
    pub total_recharged: f64,
    pub chat_frame: String,
    pub name_style: String,
    pub daily_streak: i64,
    pub last_daily_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        let role: String = row.get("role")?;
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            email: row.get("email")?,
            password_hash: row.get("password_hash")?,
            security_question: row.get("security_question")?,
            security_answer_hash: row.get("security_answer_hash")?,
            role: role.parse().unwrap_or_default(),
            image: row.get("image")?,
            image_source: row.get("image_source")?,
            bio: row.get("bio")?,
            title: row.get("title")?,
            website: row.get("website")?,
            weibo: row.get("weibo")?,
            twitter: row.get("twitter")?,
            github: row.get("github")?,
            real_name: row.get("real_name")?,
            id_card: row.get("id_card")?,
            verified_at: row.get("verified_at")?,
            credibility_score: row.get("credibility_score")?,
            is_authoritative: row.get("is_authoritative")?,
            total_likes_received: row.get("total_likes_received")?,
            total_rankings_published: row.get("total_rankings_published")?,
            mvp_count: row.get("mvp_count")?,
            battle_wins: row.get("battle_wins")?,
            battle_losses: row.get("battle_losses")?,
            level: row.get("level")?,
            exp: row.get("exp")?,
            total_recharged: row.get("total_recharged")?,
            chat_frame: row.get("chat_frame")?,
            name_style: row.get("name_style")?,
            daily_streak: row.get("daily_streak")?,
            last_daily_at: row.get("last_daily_at")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    pub fn is_verified(&self) -> bool {
        self.verified_at.is_some()
    }
}

/// Compact author card embedded in rankings, comments and debates
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub image: Option<String>,
    pub is_authoritative: bool,
    pub credibility_score: i64,
    pub level: u32,
    pub chat_frame: String,
    pub name_style: String,
}

/// Column list for joining a user as `alias` into another query
pub fn summary_columns(alias: &str, prefix: &str) -> String {
    format!(
        "{a}.id AS {p}id, {a}.name AS {p}name, {a}.image AS {p}image, \
         {a}.is_authoritative AS {p}is_authoritative, {a}.credibility_score AS {p}credibility_score, \
         {a}.level AS {p}level, {a}.chat_frame AS {p}chat_frame, {a}.name_style AS {p}name_style",
        a = alias,
        p = prefix
    )
}

impl UserSummary {
    /// Read columns produced by [`summary_columns`] with the same prefix
    pub fn from_prefixed(row: &Row, prefix: &str) -> Result<Self, rusqlite::Error> {
        let col = |name: &str| format!("{}{}", prefix, name);
        Ok(Self {
            id: row.get(col("id").as_str())?,
            name: row.get(col("name").as_str())?,
            image: row.get(col("image").as_str())?,
            is_authoritative: row.get(col("is_authoritative").as_str())?,
            credibility_score: row.get(col("credibility_score").as_str())?,
            level: row.get(col("level").as_str())?,
            chat_frame: row.get(col("chat_frame").as_str())?,
            name_style: row.get(col("name_style").as_str())?,
        })
    }

    /// Optional join (LEFT JOIN with a null id yields `None`)
    pub fn from_prefixed_opt(row: &Row, prefix: &str) -> Result<Option<Self>, rusqlite::Error> {
        let id: Option<String> = row.get(format!("{}id", prefix).as_str())?;
        match id {
            Some(_) => Self::from_prefixed(row, prefix).map(Some),
            None => Ok(None),
        }
    }
}

impl From<&UserRow> for UserSummary {
    fn from(user: &UserRow) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            image: user.image.clone(),
            is_authoritative: user.is_authoritative,
            credibility_score: user.credibility_score,
            level: user.level,
            chat_frame: user.chat_frame.clone(),
            name_style: user.name_style.clone(),
        }
    }
}

/// Input for creating a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub security_question: Option<String>,
    pub security_answer_hash: Option<String>,
    pub role: Role,
}

/// Profile fields the owner may edit; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub title: Option<String>,
    pub website: Option<String>,
    pub weibo: Option<String>,
    pub twitter: Option<String>,
    pub github: Option<String>,
}

/// Per-user counters adjusted by other operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCounter {
    LikesReceived,
    RankingsPublished,
    MvpCount,
    BattleWins,
    BattleLosses,
}

impl UserCounter {
    fn column(&self) -> &'static str {
        match self {
            UserCounter::LikesReceived => "total_likes_received",
            UserCounter::RankingsPublished => "total_rankings_published",
            UserCounter::MvpCount => "mvp_count",
            UserCounter::BattleWins => "battle_wins",
            UserCounter::BattleLosses => "battle_losses",
        }
    }
}

/// Create a user. Email and name must both be unused.
pub fn create_user(conn: &Connection, input: NewUser) -> Result<UserRow, ApiError> {
    let email = input.email.trim().to_lowercase();

    if email_exists(conn, &email)? {
        return Err(ApiError::Conflict("Email is already registered".into()));
    }
    if name_exists(conn, &input.name)? {
        return Err(ApiError::Conflict("Name is already taken".into()));
    }

    let id = new_id();
    let now = Utc::now();
    conn.execute(
        "INSERT INTO users (id, name, email, password_hash, security_question, security_answer_hash,
                            role, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            id,
            input.name,
            email,
            input.password_hash,
            input.security_question,
            input.security_answer_hash,
            input.role.as_str(),
            now,
        ],
    )?;

    debug!(user = %id, "Created user");
    require_user(conn, &id)
}

fn email_exists(conn: &Connection, email: &str) -> Result<bool, ApiError> {
    Ok(conn
        .query_row("SELECT 1 FROM users WHERE email = ?", [email], |_| Ok(()))
        .optional()?
        .is_some())
}

fn name_exists(conn: &Connection, name: &str) -> Result<bool, ApiError> {
    Ok(conn
        .query_row("SELECT 1 FROM users WHERE name = ?", [name], |_| Ok(()))
        .optional()?
        .is_some())
}

/// Get user by ID
pub fn get_user(conn: &Connection, id: &str) -> Result<Option<UserRow>, ApiError> {
    Ok(conn
        .query_row("SELECT * FROM users WHERE id = ?", [id], |row| UserRow::from_row(row))
        .optional()?)
}

/// Get user by ID or fail with 404
pub fn require_user(conn: &Connection, id: &str) -> Result<UserRow, ApiError> {
    get_user(conn, id)?.ok_or_else(|| ApiError::not_found("User"))
}

/// Case-insensitive email lookup
pub fn find_by_email(conn: &Connection, email: &str) -> Result<Option<UserRow>, ApiError> {
    let email = email.trim().to_lowercase();
    Ok(conn
        .query_row("SELECT * FROM users WHERE email = ?", [email], |row| UserRow::from_row(row))
        .optional()?)
}

pub fn update_profile(conn: &Connection, id: &str, update: &ProfileUpdate) -> Result<UserRow, ApiError> {
    if let Some(ref name) = update.name {
        let taken: Option<String> = conn
            .query_row("SELECT id FROM users WHERE name = ? AND id != ?", params![name, id], |row| row.get(0))
            .optional()?;
        if taken.is_some() {
            return Err(ApiError::Conflict("Name is already taken".into()));
        }
    }

    let changed = conn.execute(
        "UPDATE users SET
            name = COALESCE(?2, name),
            bio = COALESCE(?3, bio),
            image = COALESCE(?4, image),
            title = COALESCE(?5, title),
            website = COALESCE(?6, website),
            weibo = COALESCE(?7, weibo),
            twitter = COALESCE(?8, twitter),
            github = COALESCE(?9, github),
            updated_at = ?10
         WHERE id = ?1",
        params![
            id,
            update.name,
            update.bio,
            update.image,
            update.title,
            update.website,
            update.weibo,
            update.twitter,
            update.github,
            Utc::now(),
        ],
    )?;
    if changed == 0 {
        return Err(ApiError::not_found("User"));
    }
    require_user(conn, id)
}

pub fn set_avatar(conn: &Connection, id: &str, image: &str, source: &str) -> Result<UserRow, ApiError> {
    conn.execute(
        "UPDATE users SET image = ?2, image_source = ?3, updated_at = ?4 WHERE id = ?1",
        params![id, image, source, Utc::now()],
    )?;
    require_user(conn, id)
}

pub fn set_password(conn: &Connection, id: &str, password_hash: &str) -> Result<(), ApiError> {
    conn.execute(
        "UPDATE users SET password_hash = ?2, updated_at = ?3 WHERE id = ?1",
        params![id, password_hash, Utc::now()],
    )?;
    Ok(())
}

/// Record real-name verification. An ID number may back only one account.
pub fn set_verification(conn: &Connection, id: &str, real_name: &str, id_card: &str) -> Result<UserRow, ApiError> {
    let id_card = id_card.to_uppercase();
    let other: Option<String> = conn
        .query_row(
            "SELECT id FROM users WHERE id_card = ? AND id != ?",
            params![id_card, id],
            |row| row.get(0),
        )
        .optional()?;
    if other.is_some() {
        return Err(ApiError::Conflict("This ID number is already verified on another account".into()));
    }

    let now = Utc::now();
    conn.execute(
        "UPDATE users SET real_name = ?2, id_card = ?3, verified_at = ?4, updated_at = ?4 WHERE id = ?1",
        params![id, real_name, id_card, now],
    )?;
    require_user(conn, id)
}

/// Add `delta` to one counter, never going below zero
pub fn bump_counter(conn: &Connection, id: &str, counter: UserCounter, delta: i64) -> Result<(), ApiError> {
    let sql = format!(
        "UPDATE users SET {col} = MAX(0, {col} + ?2) WHERE id = ?1",
        col = counter.column()
    );
    conn.execute(&sql, params![id, delta])?;
    Ok(())
}

/// Recompute credibility and the authoritative flag from the stored counters
pub fn recompute_credibility(
    conn: &Connection,
    id: &str,
    weights: &CredibilityWeights,
) -> Result<(i64, bool), ApiError> {
    let (likes, published): (i64, i64) = conn.query_row(
        "SELECT total_likes_received, total_rankings_published FROM users WHERE id = ?",
        [id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    let score = weights.score(likes, published);
    let authoritative = weights.authoritative(score, published);

    conn.execute(
        "UPDATE users SET credibility_score = ?2, is_authoritative = ?3 WHERE id = ?1",
        params![id, score, authoritative],
    )?;

    Ok((score, authoritative))
}

/// Seed a trusted account with a fixed score and the authoritative flag
pub fn grant_authority(conn: &Connection, id: &str, score: i64) -> Result<(), ApiError> {
    conn.execute(
        "UPDATE users SET credibility_score = ?2, is_authoritative = 1, updated_at = ?3 WHERE id = ?1",
        params![id, score, Utc::now()],
    )?;
    Ok(())
}

pub fn count_users(conn: &Connection) -> Result<i64, ApiError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
}

pub fn count_authoritative(conn: &Connection) -> Result<i64, ApiError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM users WHERE is_authoritative = 1", [], |row| row.get(0))?)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::schema::init_schema;

    pub(crate) fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys=ON;").unwrap();
        init_schema(&conn).unwrap();
        crate::db::catalog::sync_catalogs(&conn).unwrap();
        conn
    }

    pub(crate) fn user(conn: &Connection, name: &str) -> UserRow {
        create_user(
            conn,
            NewUser {
                name: name.into(),
                email: format!("{}@example.com", name),
                password_hash: "hash".into(),
                security_question: None,
                security_answer_hash: None,
                role: Role::User,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_create_and_lookup() {
        let conn = conn();
        let ada = user(&conn, "ada");
        assert_eq!(ada.level, 1);
        assert_eq!(ada.chat_frame, "bronze");
        assert_eq!(find_by_email(&conn, "ADA@example.com ").unwrap().unwrap().id, ada.id);
    }

    #[test]
    fn test_duplicates_conflict() {
        let conn = conn();
        user(&conn, "ada");
        let err = create_user(
            &conn,
            NewUser {
                name: "other".into(),
                email: "Ada@Example.com".into(),
                password_hash: "hash".into(),
                security_question: None,
                security_answer_hash: None,
                role: Role::User,
            },
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[test]
    fn test_counters_and_credibility() {
        let conn = conn();
        let ada = user(&conn, "ada");
        let weights = CredibilityWeights::default();

        bump_counter(&conn, &ada.id, UserCounter::RankingsPublished, 5).unwrap();
        bump_counter(&conn, &ada.id, UserCounter::LikesReceived, 25).unwrap();
        assert_eq!(recompute_credibility(&conn, &ada.id, &weights).unwrap(), (100, true));

        bump_counter(&conn, &ada.id, UserCounter::LikesReceived, -100).unwrap();
        let (score, authoritative) = recompute_credibility(&conn, &ada.id, &weights).unwrap();
        assert_eq!(score, 50);
        assert!(!authoritative);
    }

    #[test]
    fn test_verification_unique_id_card() {
        let conn = conn();
        let ada = user(&conn, "ada");
        let bob = user(&conn, "bob");
        let verified = set_verification(&conn, &ada.id, "Ada L", "11010519491231002x").unwrap();
        assert!(verified.is_verified());
        assert_eq!(verified.id_card.as_deref(), Some("11010519491231002X"));

        let err = set_verification(&conn, &bob.id, "Bob", "11010519491231002X").unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[test]
    fn test_profile_update_keeps_unset_fields() {
        let conn = conn();
        let ada = user(&conn, "ada");
        update_profile(&conn, &ada.id, &ProfileUpdate { bio: Some("hi".into()), ..Default::default() }).unwrap();
        let updated = update_profile(
            &conn,
            &ada.id,
            &ProfileUpdate { title: Some("critic".into()), ..Default::default() },
        )
        .unwrap();
        assert_eq!(updated.bio.as_deref(), Some("hi"));
        assert_eq!(updated.title.as_deref(), Some("critic"));
    }
}
