//! Database schema definitions

use rusqlite::Connection;
use tracing::info;

use crate::error::ApiError;

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<(), ApiError> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Creating new database schema v{}", SCHEMA_VERSION);
        create_tables(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version < SCHEMA_VERSION {
        info!("Migrating schema from v{} to v{}", current_version, SCHEMA_VERSION);
        migrate_schema(conn, current_version)?;
    } else {
        info!("Database schema is up to date (v{})", current_version);
    }

    Ok(())
}

/// Get current schema version (0 if not initialized)
fn get_schema_version(conn: &Connection) -> Result<i32, ApiError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        [],
    )?;

    let version = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
        .unwrap_or(0);

    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<(), ApiError> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?)", [version])?;
    Ok(())
}

fn create_tables(conn: &Connection) -> Result<(), ApiError> {
    conn.execute_batch(USERS_SCHEMA)
        .map_err(|e| ApiError::Database(format!("Failed to create user tables: {}", e)))?;
    conn.execute_batch(RANKINGS_SCHEMA)
        .map_err(|e| ApiError::Database(format!("Failed to create ranking tables: {}", e)))?;
    conn.execute_batch(SOCIAL_SCHEMA)
        .map_err(|e| ApiError::Database(format!("Failed to create social tables: {}", e)))?;
    conn.execute_batch(ECONOMY_SCHEMA)
        .map_err(|e| ApiError::Database(format!("Failed to create economy tables: {}", e)))?;
    conn.execute_batch(PROGRESS_SCHEMA)
        .map_err(|e| ApiError::Database(format!("Failed to create progress tables: {}", e)))?;
    conn.execute_batch(INDEXES_SCHEMA)
        .map_err(|e| ApiError::Database(format!("Failed to create indexes: {}", e)))?;
    Ok(())
}

fn migrate_schema(conn: &Connection, from_version: i32) -> Result<(), ApiError> {
    info!("No migration steps registered from v{}", from_version);
    set_schema_version(conn, SCHEMA_VERSION)?;
    Ok(())
}

const USERS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    security_question TEXT,
    security_answer_hash TEXT,
    role TEXT NOT NULL DEFAULT 'user',
    image TEXT,
    image_source TEXT,
    bio TEXT,
    title TEXT,
    website TEXT,
    weibo TEXT,
    twitter TEXT,
    github TEXT,
    real_name TEXT,
    id_card TEXT UNIQUE,
    verified_at TEXT,
    credibility_score INTEGER NOT NULL DEFAULT 0,
    is_authoritative INTEGER NOT NULL DEFAULT 0,
    total_likes_received INTEGER NOT NULL DEFAULT 0,
    total_rankings_published INTEGER NOT NULL DEFAULT 0,
    mvp_count INTEGER NOT NULL DEFAULT 0,
    battle_wins INTEGER NOT NULL DEFAULT 0,
    battle_losses INTEGER NOT NULL DEFAULT 0,
    level INTEGER NOT NULL DEFAULT 1,
    exp INTEGER NOT NULL DEFAULT 0,
    total_recharged REAL NOT NULL DEFAULT 0,
    chat_frame TEXT NOT NULL DEFAULT 'bronze',
    name_style TEXT NOT NULL DEFAULT 'default',
    daily_streak INTEGER NOT NULL DEFAULT 0,
    last_daily_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

const RANKINGS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS categories (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL UNIQUE,
    slug TEXT NOT NULL UNIQUE,
    description TEXT,
    kind TEXT NOT NULL DEFAULT 'CUSTOM',
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tags (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS rankings (
    id TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    description TEXT,
    status TEXT NOT NULL DEFAULT 'DRAFT',
    author_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    category_id TEXT REFERENCES categories(id) ON DELETE SET NULL,
    view_count INTEGER NOT NULL DEFAULT 0,
    like_count INTEGER NOT NULL DEFAULT 0,
    comment_count INTEGER NOT NULL DEFAULT 0,
    is_collaborative INTEGER NOT NULL DEFAULT 0,
    rejection_reason TEXT,
    reviewed_at TEXT,
    reviewed_by TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    published_at TEXT
);

CREATE TABLE IF NOT EXISTS ranking_items (
    id TEXT PRIMARY KEY NOT NULL,
    ranking_id TEXT NOT NULL REFERENCES rankings(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    name TEXT NOT NULL,
    description TEXT,
    image_url TEXT,
    justification TEXT
);

CREATE TABLE IF NOT EXISTS ranking_tags (
    ranking_id TEXT NOT NULL REFERENCES rankings(id) ON DELETE CASCADE,
    tag_id TEXT NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    PRIMARY KEY (ranking_id, tag_id)
);

CREATE TABLE IF NOT EXISTS likes (
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    ranking_id TEXT NOT NULL REFERENCES rankings(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    PRIMARY KEY (user_id, ranking_id)
);

CREATE TABLE IF NOT EXISTS comments (
    id TEXT PRIMARY KEY NOT NULL,
    ranking_id TEXT NOT NULL REFERENCES rankings(id) ON DELETE CASCADE,
    author_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    parent_id TEXT REFERENCES comments(id) ON DELETE CASCADE,
    content TEXT NOT NULL,
    like_count INTEGER NOT NULL DEFAULT 0,
    reply_count INTEGER NOT NULL DEFAULT 0,
    is_mvp INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS comment_likes (
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    comment_id TEXT NOT NULL REFERENCES comments(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    PRIMARY KEY (user_id, comment_id)
);
"#;

const SOCIAL_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS subscriptions (
    subscriber_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    target_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    PRIMARY KEY (subscriber_id, target_id)
);

CREATE TABLE IF NOT EXISTS notifications (
    id TEXT PRIMARY KEY NOT NULL,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    kind TEXT NOT NULL,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    link TEXT,
    is_read INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS ranking_collaborators (
    ranking_id TEXT NOT NULL REFERENCES rankings(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    role TEXT NOT NULL DEFAULT 'editor',
    invited_at TEXT NOT NULL,
    accepted_at TEXT,
    PRIMARY KEY (ranking_id, user_id)
);

CREATE TABLE IF NOT EXISTS donations (
    id TEXT PRIMARY KEY NOT NULL,
    from_user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    to_user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    ranking_id TEXT REFERENCES rankings(id) ON DELETE SET NULL,
    amount REAL NOT NULL,
    message TEXT,
    status TEXT NOT NULL DEFAULT 'pending',
    created_at TEXT NOT NULL
);
"#;

const ECONOMY_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS wallets (
    user_id TEXT PRIMARY KEY NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    balance INTEGER NOT NULL DEFAULT 0 CHECK (balance >= 0),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS transactions (
    id TEXT PRIMARY KEY NOT NULL,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    kind TEXT NOT NULL,
    amount INTEGER NOT NULL,
    description TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS items (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    price INTEGER NOT NULL,
    item_type TEXT NOT NULL,
    effect TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS user_items (
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    item_id TEXT NOT NULL REFERENCES items(id) ON DELETE CASCADE,
    quantity INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (user_id, item_id)
);

CREATE TABLE IF NOT EXISTS vip_memberships (
    user_id TEXT PRIMARY KEY NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    plan TEXT NOT NULL,
    start_date TEXT NOT NULL,
    end_date TEXT NOT NULL,
    auto_renew INTEGER NOT NULL DEFAULT 0,
    is_active INTEGER NOT NULL DEFAULT 1,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS debates (
    id TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    description TEXT,
    creator_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    challenger_id TEXT REFERENCES users(id) ON DELETE SET NULL,
    creator_ranking_id TEXT NOT NULL REFERENCES rankings(id) ON DELETE CASCADE,
    challenger_ranking_id TEXT REFERENCES rankings(id) ON DELETE SET NULL,
    reward INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'open',
    creator_votes INTEGER NOT NULL DEFAULT 0,
    challenger_votes INTEGER NOT NULL DEFAULT 0,
    winner_id TEXT,
    created_at TEXT NOT NULL,
    started_at TEXT,
    ended_at TEXT
);

CREATE TABLE IF NOT EXISTS debate_votes (
    debate_id TEXT NOT NULL REFERENCES debates(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    vote_for TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (debate_id, user_id)
);
"#;

const PROGRESS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS daily_tasks (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    reward INTEGER NOT NULL,
    requirement INTEGER NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS user_daily_tasks (
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    task_id TEXT NOT NULL REFERENCES daily_tasks(id) ON DELETE CASCADE,
    day TEXT NOT NULL,
    progress INTEGER NOT NULL DEFAULT 0,
    completed INTEGER NOT NULL DEFAULT 0,
    claimed INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (user_id, task_id, day)
);

CREATE TABLE IF NOT EXISTS achievements (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    requirement INTEGER NOT NULL,
    reward INTEGER NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS user_achievements (
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    achievement_id TEXT NOT NULL REFERENCES achievements(id) ON DELETE CASCADE,
    unlocked_at TEXT NOT NULL,
    PRIMARY KEY (user_id, achievement_id)
);
"#;

const INDEXES_SCHEMA: &str = r#"
CREATE INDEX IF NOT EXISTS idx_rankings_status ON rankings(status);
CREATE INDEX IF NOT EXISTS idx_rankings_author ON rankings(author_id);
CREATE INDEX IF NOT EXISTS idx_rankings_category ON rankings(category_id);
CREATE INDEX IF NOT EXISTS idx_ranking_items_ranking ON ranking_items(ranking_id, position);
CREATE INDEX IF NOT EXISTS idx_comments_ranking ON comments(ranking_id, parent_id);
CREATE INDEX IF NOT EXISTS idx_subscriptions_target ON subscriptions(target_id);
CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id, is_read);
CREATE INDEX IF NOT EXISTS idx_transactions_user ON transactions(user_id, created_at);
CREATE INDEX IF NOT EXISTS idx_donations_to ON donations(to_user_id);
CREATE INDEX IF NOT EXISTS idx_donations_from ON donations(from_user_id);
CREATE INDEX IF NOT EXISTS idx_debates_status ON debates(status, created_at);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_wallet_balance_cannot_go_negative() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO users (id, name, email, password_hash, created_at, updated_at)
             VALUES ('u1', 'ada', 'ada@example.com', 'x', '2025-01-01', '2025-01-01')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO wallets (user_id, balance, created_at, updated_at)
             VALUES ('u1', 5, '2025-01-01', '2025-01-01')",
            [],
        )
        .unwrap();
        let result = conn.execute("UPDATE wallets SET balance = balance - 10 WHERE user_id = 'u1'", []);
        assert!(result.is_err());
    }
}
