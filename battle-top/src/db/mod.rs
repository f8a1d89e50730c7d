//! SQLite storage
//!
//! One connection behind a mutex. Reads go through [`Database::with_conn`];
//! anything that writes more than one row goes through
//! [`Database::with_conn_mut`] and opens a transaction.
//!
//! ## Tables
//!
//! - `users` - accounts, profile, counters, level and cosmetics
//! - `rankings`, `ranking_items`, `ranking_tags`, `categories`, `tags`
//! - `likes`, `comments`, `comment_likes`
//! - `subscriptions`, `notifications`, `ranking_collaborators`, `donations`
//! - `wallets`, `transactions`, `items`, `user_items`, `vip_memberships`
//! - `debates`, `debate_votes`
//! - `daily_tasks`, `user_daily_tasks`, `achievements`, `user_achievements`

pub mod catalog;
pub mod comments;
pub mod debates;
pub mod economy;
pub mod progress;
pub mod rankings;
pub mod schema;
pub mod social;
pub mod users;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::ApiError;

/// SQLite database for all Battle Top data
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create the database file
    pub fn open(path: &Path) -> Result<Self, ApiError> {
        info!("Opening SQLite database at {:?}", path);

        let conn = Connection::open(path)
            .map_err(|e| ApiError::Database(format!("Failed to open SQLite: {}", e)))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| ApiError::Database(format!("Failed to set PRAGMA: {}", e)))?;

        Self::init(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, ApiError> {
        debug!("Opening in-memory SQLite database");

        let conn = Connection::open_in_memory()
            .map_err(|e| ApiError::Database(format!("Failed to open in-memory SQLite: {}", e)))?;

        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, ApiError> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        schema::init_schema(&conn)?;
        catalog::sync_catalogs(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run a read with shared access to the connection
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Connection) -> Result<T, ApiError>,
    {
        let conn = self.lock();
        f(&conn)
    }

    /// Execute a write operation with exclusive access
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&mut Connection) -> Result<T, ApiError>,
    {
        let mut conn = self.lock();
        f(&mut conn)
    }

    /// A request that panicked while holding the connection has already had
    /// its open transaction rolled back on unwind, so the connection is reused.
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| {
            warn!("Recovering database connection after a panicked request");
            self.conn.clear_poison();
            poisoned.into_inner()
        })
    }

    /// Row counts for the main tables
    pub fn stats(&self) -> Result<DbStats, ApiError> {
        self.with_conn(|conn| {
            let count = |table: &str| -> Result<i64, ApiError> {
                Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?)
            };
            Ok(DbStats {
                user_count: count("users")?,
                ranking_count: count("rankings")?,
                comment_count: count("comments")?,
                transaction_count: count("transactions")?,
            })
        })
    }
}

/// Database statistics
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DbStats {
    pub user_count: i64,
    pub ranking_count: i64,
    pub comment_count: i64,
    pub transaction_count: i64,
}

/// One page of results
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, page: i64, page_size: i64) -> Self {
        let total_pages = if page_size > 0 {
            (total + page_size - 1) / page_size
        } else {
            0
        };
        Self {
            items,
            total,
            page,
            page_size,
            total_pages,
        }
    }
}

/// Fresh row id
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Collect boxed params into the slice form rusqlite expects
pub(crate) fn param_refs(params: &[Box<dyn rusqlite::ToSql>]) -> Vec<&dyn rusqlite::ToSql> {
    params.iter().map(|p| p.as_ref()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        let stats = db.stats().unwrap();
        assert_eq!(stats.user_count, 0);
        assert_eq!(stats.ranking_count, 0);
    }

    #[test]
    fn test_open_file_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("battle.db");
        {
            let db = Database::open(&path).unwrap();
            db.with_conn(|conn| {
                conn.execute(
                    "INSERT INTO categories (id, name, slug, created_at) VALUES ('c1', 'Anime', 'anime', '2025-01-01')",
                    [],
                )?;
                Ok(())
            })
            .unwrap();
        }
        let db = Database::open(&path).unwrap();
        let count: i64 = db
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM categories", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_survives_panicking_request() {
        let db = Database::open_in_memory().unwrap();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            db.with_conn(|_| -> Result<(), ApiError> { panic!("handler bug") })
        }));
        assert!(result.is_err());

        assert_eq!(db.stats().unwrap().user_count, 0);
    }

    #[test]
    fn test_page_math() {
        let page: Page<i32> = Page::new(vec![], 25, 1, 12);
        assert_eq!(page.total_pages, 3);
        let page: Page<i32> = Page::new(vec![], 0, 1, 12);
        assert_eq!(page.total_pages, 0);
    }
}
