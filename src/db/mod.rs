//! SQLite-backed store for the social graph and everything hanging off it.
//!
//! The database lives at `~/.kendraa/kendraa.db`. Every service-layer
//! operation goes through `SocialDb`; the submodules group queries per entity
//! family (profiles, posts, connections, jobs, events, messaging,
//! notifications).

use std::path::PathBuf;

use rusqlite::Connection;

pub mod types;
pub use types::*;

pub mod auth;
pub mod connections;
pub mod events;
pub mod jobs;
pub mod messaging;
pub mod notifications;
pub mod posts;
pub mod profiles;

pub struct SocialDb {
    conn: Connection,
}

impl SocialDb {
    /// Borrow the underlying connection for ad-hoc queries.
    pub fn conn_ref(&self) -> &Connection {
        &self.conn
    }

    /// Execute a closure within a SQLite transaction.
    /// Commits on Ok, rolls back on Err.
    pub fn with_transaction<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<DbError>,
    {
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| E::from(DbError::Sqlite(e)))?;
        match f(self) {
            Ok(val) => {
                self.conn
                    .execute_batch("COMMIT")
                    .map_err(|e| E::from(DbError::Sqlite(e)))?;
                Ok(val)
            }
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    /// Open (or create) the database at `~/.kendraa/kendraa.db` and apply the
    /// schema.
    pub fn open() -> Result<Self, DbError> {
        let path = Self::db_path()?;
        Self::open_at(path)
    }

    /// Open a database at an explicit path. Useful for testing and for a
    /// config-overridden data directory.
    pub fn open_at(path: PathBuf) -> Result<Self, DbError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(DbError::CreateDir)?;
            }
        }

        let conn = Connection::open(&path)?;

        // Enable WAL mode for better concurrent read performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        crate::migrations::run_migrations(&conn).map_err(DbError::Migration)?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        Ok(Self { conn })
    }

    /// Resolve the default database path: `~/.kendraa/kendraa.db`.
    fn db_path() -> Result<PathBuf, DbError> {
        let home = dirs::home_dir().ok_or(DbError::HomeDirNotFound)?;
        Ok(home.join(".kendraa").join("kendraa.db"))
    }
}

// =============================================================================
// Shared test utilities
// =============================================================================


// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::test_utils::test_db;

    #[test]
    fn test_open_creates_tables() {
        let db = test_db();
        for table in [
            "profiles",
            "institutions",
            "posts",
            "post_likes",
            "post_comments",
            "connections",
            "follows",
            "jobs",
            "job_applications",
            "events",
            "event_registrations",
            "conversations",
            "conversation_participants",
            "messages",
            "notifications",
            "auth_users",
        ] {
            let count: i64 = db
                .conn_ref()
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                    row.get(0)
                })
                .unwrap_or_else(|e| panic!("{} table should exist: {}", table, e));
            assert_eq!(count, 0);
        }
    }

    #[test]
    fn test_idempotent_schema_application() {
        // Opening the same DB twice should not error (IF NOT EXISTS)
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("idempotent.db");

        let _db1 = super::SocialDb::open_at(path.clone()).expect("first open");
        let _db2 = super::SocialDb::open_at(path).expect("second open should not fail");
    }

    #[test]
    fn test_transaction_rolls_back_on_err() {
        let db = test_db();
        let result: Result<(), crate::db::DbError> = db.with_transaction(|db| {
            db.conn_ref()
                .execute(
                    "INSERT INTO posts (id, author_id, content, created_at)
                     VALUES ('p1', 'u1', 'hello', '2026-01-01T00:00:00Z')",
                    [],
                )
                .map_err(crate::db::DbError::Sqlite)?;
            Err(crate::db::DbError::Migration("forced".into()))
        });
        assert!(result.is_err());

        let count: i64 = db
            .conn_ref()
            .query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))
            .expect("count");
        assert_eq!(count, 0, "insert should have been rolled back");
    }
}
