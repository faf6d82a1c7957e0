//! SQLite persistence for tracked notifications and per-guild settings.
//!
//! Every tracked notification is a single row; all access is single-row
//! select/insert/delete, so no transactions are needed beyond per-statement
//! atomicity. Concurrent writers always target disjoint records because the
//! Discord message id is unique across the table.
//!
//! # Schema Versioning
//!
//! The database uses SQLite's `user_version` pragma to track schema versions.
//! When the schema changes, increment `SCHEMA_VERSION` and add a migration
//! function in `run_migrations`.

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};

/// Current schema version. Increment when making schema changes.
const SCHEMA_VERSION: i32 = 1;

/// A tracked PTAL notification: one Discord message mirroring one PR.
///
/// The row itself is immutable after creation; only the rendered Discord
/// message changes. The row is deleted once the PR is observed merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRecord {
    pub id: i64,
    pub guild_id: String,
    pub channel_id: String,
    pub message_id: String,
    pub repo_owner: String,
    pub repo_name: String,
    pub pr_number: u64,
    pub description: String,
    /// RFC 3339 timestamp of when tracking started.
    pub created_at: String,
}

/// Fields for a notification that has not been assigned an id yet.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub guild_id: String,
    pub channel_id: String,
    pub message_id: String,
    pub repo_owner: String,
    pub repo_name: String,
    pub pr_number: u64,
    pub description: String,
}

/// Per-guild notification settings, consumed read-only by the core paths.
/// A missing row or a NULL role means no mention is emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildConfig {
    pub guild_id: String,
    pub mention_role_id: Option<String>,
}

/// SQLite database for notification records and guild configs.
///
/// Uses a `Mutex<Connection>` because `rusqlite::Connection` is not `Sync`.
/// All statements here are short single-row operations.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create the database file at the given path.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite database at {:?}", path))?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;

        Ok(db)
    }

    /// Create an in-memory database (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;

        Ok(db)
    }

    /// Initialize the database schema and run any pending migrations.
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().expect("mutex poisoned");

        let current_version: i32 =
            conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        if current_version > SCHEMA_VERSION {
            anyhow::bail!(
                "Database schema version {} is newer than supported version {}. \
                 Please upgrade the application.",
                current_version,
                SCHEMA_VERSION
            );
        }

        if current_version < SCHEMA_VERSION {
            Self::run_migrations(&conn, current_version)?;
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        }

        Ok(())
    }

    /// Run migrations from `from_version` up to `SCHEMA_VERSION`.
    fn run_migrations(conn: &Connection, from_version: i32) -> Result<()> {
        if from_version < 1 {
            Self::migrate_v0_to_v1(conn)?;
        }

        // Future migrations go here:
        // if from_version < 2 {
        //     Self::migrate_v1_to_v2(conn)?;
        // }

        Ok(())
    }

    /// Migration v0 -> v1: Create initial schema.
    fn migrate_v0_to_v1(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS notifications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                guild_id TEXT NOT NULL,
                channel_id TEXT NOT NULL,
                -- One notification per Discord message; UNIQUE prevents
                -- double-tracking the same message.
                message_id TEXT NOT NULL UNIQUE,
                repo_owner TEXT NOT NULL,
                repo_name TEXT NOT NULL,
                pr_number INTEGER NOT NULL,
                description TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_notifications_repo
            ON notifications(repo_owner, repo_name);

            CREATE TABLE IF NOT EXISTS guild_configs (
                guild_id TEXT PRIMARY KEY,
                mention_role_id TEXT
            );
            "#,
        )
        .context("Failed to create initial schema (v0 -> v1)")?;

        Ok(())
    }

    /// Insert a notification and return its assigned id.
    ///
    /// Fails if the message id is already tracked (UNIQUE violation).
    pub fn insert_notification(&self, new: &NewNotification) -> Result<i64> {
        let conn = self.conn.lock().expect("mutex poisoned");

        conn.execute(
            r#"
            INSERT INTO notifications (
                guild_id, channel_id, message_id,
                repo_owner, repo_name, pr_number, description, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            rusqlite::params![
                &new.guild_id,
                &new.channel_id,
                &new.message_id,
                &new.repo_owner,
                &new.repo_name,
                new.pr_number,
                &new.description,
                chrono::Utc::now().to_rfc3339(),
            ],
        )
        .context("Failed to insert notification")?;

        Ok(conn.last_insert_rowid())
    }

    /// Load every tracked notification (the sweep's work list).
    pub fn all_notifications(&self) -> Result<Vec<NotificationRecord>> {
        let conn = self.conn.lock().expect("mutex poisoned");

        let mut stmt = conn
            .prepare(
                r#"
                SELECT id, guild_id, channel_id, message_id,
                       repo_owner, repo_name, pr_number, description, created_at
                FROM notifications
                ORDER BY id
                "#,
            )
            .context("Failed to prepare load statement")?;

        let rows = stmt
            .query_map([], row_to_record)
            .context("Failed to query notifications")?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.context("Failed to read notification row")?);
        }

        Ok(results)
    }

    /// All notifications tracking PRs in the given repository, used to fan
    /// out one automation signal to every configured destination.
    pub fn notifications_for_repo(
        &self,
        repo_owner: &str,
        repo_name: &str,
    ) -> Result<Vec<NotificationRecord>> {
        let conn = self.conn.lock().expect("mutex poisoned");

        let mut stmt = conn
            .prepare(
                r#"
                SELECT id, guild_id, channel_id, message_id,
                       repo_owner, repo_name, pr_number, description, created_at
                FROM notifications
                WHERE repo_owner = ?1 AND repo_name = ?2
                ORDER BY id
                "#,
            )
            .context("Failed to prepare repo query")?;

        let rows = stmt
            .query_map(rusqlite::params![repo_owner, repo_name], row_to_record)
            .context("Failed to query notifications by repo")?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.context("Failed to read notification row")?);
        }

        Ok(results)
    }

    /// Get a single notification by id.
    pub fn get_notification(&self, id: i64) -> Result<Option<NotificationRecord>> {
        let conn = self.conn.lock().expect("mutex poisoned");

        conn.query_row(
            r#"
            SELECT id, guild_id, channel_id, message_id,
                   repo_owner, repo_name, pr_number, description, created_at
            FROM notifications
            WHERE id = ?1
            "#,
            rusqlite::params![id],
            row_to_record,
        )
        .optional()
        .context("Failed to get notification")
    }

    /// Delete a notification. Returns whether a row was removed.
    pub fn delete_notification(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().expect("mutex poisoned");

        let rows_affected = conn
            .execute(
                "DELETE FROM notifications WHERE id = ?1",
                rusqlite::params![id],
            )
            .context("Failed to delete notification")?;

        Ok(rows_affected > 0)
    }

    /// Look up the notification settings for a guild, if any.
    pub fn guild_config(&self, guild_id: &str) -> Result<Option<GuildConfig>> {
        let conn = self.conn.lock().expect("mutex poisoned");

        conn.query_row(
            "SELECT guild_id, mention_role_id FROM guild_configs WHERE guild_id = ?1",
            rusqlite::params![guild_id],
            |row| {
                Ok(GuildConfig {
                    guild_id: row.get(0)?,
                    mention_role_id: row.get(1)?,
                })
            },
        )
        .optional()
        .context("Failed to get guild config")
    }

    /// Insert or update a guild's notification settings.
    pub fn upsert_guild_config(&self, config: &GuildConfig) -> Result<()> {
        let conn = self.conn.lock().expect("mutex poisoned");

        conn.execute(
            r#"
            INSERT INTO guild_configs (guild_id, mention_role_id)
            VALUES (?1, ?2)
            ON CONFLICT (guild_id)
            DO UPDATE SET mention_role_id = excluded.mention_role_id
            "#,
            rusqlite::params![&config.guild_id, &config.mention_role_id],
        )
        .context("Failed to upsert guild config")?;

        Ok(())
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<NotificationRecord> {
    Ok(NotificationRecord {
        id: row.get(0)?,
        guild_id: row.get(1)?,
        channel_id: row.get(2)?,
        message_id: row.get(3)?,
        repo_owner: row.get(4)?,
        repo_name: row.get(5)?,
        pr_number: row.get(6)?,
        description: row.get(7)?,
        created_at: row.get(8)?,
    })
}
