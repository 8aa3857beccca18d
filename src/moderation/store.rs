//! Case store
//!
//! Persists cases, warnings and notes in SQLite. The store can run without a
//! database: every operation then returns its empty value (`None`, `[]`, `0`,
//! `false`). Database errors are logged here and never reach callers.

use crate::STORE_TARGET;
use crate::moderation::{ActionKind, ModNote, ModerationCase, NewEntry, Warning};
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::{error, info, warn};

const SCHEMA: [&str; 6] = [
    r"
    CREATE TABLE IF NOT EXISTS cases (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        guild_id INTEGER NOT NULL,
        user_id INTEGER NOT NULL,
        moderator_id INTEGER NOT NULL,
        action_type TEXT NOT NULL,
        reason TEXT,
        user_name TEXT,
        moderator_name TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS warnings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        guild_id INTEGER NOT NULL,
        user_id INTEGER NOT NULL,
        moderator_id INTEGER NOT NULL,
        reason TEXT NOT NULL,
        user_name TEXT,
        moderator_name TEXT,
        created_at TEXT NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS notes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        guild_id INTEGER NOT NULL,
        user_id INTEGER NOT NULL,
        moderator_id INTEGER NOT NULL,
        note TEXT NOT NULL,
        user_name TEXT,
        moderator_name TEXT,
        created_at TEXT NOT NULL
    )
    ",
    "CREATE INDEX IF NOT EXISTS idx_cases_member ON cases(guild_id, user_id)",
    "CREATE INDEX IF NOT EXISTS idx_warnings_member ON warnings(guild_id, user_id)",
    "CREATE INDEX IF NOT EXISTS idx_notes_member ON notes(guild_id, user_id)",
];

/// Snowflakes never use the sign bit, so the cast is lossless.
#[allow(clippy::cast_possible_wrap)]
const fn sql_id(id: u64) -> i64 {
    id as i64
}

/// Store for moderation records
#[derive(Clone, Debug)]
pub struct CaseStore {
    pool: Option<SqlitePool>,
}

impl CaseStore {
    /// Connect and create the schema, falling back to a disabled store on failure
    pub async fn connect(url: &str, min_connections: u32, max_connections: u32) -> Self {
        let url = if url.starts_with("sqlite:") && !url.contains("mode=") {
            let separator = if url.contains('?') { '&' } else { '?' };
            format!("{url}{separator}mode=rwc")
        } else {
            url.to_string()
        };

        let pool = match SqlitePoolOptions::new()
            .min_connections(min_connections)
            .max_connections(max_connections.max(1))
            .connect(&url)
            .await
        {
            Ok(pool) => pool,
            Err(e) => {
                error!(target: STORE_TARGET, error = %e, "Database connection failed, tracking disabled");
                return Self::disabled();
            }
        };

        if let Err(e) = Self::create_schema(&pool).await {
            error!(target: STORE_TARGET, error = %e, "Schema creation failed, tracking disabled");
            return Self::disabled();
        }

        info!(target: STORE_TARGET, "Case store ready");
        Self { pool: Some(pool) }
    }

    /// A store with no database behind it
    #[must_use]
    pub const fn disabled() -> Self {
        Self { pool: None }
    }

    #[cfg(test)]
    pub(crate) async fn in_memory() -> Self {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory database");
        Self::create_schema(&pool).await.expect("schema");
        Self { pool: Some(pool) }
    }

    async fn create_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(pool).await?;
        }
        Ok(())
    }

    /// Whether writes will be persisted
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.pool.is_some()
    }

    fn log_failure(operation: &str, e: &sqlx::Error) {
        error!(target: STORE_TARGET, operation, error = %e, "Database operation failed");
    }

    // Cases

    /// Record a moderation action, returning the new case number
    pub async fn create_case(
        &self,
        entry: NewEntry<'_>,
        action: ActionKind,
        reason: Option<&str>,
    ) -> Option<i64> {
        let Some(pool) = &self.pool else {
            warn!(target: STORE_TARGET, action = %action, "Case not stored, tracking disabled");
            return None;
        };
        let now = Utc::now();
        let result = sqlx::query(
            r"
            INSERT INTO cases (guild_id, user_id, moderator_id, action_type, reason,
                               user_name, moderator_name, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(sql_id(entry.guild_id))
        .bind(sql_id(entry.user_id))
        .bind(sql_id(entry.moderator_id))
        .bind(action.as_str())
        .bind(reason)
        .bind(entry.user_name)
        .bind(entry.moderator_name)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await;

        match result {
            Ok(done) => Some(done.last_insert_rowid()),
            Err(e) => {
                Self::log_failure("create_case", &e);
                None
            }
        }
    }

    /// Fetch one case of this guild
    pub async fn get_case(&self, case_id: i64, guild_id: u64) -> Option<ModerationCase> {
        let pool = self.pool.as_ref()?;
        sqlx::query_as::<_, ModerationCase>("SELECT * FROM cases WHERE id = ? AND guild_id = ?")
            .bind(case_id)
            .bind(sql_id(guild_id))
            .fetch_optional(pool)
            .await
            .unwrap_or_else(|e| {
                Self::log_failure("get_case", &e);
                None
            })
    }

    /// Most recent cases for a member, newest first
    pub async fn list_cases(&self, guild_id: u64, user_id: u64, limit: i64) -> Vec<ModerationCase> {
        let Some(pool) = &self.pool else {
            return Vec::new();
        };
        sqlx::query_as::<_, ModerationCase>(
            "SELECT * FROM cases WHERE guild_id = ? AND user_id = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(sql_id(guild_id))
        .bind(sql_id(user_id))
        .bind(limit)
        .fetch_all(pool)
        .await
        .unwrap_or_else(|e| {
            Self::log_failure("list_cases", &e);
            Vec::new()
        })
    }

    /// Replace the reason of a case; `false` when no such case exists in this guild
    pub async fn update_case_reason(&self, case_id: i64, guild_id: u64, reason: &str) -> bool {
        let Some(pool) = &self.pool else {
            return false;
        };
        sqlx::query("UPDATE cases SET reason = ?, updated_at = ? WHERE id = ? AND guild_id = ?")
            .bind(reason)
            .bind(Utc::now())
            .bind(case_id)
            .bind(sql_id(guild_id))
            .execute(pool)
            .await
            .map(|done| done.rows_affected() > 0)
            .unwrap_or_else(|e| {
                Self::log_failure("update_case_reason", &e);
                false
            })
    }

    pub async fn count_cases(&self, guild_id: u64, user_id: u64) -> i64 {
        self.count("SELECT COUNT(*) FROM cases WHERE guild_id = ? AND user_id = ?", guild_id, user_id)
            .await
    }

    // Warnings

    /// Record a warning, returning its number
    pub async fn create_warning(&self, entry: NewEntry<'_>, reason: &str) -> Option<i64> {
        let Some(pool) = &self.pool else {
            warn!(target: STORE_TARGET, "Warning not stored, tracking disabled");
            return None;
        };
        let result = sqlx::query(
            r"
            INSERT INTO warnings (guild_id, user_id, moderator_id, reason,
                                  user_name, moderator_name, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(sql_id(entry.guild_id))
        .bind(sql_id(entry.user_id))
        .bind(sql_id(entry.moderator_id))
        .bind(reason)
        .bind(entry.user_name)
        .bind(entry.moderator_name)
        .bind(Utc::now())
        .execute(pool)
        .await;

        match result {
            Ok(done) => Some(done.last_insert_rowid()),
            Err(e) => {
                Self::log_failure("create_warning", &e);
                None
            }
        }
    }

    pub async fn get_warning(&self, warning_id: i64, guild_id: u64) -> Option<Warning> {
        let pool = self.pool.as_ref()?;
        sqlx::query_as::<_, Warning>("SELECT * FROM warnings WHERE id = ? AND guild_id = ?")
            .bind(warning_id)
            .bind(sql_id(guild_id))
            .fetch_optional(pool)
            .await
            .unwrap_or_else(|e| {
                Self::log_failure("get_warning", &e);
                None
            })
    }

    /// Most recent warnings for a member, newest first
    pub async fn list_warnings(&self, guild_id: u64, user_id: u64, limit: i64) -> Vec<Warning> {
        let Some(pool) = &self.pool else {
            return Vec::new();
        };
        sqlx::query_as::<_, Warning>(
            "SELECT * FROM warnings WHERE guild_id = ? AND user_id = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(sql_id(guild_id))
        .bind(sql_id(user_id))
        .bind(limit)
        .fetch_all(pool)
        .await
        .unwrap_or_else(|e| {
            Self::log_failure("list_warnings", &e);
            Vec::new()
        })
    }

    /// Delete every warning of a member, returning how many were removed
    pub async fn clear_warnings(&self, guild_id: u64, user_id: u64) -> u64 {
        let Some(pool) = &self.pool else {
            return 0;
        };
        sqlx::query("DELETE FROM warnings WHERE guild_id = ? AND user_id = ?")
            .bind(sql_id(guild_id))
            .bind(sql_id(user_id))
            .execute(pool)
            .await
            .map(|done| done.rows_affected())
            .unwrap_or_else(|e| {
                Self::log_failure("clear_warnings", &e);
                0
            })
    }

    pub async fn count_warnings(&self, guild_id: u64, user_id: u64) -> i64 {
        self.count("SELECT COUNT(*) FROM warnings WHERE guild_id = ? AND user_id = ?", guild_id, user_id)
            .await
    }

    // Notes

    pub async fn create_note(&self, entry: NewEntry<'_>, note: &str) -> Option<i64> {
        let Some(pool) = &self.pool else {
            warn!(target: STORE_TARGET, "Note not stored, tracking disabled");
            return None;
        };
        let result = sqlx::query(
            r"
            INSERT INTO notes (guild_id, user_id, moderator_id, note,
                               user_name, moderator_name, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(sql_id(entry.guild_id))
        .bind(sql_id(entry.user_id))
        .bind(sql_id(entry.moderator_id))
        .bind(note)
        .bind(entry.user_name)
        .bind(entry.moderator_name)
        .bind(Utc::now())
        .execute(pool)
        .await;

        match result {
            Ok(done) => Some(done.last_insert_rowid()),
            Err(e) => {
                Self::log_failure("create_note", &e);
                None
            }
        }
    }

    pub async fn get_note(&self, note_id: i64, guild_id: u64) -> Option<ModNote> {
        let pool = self.pool.as_ref()?;
        sqlx::query_as::<_, ModNote>("SELECT * FROM notes WHERE id = ? AND guild_id = ?")
            .bind(note_id)
            .bind(sql_id(guild_id))
            .fetch_optional(pool)
            .await
            .unwrap_or_else(|e| {
                Self::log_failure("get_note", &e);
                None
            })
    }

    /// Most recent notes for a member, newest first
    pub async fn list_notes(&self, guild_id: u64, user_id: u64, limit: i64) -> Vec<ModNote> {
        let Some(pool) = &self.pool else {
            return Vec::new();
        };
        sqlx::query_as::<_, ModNote>(
            "SELECT * FROM notes WHERE guild_id = ? AND user_id = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(sql_id(guild_id))
        .bind(sql_id(user_id))
        .bind(limit)
        .fetch_all(pool)
        .await
        .unwrap_or_else(|e| {
            Self::log_failure("list_notes", &e);
            Vec::new()
        })
    }

    /// Delete a note of this guild; `false` when it did not exist
    pub async fn delete_note(&self, note_id: i64, guild_id: u64) -> bool {
        let Some(pool) = &self.pool else {
            return false;
        };
        sqlx::query("DELETE FROM notes WHERE id = ? AND guild_id = ?")
            .bind(note_id)
            .bind(sql_id(guild_id))
            .execute(pool)
            .await
            .map(|done| done.rows_affected() > 0)
            .unwrap_or_else(|e| {
                Self::log_failure("delete_note", &e);
                false
            })
    }

    async fn count(&self, sql: &str, guild_id: u64, user_id: u64) -> i64 {
        let Some(pool) = &self.pool else {
            return 0;
        };
        sqlx::query_scalar::<_, i64>(sql)
            .bind(sql_id(guild_id))
            .bind(sql_id(user_id))
            .fetch_one(pool)
            .await
            .unwrap_or_else(|e| {
                Self::log_failure("count", &e);
                0
            })
    }
}
