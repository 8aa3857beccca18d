//! Stored moderation records
//!
//! Rows of the `cases`, `warnings` and `notes` tables. Snowflakes are stored as
//! SQLite integers and converted back to `u64` on read.

use crate::moderation::ActionKind;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::{Display, Formatter};

/// A logged moderation action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ModerationCase {
    pub id: i64,
    #[sqlx(try_from = "i64")]
    pub guild_id: u64,
    #[sqlx(try_from = "i64")]
    pub user_id: u64,
    #[sqlx(try_from = "i64")]
    pub moderator_id: u64,
    /// One of the `ActionKind::as_str` codes
    pub action_type: String,
    pub reason: Option<String>,
    pub user_name: Option<String>,
    pub moderator_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ModerationCase {
    /// Human readable action name, falling back to the raw code
    #[must_use]
    pub fn action_label(&self) -> String {
        ActionKind::from_code(&self.action_type)
            .map_or_else(|| self.action_type.clone(), |kind| kind.to_string())
    }
}

impl Display for ModerationCase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "**Case #{}** {} by <@{}> <t:{}:R>\nReason: {}",
            self.id,
            self.action_label(),
            self.moderator_id,
            self.created_at.timestamp(),
            self.reason.as_deref().unwrap_or("No reason provided"),
        )
    }
}

/// A formal warning against a member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Warning {
    pub id: i64,
    #[sqlx(try_from = "i64")]
    pub guild_id: u64,
    #[sqlx(try_from = "i64")]
    pub user_id: u64,
    #[sqlx(try_from = "i64")]
    pub moderator_id: u64,
    pub reason: String,
    pub user_name: Option<String>,
    pub moderator_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Display for Warning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "**#{}** by <@{}> <t:{}:R>\n{}",
            self.id,
            self.moderator_id,
            self.created_at.timestamp(),
            self.reason
        )
    }
}

/// A private moderator note about a member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ModNote {
    pub id: i64,
    #[sqlx(try_from = "i64")]
    pub guild_id: u64,
    #[sqlx(try_from = "i64")]
    pub user_id: u64,
    #[sqlx(try_from = "i64")]
    pub moderator_id: u64,
    pub note: String,
    pub user_name: Option<String>,
    pub moderator_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Display for ModNote {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "**#{}** by <@{}> <t:{}:R>\n{}",
            self.id,
            self.moderator_id,
            self.created_at.timestamp(),
            self.note
        )
    }
}

/// The who-did-what-to-whom part shared by every new record
#[derive(Debug, Clone, Copy)]
pub struct NewEntry<'a> {
    pub guild_id: u64,
    pub user_id: u64,
    pub moderator_id: u64,
    pub user_name: &'a str,
    pub moderator_name: &'a str,
}
