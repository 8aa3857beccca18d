//! Error types for the moderation pipeline
//!
//! Every failure a command can hit maps onto one of these variants, and each
//! variant knows the short message the invoking moderator gets to see.

use ::serenity::http::HttpError;
use poise::serenity_prelude as serenity;
use thiserror::Error;

/// Errors that can occur while running a moderation command
#[derive(Debug, Error)]
pub enum ModerationError {
    /// Emergency shutdown is active and the invoker is not an owner
    #[error("Emergency shutdown is active")]
    ShutdownActive,

    /// The bot or the invoker lacks the permission bit for the action
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The target (or role) is ranked at or above the bot or the invoker
    #[error("Role hierarchy violation: {0}")]
    HierarchyViolation(String),

    /// A command-specific check failed before anything was changed
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// Discord refused the mutation
    #[error("Discord rejected the request: {0}")]
    PlatformRejected(String),

    /// Discord could not be reached or failed on its side
    #[error("Discord unavailable: {0}")]
    PlatformUnavailable(String),

    /// The case store is not configured
    #[error("Moderation tracking is not enabled")]
    DatabaseUnavailable,

    /// Anything else, tagged with the originating type name
    #[error("Unexpected {kind}: {message}")]
    Unexpected { kind: &'static str, message: String },
}

impl ModerationError {
    /// Wrap an arbitrary error, keeping its type name for the logs
    pub fn unexpected<E: std::fmt::Display>(error: E) -> Self {
        Self::Unexpected {
            kind: std::any::type_name::<E>(),
            message: error.to_string(),
        }
    }

    /// The message shown to the invoking moderator
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::ShutdownActive => {
                "❌ The bot is currently in emergency shutdown mode. Please try again later."
                    .to_string()
            }
            Self::PermissionDenied(message)
            | Self::HierarchyViolation(message)
            | Self::PreconditionFailed(message) => format!("❌ {message}"),
            Self::PlatformRejected(message) => format!("❌ Discord rejected the action: {message}"),
            Self::PlatformUnavailable(_) => {
                "❌ Discord is not responding right now. Please try again in a moment.".to_string()
            }
            Self::DatabaseUnavailable => {
                "❌ Moderation tracking is not enabled on this bot.".to_string()
            }
            Self::Unexpected { .. } => "❌ An unexpected error occurred.".to_string(),
        }
    }

    /// Create a precondition error
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::PreconditionFailed(message.into())
    }
}

impl From<serenity::Error> for ModerationError {
    fn from(error: serenity::Error) -> Self {
        match &error {
            serenity::Error::Http(HttpError::UnsuccessfulRequest(response))
                if response.status_code.is_client_error() =>
            {
                Self::PlatformRejected(response.error.message.clone())
            }
            serenity::Error::Model(_) => Self::PlatformRejected(error.to_string()),
            _ => Self::PlatformUnavailable(error.to_string()),
        }
    }
}

/// Result type for moderation operations
pub type ModerationResult<T> = Result<T, ModerationError>;
