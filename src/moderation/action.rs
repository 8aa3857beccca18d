//! Moderation action types
//!
//! `ActionKind` is the flat tag used for permission lookup, logging and the
//! `action_type` column; `ModerationAction` carries the per-command parameters.

use crate::moderation::RoleInfo;
use derive_more::Display;
use poise::serenity_prelude::Permissions;
use serde::{Deserialize, Serialize};

/// Type of moderation action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum ActionKind {
    Kick,
    Ban,
    Unban,
    #[display("Mute")]
    Timeout,
    #[display("Unmute")]
    RemoveTimeout,
    #[display("Voice Mute")]
    VoiceMute,
    #[display("Voice Unmute")]
    VoiceUnmute,
    Deafen,
    Undeafen,
    Disconnect,
    #[display("Nickname Change")]
    Nickname,
    #[display("Add Role")]
    AddRole,
    #[display("Remove Role")]
    RemoveRole,
    #[display("Create Role")]
    CreateRole,
    #[display("Delete Role")]
    DeleteRole,
    Lock,
    Unlock,
    Slowmode,
    Purge,
    Warn,
}

impl ActionKind {
    /// Code stored in the `action_type` column of the cases table
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Kick => "kick",
            Self::Ban => "ban",
            Self::Unban => "unban",
            Self::Timeout => "mute",
            Self::RemoveTimeout => "unmute",
            Self::VoiceMute => "voice_mute",
            Self::VoiceUnmute => "voice_unmute",
            Self::Deafen => "deafen",
            Self::Undeafen => "undeafen",
            Self::Disconnect => "disconnect",
            Self::Nickname => "nickname",
            Self::AddRole => "add_role",
            Self::RemoveRole => "remove_role",
            Self::CreateRole => "create_role",
            Self::DeleteRole => "delete_role",
            Self::Lock => "lock",
            Self::Unlock => "unlock",
            Self::Slowmode => "slowmode",
            Self::Purge => "purge",
            Self::Warn => "warn",
        }
    }

    /// Parse a stored `action_type` code
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        const ALL: [ActionKind; 20] = [
            ActionKind::Kick,
            ActionKind::Ban,
            ActionKind::Unban,
            ActionKind::Timeout,
            ActionKind::RemoveTimeout,
            ActionKind::VoiceMute,
            ActionKind::VoiceUnmute,
            ActionKind::Deafen,
            ActionKind::Undeafen,
            ActionKind::Disconnect,
            ActionKind::Nickname,
            ActionKind::AddRole,
            ActionKind::RemoveRole,
            ActionKind::CreateRole,
            ActionKind::DeleteRole,
            ActionKind::Lock,
            ActionKind::Unlock,
            ActionKind::Slowmode,
            ActionKind::Purge,
            ActionKind::Warn,
        ];
        ALL.into_iter().find(|kind| kind.as_str() == code)
    }

    /// The guild permission both the bot and the invoker need
    #[must_use]
    pub const fn required_permission(self) -> Permissions {
        match self {
            Self::Kick => Permissions::KICK_MEMBERS,
            Self::Ban | Self::Unban => Permissions::BAN_MEMBERS,
            Self::Timeout | Self::RemoveTimeout | Self::Warn => Permissions::MODERATE_MEMBERS,
            Self::VoiceMute | Self::VoiceUnmute => Permissions::MUTE_MEMBERS,
            Self::Deafen | Self::Undeafen => Permissions::DEAFEN_MEMBERS,
            Self::Disconnect => Permissions::MOVE_MEMBERS,
            Self::Nickname => Permissions::MANAGE_NICKNAMES,
            Self::AddRole | Self::RemoveRole | Self::CreateRole | Self::DeleteRole => {
                Permissions::MANAGE_ROLES
            }
            Self::Lock | Self::Unlock | Self::Slowmode => Permissions::MANAGE_CHANNELS,
            Self::Purge => Permissions::MANAGE_MESSAGES,
        }
    }

    /// Completes "I don't have permission to ..."
    #[must_use]
    pub const fn permission_phrase(self) -> &'static str {
        match self {
            Self::Kick => "kick members",
            Self::Ban | Self::Unban => "ban members",
            Self::Timeout | Self::RemoveTimeout => "timeout members",
            Self::Warn => "moderate members",
            Self::VoiceMute | Self::VoiceUnmute => "mute members",
            Self::Deafen | Self::Undeafen => "deafen members",
            Self::Disconnect => "move members",
            Self::Nickname => "manage nicknames",
            Self::AddRole | Self::RemoveRole | Self::CreateRole | Self::DeleteRole => {
                "manage roles"
            }
            Self::Lock | Self::Unlock | Self::Slowmode => "manage channels",
            Self::Purge => "manage messages",
        }
    }

    /// Completes "I cannot ... this member"
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Kick => "kick",
            Self::Ban => "ban",
            Self::Unban => "unban",
            Self::Timeout => "mute",
            Self::RemoveTimeout => "unmute",
            Self::VoiceMute => "voice mute",
            Self::VoiceUnmute => "voice unmute",
            Self::Deafen => "deafen",
            Self::Undeafen => "undeafen",
            Self::Disconnect => "disconnect",
            Self::Nickname => "change the nickname of",
            Self::AddRole | Self::RemoveRole => "manage roles for",
            Self::Warn => "warn",
            Self::CreateRole | Self::DeleteRole | Self::Lock | Self::Unlock | Self::Slowmode => {
                "moderate"
            }
            Self::Purge => "purge",
        }
    }

    /// Actions that only make sense while the target is in a voice channel
    #[must_use]
    pub const fn needs_voice(self) -> bool {
        matches!(
            self,
            Self::VoiceMute | Self::VoiceUnmute | Self::Deafen | Self::Undeafen | Self::Disconnect
        )
    }

    /// Actions that change an existing role, so the role itself is ranked too
    #[must_use]
    pub const fn manages_role(self) -> bool {
        matches!(self, Self::AddRole | Self::RemoveRole | Self::DeleteRole)
    }

    /// Actions aimed at a current guild member
    #[must_use]
    pub const fn needs_target(self) -> bool {
        !matches!(
            self,
            Self::Unban
                | Self::CreateRole
                | Self::DeleteRole
                | Self::Lock
                | Self::Unlock
                | Self::Slowmode
                | Self::Purge
        )
    }

    /// Actions that leave a row in the cases table
    #[must_use]
    pub const fn logs_case(self) -> bool {
        matches!(
            self,
            Self::Kick
                | Self::Ban
                | Self::Unban
                | Self::Timeout
                | Self::RemoveTimeout
                | Self::VoiceMute
                | Self::VoiceUnmute
                | Self::Deafen
                | Self::Undeafen
                | Self::Disconnect
                | Self::Nickname
        )
    }
}

/// Attributes of a role to be created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRole {
    pub name: String,
    pub colour: Option<u32>,
    pub hoist: bool,
    pub mentionable: bool,
}

/// A moderation action together with its parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModerationAction {
    Kick,
    Ban { delete_message_days: u8 },
    /// Unban works on a user id because the user is no longer a member
    Unban { user_id: u64, user_name: String },
    Timeout { seconds: i64 },
    RemoveTimeout,
    VoiceMute,
    VoiceUnmute,
    Deafen,
    Undeafen,
    Disconnect,
    /// `None` resets to the account name
    Nickname { nickname: Option<String> },
    AddRole { role: RoleInfo },
    RemoveRole { role: RoleInfo },
    CreateRole { role: NewRole },
    DeleteRole { role: RoleInfo },
    Lock { channel_id: u64 },
    Unlock { channel_id: u64 },
    Slowmode { channel_id: u64, seconds: i64 },
    Purge { channel_id: u64, count: i64 },
    Warn,
}

impl ModerationAction {
    /// Get the type of this action
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::Kick => ActionKind::Kick,
            Self::Ban { .. } => ActionKind::Ban,
            Self::Unban { .. } => ActionKind::Unban,
            Self::Timeout { .. } => ActionKind::Timeout,
            Self::RemoveTimeout => ActionKind::RemoveTimeout,
            Self::VoiceMute => ActionKind::VoiceMute,
            Self::VoiceUnmute => ActionKind::VoiceUnmute,
            Self::Deafen => ActionKind::Deafen,
            Self::Undeafen => ActionKind::Undeafen,
            Self::Disconnect => ActionKind::Disconnect,
            Self::Nickname { .. } => ActionKind::Nickname,
            Self::AddRole { .. } => ActionKind::AddRole,
            Self::RemoveRole { .. } => ActionKind::RemoveRole,
            Self::CreateRole { .. } => ActionKind::CreateRole,
            Self::DeleteRole { .. } => ActionKind::DeleteRole,
            Self::Lock { .. } => ActionKind::Lock,
            Self::Unlock { .. } => ActionKind::Unlock,
            Self::Slowmode { .. } => ActionKind::Slowmode,
            Self::Purge { .. } => ActionKind::Purge,
            Self::Warn => ActionKind::Warn,
        }
    }

    /// The existing role this action touches, if any
    #[must_use]
    pub const fn role(&self) -> Option<&RoleInfo> {
        match self {
            Self::AddRole { role } | Self::RemoveRole { role } | Self::DeleteRole { role } => {
                Some(role)
            }
            _ => None,
        }
    }
}
