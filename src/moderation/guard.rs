//! Permission and role-hierarchy guard
//!
//! Works on plain snapshots of the people involved so the decision can be made
//! (and tested) without a live gateway connection.

use crate::moderation::{ActionKind, ModerationError, ModerationResult};
use poise::serenity_prelude::Permissions;

/// The invoking moderator, or the bot's own member in the guild
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: u64,
    pub display_name: String,
    /// Resolved guild-level permissions
    pub permissions: Permissions,
    /// Position of the highest role held; 0 for `@everyone` only
    pub top_role_position: u16,
    pub is_guild_owner: bool,
}

impl Actor {
    /// Whether this actor holds `permission` (owners and administrators hold everything)
    #[must_use]
    pub fn has(&self, permission: Permissions) -> bool {
        self.is_guild_owner
            || self.permissions.administrator()
            || self.permissions.contains(permission)
    }
}

/// Voice state of a member currently connected to a voice channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceStatus {
    pub channel_id: u64,
    pub mute: bool,
    pub deaf: bool,
}

/// The member a command acts upon
#[derive(Debug, Clone)]
pub struct TargetMember {
    pub id: u64,
    pub display_name: String,
    pub top_role_position: u16,
    /// `None` when the member is not in a voice channel
    pub voice: Option<VoiceStatus>,
    pub timed_out: bool,
    pub role_ids: Vec<u64>,
}

impl TargetMember {
    #[must_use]
    pub fn has_role(&self, role_id: u64) -> bool {
        self.role_ids.contains(&role_id)
    }

    #[must_use]
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}

/// A guild role referenced by a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleInfo {
    pub id: u64,
    pub name: String,
    pub position: u16,
}

/// Decide whether `actor` may perform `action`, with the bot acting on its behalf.
///
/// Checks run in a fixed order: bot permission, actor permission, voice
/// presence for voice-only actions, target hierarchy, then role hierarchy for
/// role management. The first failing check decides the message.
///
/// # Errors
/// Returns `PermissionDenied`, `PreconditionFailed` or `HierarchyViolation`.
pub fn authorize(
    bot: &Actor,
    actor: &Actor,
    action: ActionKind,
    target: Option<&TargetMember>,
    role: Option<&RoleInfo>,
) -> ModerationResult<()> {
    let permission = action.required_permission();

    if !bot.has(permission) {
        return Err(ModerationError::PermissionDenied(format!(
            "I don't have permission to {}!",
            action.permission_phrase()
        )));
    }

    if !actor.has(permission) {
        return Err(ModerationError::PermissionDenied(format!(
            "You don't have permission to {}!",
            action.permission_phrase()
        )));
    }

    if action.needs_voice() {
        if let Some(target) = target {
            if target.voice.is_none() {
                return Err(ModerationError::precondition(format!(
                    "{} is not in a voice channel!",
                    target.display_name
                )));
            }
        }
    }

    // Ties favour the target.
    if let Some(target) = target {
        if target.top_role_position >= bot.top_role_position {
            return Err(ModerationError::HierarchyViolation(format!(
                "I cannot {} this member (their role is equal or higher than mine)!",
                action.verb()
            )));
        }
    }

    if action.manages_role() {
        if let Some(role) = role {
            if role.position >= bot.top_role_position {
                return Err(ModerationError::HierarchyViolation(format!(
                    "I cannot manage the role **{}** (it is equal or higher than my highest role)!",
                    role.name
                )));
            }
            if !actor.is_guild_owner && actor.top_role_position <= role.position {
                return Err(ModerationError::HierarchyViolation(format!(
                    "You cannot manage the role **{}** (it is equal or higher than your highest role)!",
                    role.name
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn actor(id: u64, permissions: Permissions, rank: u16) -> Actor {
        Actor {
            id,
            display_name: format!("user{id}"),
            permissions,
            top_role_position: rank,
            is_guild_owner: false,
        }
    }

    pub(crate) fn target(id: u64, rank: u16) -> TargetMember {
        TargetMember {
            id,
            display_name: format!("target{id}"),
            top_role_position: rank,
            voice: None,
            timed_out: false,
            role_ids: Vec::new(),
        }
    }

    fn role(position: u16) -> RoleInfo {
        RoleInfo {
            id: 900,
            name: "Helper".to_string(),
            position,
        }
    }

    #[test]
    fn test_allows_when_everything_lines_up() {
        let bot = actor(1, Permissions::KICK_MEMBERS, 10);
        let mod_ = actor(2, Permissions::KICK_MEMBERS, 8);
        let result = authorize(&bot, &mod_, ActionKind::Kick, Some(&target(3, 5)), None);
        assert!(result.is_ok());
    }

    #[test]
    fn test_bot_permission_checked_first() {
        let bot = actor(1, Permissions::empty(), 10);
        let mod_ = actor(2, Permissions::empty(), 8);
        let err = authorize(&bot, &mod_, ActionKind::Kick, Some(&target(3, 50)), None).unwrap_err();
        assert!(matches!(err, ModerationError::PermissionDenied(ref m) if m.starts_with("I don't")));
    }

    #[test]
    fn test_actor_permission_required() {
        let bot = actor(1, Permissions::BAN_MEMBERS, 10);
        let mod_ = actor(2, Permissions::KICK_MEMBERS, 8);
        let err = authorize(&bot, &mod_, ActionKind::Ban, Some(&target(3, 1)), None).unwrap_err();
        assert!(matches!(err, ModerationError::PermissionDenied(ref m) if m.starts_with("You don't")));
    }

    #[test]
    fn test_administrator_implies_every_bit() {
        let bot = actor(1, Permissions::ADMINISTRATOR, 10);
        let mod_ = actor(2, Permissions::ADMINISTRATOR, 8);
        assert!(authorize(&bot, &mod_, ActionKind::Purge, None, None).is_ok());
    }

    #[test]
    fn test_equal_rank_is_denied() {
        let bot = actor(1, Permissions::KICK_MEMBERS, 10);
        let mod_ = actor(2, Permissions::KICK_MEMBERS, 20);
        let err = authorize(&bot, &mod_, ActionKind::Kick, Some(&target(3, 10)), None).unwrap_err();
        assert!(matches!(err, ModerationError::HierarchyViolation(_)));
        assert!(err.user_message().contains("equal or higher"));
    }

    #[test]
    fn test_hierarchy_not_bypassable_by_actor_power() {
        let bot = actor(1, Permissions::ADMINISTRATOR, 10);
        let mut owner = actor(2, Permissions::ADMINISTRATOR, 99);
        owner.is_guild_owner = true;
        for rank in [10, 11, 200] {
            for action in [ActionKind::Kick, ActionKind::Ban, ActionKind::Timeout, ActionKind::Warn] {
                let result = authorize(&bot, &owner, action, Some(&target(3, rank)), None);
                assert!(
                    matches!(result, Err(ModerationError::HierarchyViolation(_))),
                    "{action:?} at rank {rank}"
                );
            }
        }
    }

    #[test]
    fn test_voice_precondition_runs_before_hierarchy() {
        let bot = actor(1, Permissions::MOVE_MEMBERS | Permissions::DEAFEN_MEMBERS, 10);
        let mod_ = actor(2, Permissions::MOVE_MEMBERS | Permissions::DEAFEN_MEMBERS, 20);
        // Outranks the bot and is not in voice: the voice message wins for every voice action.
        let high = target(3, 50);
        for action in [ActionKind::Disconnect, ActionKind::Deafen] {
            let err = authorize(&bot, &mod_, action, Some(&high), None).unwrap_err();
            assert!(matches!(err, ModerationError::PreconditionFailed(ref m) if m.contains("voice")));
        }

        let mut in_voice = target(4, 1);
        in_voice.voice = Some(VoiceStatus {
            channel_id: 77,
            mute: false,
            deaf: false,
        });
        assert!(authorize(&bot, &mod_, ActionKind::Disconnect, Some(&in_voice), None).is_ok());
    }

    #[test]
    fn test_role_hierarchy_for_actor() {
        let bot = actor(1, Permissions::MANAGE_ROLES, 30);
        let mod_ = actor(2, Permissions::MANAGE_ROLES, 10);

        let err = authorize(&bot, &mod_, ActionKind::DeleteRole, None, Some(&role(10))).unwrap_err();
        assert!(matches!(err, ModerationError::HierarchyViolation(ref m) if m.starts_with("You")));

        assert!(authorize(&bot, &mod_, ActionKind::DeleteRole, None, Some(&role(9))).is_ok());
    }

    #[test]
    fn test_guild_owner_skips_actor_role_check() {
        let bot = actor(1, Permissions::MANAGE_ROLES, 30);
        let mut owner = actor(2, Permissions::empty(), 0);
        owner.is_guild_owner = true;
        let result = authorize(&bot, &owner, ActionKind::AddRole, Some(&target(3, 1)), Some(&role(20)));
        assert!(result.is_ok());
    }

    #[test]
    fn test_bot_must_outrank_role() {
        let bot = actor(1, Permissions::MANAGE_ROLES, 30);
        let mut owner = actor(2, Permissions::empty(), 0);
        owner.is_guild_owner = true;
        let err = authorize(&bot, &owner, ActionKind::RemoveRole, None, Some(&role(30))).unwrap_err();
        assert!(matches!(err, ModerationError::HierarchyViolation(ref m) if m.starts_with("I cannot")));
    }
}
