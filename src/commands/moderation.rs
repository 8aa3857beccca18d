use super::{moderate, parse_user_id, reply};
use crate::moderation::ModerationAction;
use crate::{Context, Error};
use poise::serenity_prelude as serenity;

/// Kick a member from the server
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    default_member_permissions = "KICK_MEMBERS",
    required_permissions = "KICK_MEMBERS"
)]
pub async fn kick(
    ctx: Context<'_>,
    #[description = "The member to kick"] member: serenity::Member,
    #[description = "Reason for kicking"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    moderate(ctx, ModerationAction::Kick, Some(&member), reason).await
}

/// Ban a member from the server
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    default_member_permissions = "BAN_MEMBERS",
    required_permissions = "BAN_MEMBERS"
)]
pub async fn ban(
    ctx: Context<'_>,
    #[description = "The member to ban"] member: serenity::Member,
    #[description = "Days of their messages to delete (0-7)"]
    #[min = 0]
    #[max = 7]
    delete_message_days: Option<u8>,
    #[description = "Reason for banning"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    let action = ModerationAction::Ban {
        delete_message_days: delete_message_days.unwrap_or(0).min(7),
    };
    moderate(ctx, action, Some(&member), reason).await
}

/// Unban a user from the server
#[poise::command(slash_command, guild_only, default_member_permissions = "BAN_MEMBERS")]
pub async fn unban(
    ctx: Context<'_>,
    #[description = "The ID of the user to unban"] user_id: String,
) -> Result<(), Error> {
    let Some(user_id) = parse_user_id(&user_id) else {
        return reply(ctx, "❌ Invalid user ID!", true).await;
    };
    let user_name = match user_id.to_user(ctx).await {
        Ok(user) => user.name,
        Err(_) => user_id.to_string(),
    };
    let action = ModerationAction::Unban {
        user_id: user_id.get(),
        user_name,
    };
    moderate(ctx, action, None, None).await
}

/// Timeout a member
#[poise::command(slash_command, guild_only, default_member_permissions = "MODERATE_MEMBERS")]
pub async fn mute(
    ctx: Context<'_>,
    #[description = "The member to timeout"] member: serenity::Member,
    #[description = "Duration in seconds (default 60)"] duration: Option<i64>,
    #[description = "Reason for the timeout"] reason: Option<String>,
) -> Result<(), Error> {
    let action = ModerationAction::Timeout {
        seconds: duration.unwrap_or(60),
    };
    moderate(ctx, action, Some(&member), reason).await
}

/// Remove a member's timeout
#[poise::command(slash_command, guild_only, default_member_permissions = "MODERATE_MEMBERS")]
pub async fn unmute(
    ctx: Context<'_>,
    #[description = "The member to unmute"] member: serenity::Member,
    #[description = "Reason for removing the timeout"] reason: Option<String>,
) -> Result<(), Error> {
    moderate(ctx, ModerationAction::RemoveTimeout, Some(&member), reason).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use poise::serenity_prelude::Permissions;

    #[test]
    fn test_kick_definition() {
        let cmd = kick();
        assert_eq!(cmd.name, "kick");
        assert!(cmd.guild_only);
        assert_eq!(cmd.default_member_permissions, Permissions::KICK_MEMBERS);
        assert_eq!(cmd.required_permissions, Permissions::KICK_MEMBERS);
        assert!(cmd.prefix_action.is_some());
    }

    #[test]
    fn test_unban_is_slash_only() {
        let cmd = unban();
        assert!(cmd.prefix_action.is_none());
        assert!(cmd.slash_action.is_some());
        assert_eq!(cmd.default_member_permissions, Permissions::BAN_MEMBERS);
    }

    #[test]
    fn test_mute_duration_is_optional() {
        let cmd = mute();
        let duration = cmd
            .parameters
            .iter()
            .find(|p| p.name == "duration")
            .unwrap();
        assert!(!duration.required);
    }
}
