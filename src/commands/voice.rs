use super::moderate;
use crate::moderation::ModerationAction;
use crate::{Context, Error};
use poise::serenity_prelude as serenity;

/// Server mute a member in voice chat
#[poise::command(slash_command, guild_only, default_member_permissions = "MUTE_MEMBERS")]
pub async fn vmute(
    ctx: Context<'_>,
    #[description = "The member to voice mute"] member: serenity::Member,
    #[description = "Reason for the voice mute"] reason: Option<String>,
) -> Result<(), Error> {
    moderate(ctx, ModerationAction::VoiceMute, Some(&member), reason).await
}

/// Remove a member's server mute
#[poise::command(slash_command, guild_only, default_member_permissions = "MUTE_MEMBERS")]
pub async fn vunmute(
    ctx: Context<'_>,
    #[description = "The member to voice unmute"] member: serenity::Member,
    #[description = "Reason for the voice unmute"] reason: Option<String>,
) -> Result<(), Error> {
    moderate(ctx, ModerationAction::VoiceUnmute, Some(&member), reason).await
}

/// Server deafen a member in voice chat
#[poise::command(slash_command, guild_only, default_member_permissions = "DEAFEN_MEMBERS")]
pub async fn deafen(
    ctx: Context<'_>,
    #[description = "The member to deafen"] member: serenity::Member,
    #[description = "Reason for deafening"] reason: Option<String>,
) -> Result<(), Error> {
    moderate(ctx, ModerationAction::Deafen, Some(&member), reason).await
}

/// Remove a member's server deafen
#[poise::command(slash_command, guild_only, default_member_permissions = "DEAFEN_MEMBERS")]
pub async fn undeafen(
    ctx: Context<'_>,
    #[description = "The member to undeafen"] member: serenity::Member,
    #[description = "Reason for undeafening"] reason: Option<String>,
) -> Result<(), Error> {
    moderate(ctx, ModerationAction::Undeafen, Some(&member), reason).await
}

/// Disconnect a member from voice chat
#[poise::command(slash_command, guild_only, default_member_permissions = "MOVE_MEMBERS")]
pub async fn disconnect(
    ctx: Context<'_>,
    #[description = "The member to disconnect"] member: serenity::Member,
    #[description = "Reason for disconnecting"] reason: Option<String>,
) -> Result<(), Error> {
    moderate(ctx, ModerationAction::Disconnect, Some(&member), reason).await
}
