use super::moderate;
use crate::moderation::ModerationAction;
use crate::{Context, Error};
use poise::serenity_prelude as serenity;

/// The given channel, or the one the command was used in
fn channel_or_current(ctx: Context<'_>, channel: Option<&serenity::GuildChannel>) -> u64 {
    channel.map_or_else(|| ctx.channel_id().get(), |c| c.id.get())
}

/// Stop everyone from sending messages in a channel
#[poise::command(slash_command, guild_only, default_member_permissions = "MANAGE_CHANNELS")]
pub async fn lock(
    ctx: Context<'_>,
    #[description = "Channel to lock (defaults to this one)"]
    #[channel_types("Text")]
    channel: Option<serenity::GuildChannel>,
    #[description = "Reason for locking"] reason: Option<String>,
) -> Result<(), Error> {
    let channel_id = channel_or_current(ctx, channel.as_ref());
    moderate(ctx, ModerationAction::Lock { channel_id }, None, reason).await
}

/// Let everyone send messages in a channel again
#[poise::command(slash_command, guild_only, default_member_permissions = "MANAGE_CHANNELS")]
pub async fn unlock(
    ctx: Context<'_>,
    #[description = "Channel to unlock (defaults to this one)"]
    #[channel_types("Text")]
    channel: Option<serenity::GuildChannel>,
    #[description = "Reason for unlocking"] reason: Option<String>,
) -> Result<(), Error> {
    let channel_id = channel_or_current(ctx, channel.as_ref());
    moderate(ctx, ModerationAction::Unlock { channel_id }, None, reason).await
}

/// Set the slowmode delay of a channel (0 turns it off)
#[poise::command(slash_command, guild_only, default_member_permissions = "MANAGE_CHANNELS")]
pub async fn slowmode(
    ctx: Context<'_>,
    #[description = "Delay between messages in seconds (0-21600)"] seconds: i64,
    #[description = "Channel to change (defaults to this one)"]
    #[channel_types("Text")]
    channel: Option<serenity::GuildChannel>,
) -> Result<(), Error> {
    let channel_id = channel_or_current(ctx, channel.as_ref());
    moderate(
        ctx,
        ModerationAction::Slowmode {
            channel_id,
            seconds,
        },
        None,
        None,
    )
    .await
}

/// Delete recent messages in this channel
#[poise::command(slash_command, guild_only, default_member_permissions = "MANAGE_MESSAGES")]
pub async fn purge(
    ctx: Context<'_>,
    #[description = "Number of messages to delete (1-100)"] msgamount: i64,
) -> Result<(), Error> {
    let action = ModerationAction::Purge {
        channel_id: ctx.channel_id().get(),
        count: msgamount,
    };
    moderate(ctx, action, None, None).await
}
