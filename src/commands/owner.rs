use super::reply;
use crate::status::{StatusMode, format_uptime};
use crate::{COMMAND_TARGET, Context, Error};
use poise::CreateReply;
use poise::serenity_prelude::{Colour, CreateEmbed};
use tracing::{info, warn};

const OWNER_ONLY: &str = "❌ This command is restricted to the bot owner.";

/// Reply with the owner-only message unless the invoker owns the bot
async fn ensure_owner(ctx: Context<'_>) -> Result<bool, Error> {
    if ctx.data().is_owner(ctx.author().id.get()) {
        return Ok(true);
    }
    warn!(
        target: COMMAND_TARGET,
        command = %ctx.command().qualified_name,
        user_id = %ctx.author().id,
        "Non-owner tried an owner command"
    );
    reply(ctx, OWNER_ONLY, true).await?;
    Ok(false)
}

fn on_off(state: bool) -> &'static str {
    if state { "ON" } else { "OFF" }
}

fn toggle_message(label: &str, state: bool, detail_on: &str, detail_off: &str) -> String {
    let detail = if state { detail_on } else { detail_off };
    format!("✅ {label} is now **{}**. {detail}", on_off(state))
}

/// Flip one status flag, republish presence and confirm
async fn toggle(
    ctx: Context<'_>,
    label: &str,
    flip: fn(&StatusMode) -> bool,
    detail_on: &str,
    detail_off: &str,
) -> Result<(), Error> {
    if !ensure_owner(ctx).await? {
        return Ok(());
    }
    let status = &ctx.data().status;
    let state = flip(status);
    info!(target: COMMAND_TARGET, flag = label, state, "Status flag toggled");

    status.snapshot().presence().apply(ctx.serenity_context());
    reply(ctx, toggle_message(label, state, detail_on, detail_off), true).await
}

/// Toggle emergency shutdown
#[poise::command(slash_command, guild_only)]
pub async fn killswitch(ctx: Context<'_>) -> Result<(), Error> {
    toggle(
        ctx,
        "Emergency shutdown",
        StatusMode::toggle_emergency_shutdown,
        "Commands are disabled for everyone but the bot owner.",
        "Commands are available again.",
    )
    .await
}

/// Toggle update mode
#[poise::command(slash_command, guild_only)]
pub async fn updatemode(ctx: Context<'_>) -> Result<(), Error> {
    toggle(
        ctx,
        "Update mode",
        StatusMode::toggle_updating,
        "The status page now shows that an update is in progress.",
        "The status page shows normal operation.",
    )
    .await
}

/// Toggle the owner-asleep notice
#[poise::command(slash_command, guild_only)]
pub async fn ownersleep(ctx: Context<'_>) -> Result<(), Error> {
    toggle(
        ctx,
        "Owner sleep mode",
        StatusMode::toggle_owner_sleeping,
        "The status page now says the owner is asleep.",
        "The status page no longer says the owner is asleep.",
    )
    .await
}

/// Show the current status flags
#[poise::command(slash_command, guild_only)]
pub async fn botstatus(ctx: Context<'_>) -> Result<(), Error> {
    if !ensure_owner(ctx).await? {
        return Ok(());
    }
    let data = ctx.data();
    let snapshot = data.status.snapshot();
    let latency = data
        .metrics
        .latency()
        .map_or_else(|| "unknown".to_string(), |l| format!("{} ms", l.as_millis()));

    let embed = CreateEmbed::new()
        .title("Bot status")
        .colour(Colour::TEAL)
        .field("Emergency shutdown", on_off(snapshot.emergency_shutdown), true)
        .field("Update mode", on_off(snapshot.updating), true)
        .field("Owner sleeping", on_off(snapshot.owner_sleeping), true)
        .field("Uptime", format_uptime(snapshot.uptime), true)
        .field("Servers", data.metrics.guild_count().to_string(), true)
        .field("Latency", latency, true)
        .field(
            "Case tracking",
            if data.store.is_enabled() { "enabled" } else { "disabled" },
            true,
        );
    ctx.send(CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_message() {
        assert_eq!(
            toggle_message("Update mode", true, "Updating.", "Back to normal."),
            "✅ Update mode is now **ON**. Updating."
        );
        assert_eq!(
            toggle_message("Update mode", false, "Updating.", "Back to normal."),
            "✅ Update mode is now **OFF**. Back to normal."
        );
    }

    #[test]
    fn test_owner_commands_have_no_member_permission() {
        for cmd in [killswitch(), updatemode(), ownersleep(), botstatus()] {
            assert!(cmd.default_member_permissions.is_empty(), "{}", cmd.name);
            assert!(cmd.guild_only, "{}", cmd.name);
        }
    }
}
