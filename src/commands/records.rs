use super::{MAX_LISTED, invoker_name, moderate, reply, truncate};
use crate::moderation::{ModerationAction, ModerationCase, ModerationError, NewEntry};
use crate::{Context, Error};
use poise::CreateReply;
use poise::serenity_prelude::{
    self as serenity, Colour, CreateEmbed, CreateEmbedFooter, GuildId, Mentionable,
};
use std::fmt::Display;

/// Embed descriptions are capped by Discord at 4096 characters
const MAX_DESCRIPTION_CHARS: usize = 4000;

/// Reply with the tracking-disabled message when the store is off
async fn tracking_enabled(ctx: Context<'_>) -> Result<bool, Error> {
    if ctx.data().store.is_enabled() {
        return Ok(true);
    }
    reply(ctx, ModerationError::DatabaseUnavailable.user_message(), true).await?;
    Ok(false)
}

fn guild_of(ctx: Context<'_>) -> Result<GuildId, Error> {
    ctx.guild_id()
        .ok_or_else(|| "guild-only command invoked outside a guild".into())
}

/// Join entries for an embed description, newest first as given
fn listing_body<T: Display>(entries: &[T], empty: &str) -> String {
    if entries.is_empty() {
        return empty.to_string();
    }
    let body = entries
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n\n");
    truncate(&body, MAX_DESCRIPTION_CHARS)
}

/// "Showing 10 of 14" footer when the list was cut short
fn listing_footer(shown: usize, total: i64) -> Option<CreateEmbedFooter> {
    let shown = i64::try_from(shown).unwrap_or(i64::MAX);
    (total > shown).then(|| CreateEmbedFooter::new(format!("Showing {shown} of {total}")))
}

async fn send_embed(ctx: Context<'_>, embed: CreateEmbed, ephemeral: bool) -> Result<(), Error> {
    ctx.send(CreateReply::default().embed(embed).ephemeral(ephemeral))
        .await?;
    Ok(())
}

fn case_embed(case: &ModerationCase) -> CreateEmbed {
    let user = case
        .user_name
        .as_deref()
        .map_or_else(|| format!("<@{}>", case.user_id), |name| format!("{name} (<@{}>)", case.user_id));
    let moderator = case.moderator_name.as_deref().map_or_else(
        || format!("<@{}>", case.moderator_id),
        |name| format!("{name} (<@{}>)", case.moderator_id),
    );

    let mut embed = CreateEmbed::new()
        .title(format!("Case #{}", case.id))
        .colour(Colour::ORANGE)
        .field("Action", case.action_label(), true)
        .field("User", user, true)
        .field("Moderator", moderator, true)
        .field(
            "Reason",
            case.reason.as_deref().unwrap_or("No reason provided"),
            false,
        )
        .field("Created", format!("<t:{}:f>", case.created_at.timestamp()), true);
    if case.updated_at != case.created_at {
        embed = embed.field("Updated", format!("<t:{}:f>", case.updated_at.timestamp()), true);
    }
    embed
}

/// Issue a warning to a member
#[poise::command(slash_command, guild_only, default_member_permissions = "MODERATE_MEMBERS")]
pub async fn warn(
    ctx: Context<'_>,
    #[description = "The member to warn"] member: serenity::Member,
    #[description = "Reason for the warning"] reason: String,
) -> Result<(), Error> {
    moderate(ctx, ModerationAction::Warn, Some(&member), Some(reason)).await
}

/// List a member's warnings
#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "MODERATE_MEMBERS",
    required_permissions = "MODERATE_MEMBERS"
)]
pub async fn warnings(
    ctx: Context<'_>,
    #[description = "The member to look up"] member: serenity::Member,
) -> Result<(), Error> {
    if !tracking_enabled(ctx).await? {
        return Ok(());
    }
    let guild_id = guild_of(ctx)?.get();
    let user_id = member.user.id.get();
    let store = &ctx.data().store;

    let warnings = store.list_warnings(guild_id, user_id, MAX_LISTED).await;
    let total = store.count_warnings(guild_id, user_id).await;

    let mut embed = CreateEmbed::new()
        .title(format!("Warnings for {}", member.display_name()))
        .colour(Colour::GOLD)
        .description(listing_body(&warnings, "This member has no warnings."));
    if let Some(footer) = listing_footer(warnings.len(), total) {
        embed = embed.footer(footer);
    }
    send_embed(ctx, embed, false).await
}

/// Remove every warning of a member
#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "MODERATE_MEMBERS",
    required_permissions = "MODERATE_MEMBERS"
)]
pub async fn clearwarnings(
    ctx: Context<'_>,
    #[description = "The member whose warnings to clear"] member: serenity::Member,
) -> Result<(), Error> {
    if !tracking_enabled(ctx).await? {
        return Ok(());
    }
    let guild_id = guild_of(ctx)?.get();
    let cleared = ctx
        .data()
        .store
        .clear_warnings(guild_id, member.user.id.get())
        .await;
    reply(
        ctx,
        format!("✅ Cleared {cleared} warning(s) for {}.", member.mention()),
        false,
    )
    .await
}

/// Show a single moderation case
#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "MODERATE_MEMBERS",
    required_permissions = "MODERATE_MEMBERS"
)]
pub async fn case(
    ctx: Context<'_>,
    #[description = "The case number"] case_id: i64,
) -> Result<(), Error> {
    if !tracking_enabled(ctx).await? {
        return Ok(());
    }
    let guild_id = guild_of(ctx)?.get();
    match ctx.data().store.get_case(case_id, guild_id).await {
        Some(case) => send_embed(ctx, case_embed(&case), false).await,
        None => reply(ctx, format!("❌ Case #{case_id} not found!"), true).await,
    }
}

/// Change the reason of a moderation case
#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "MODERATE_MEMBERS",
    required_permissions = "MODERATE_MEMBERS"
)]
pub async fn reason(
    ctx: Context<'_>,
    #[description = "The case number"] case_id: i64,
    #[description = "The new reason"] reason: String,
) -> Result<(), Error> {
    if !tracking_enabled(ctx).await? {
        return Ok(());
    }
    let reason = reason.trim();
    if reason.is_empty() {
        return reply(ctx, "❌ Please provide a reason!", true).await;
    }
    let guild_id = guild_of(ctx)?.get();
    if ctx
        .data()
        .store
        .update_case_reason(case_id, guild_id, reason)
        .await
    {
        reply(ctx, format!("✅ Updated the reason for Case #{case_id}."), false).await
    } else {
        reply(ctx, format!("❌ Case #{case_id} not found!"), true).await
    }
}

/// List a member's moderation cases
#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "MODERATE_MEMBERS",
    required_permissions = "MODERATE_MEMBERS"
)]
pub async fn history(
    ctx: Context<'_>,
    #[description = "The member to look up"] member: serenity::Member,
) -> Result<(), Error> {
    if !tracking_enabled(ctx).await? {
        return Ok(());
    }
    let guild_id = guild_of(ctx)?.get();
    let user_id = member.user.id.get();
    let store = &ctx.data().store;

    let cases = store.list_cases(guild_id, user_id, MAX_LISTED).await;
    let total = store.count_cases(guild_id, user_id).await;

    let mut embed = CreateEmbed::new()
        .title(format!("Moderation history for {}", member.display_name()))
        .colour(Colour::ORANGE)
        .description(listing_body(&cases, "No moderation actions found."));
    if let Some(footer) = listing_footer(cases.len(), total) {
        embed = embed.footer(footer);
    }
    send_embed(ctx, embed, false).await
}

/// Add a private moderator note to a member
#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "MODERATE_MEMBERS",
    required_permissions = "MODERATE_MEMBERS"
)]
pub async fn note(
    ctx: Context<'_>,
    #[description = "The member the note is about"] member: serenity::Member,
    #[description = "The note"] text: String,
) -> Result<(), Error> {
    if !tracking_enabled(ctx).await? {
        return Ok(());
    }
    let text = text.trim();
    if text.is_empty() {
        return reply(ctx, "❌ Notes cannot be empty!", true).await;
    }
    let moderator_name = invoker_name(ctx);
    let entry = NewEntry {
        guild_id: guild_of(ctx)?.get(),
        user_id: member.user.id.get(),
        moderator_id: ctx.author().id.get(),
        user_name: member.display_name(),
        moderator_name: &moderator_name,
    };

    match ctx.data().store.create_note(entry, text).await {
        Some(id) => {
            reply(
                ctx,
                format!("✅ Note #{id} added for {}.", member.mention()),
                true,
            )
            .await
        }
        None => reply(ctx, ModerationError::unexpected("note was not stored").user_message(), true).await,
    }
}

/// List the moderator notes about a member
#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "MODERATE_MEMBERS",
    required_permissions = "MODERATE_MEMBERS"
)]
pub async fn notes(
    ctx: Context<'_>,
    #[description = "The member to look up"] member: serenity::Member,
) -> Result<(), Error> {
    if !tracking_enabled(ctx).await? {
        return Ok(());
    }
    let guild_id = guild_of(ctx)?.get();
    let notes = ctx
        .data()
        .store
        .list_notes(guild_id, member.user.id.get(), MAX_LISTED)
        .await;

    let embed = CreateEmbed::new()
        .title(format!("Notes for {}", member.display_name()))
        .colour(Colour::BLUE)
        .description(listing_body(&notes, "There are no notes about this member."));
    send_embed(ctx, embed, true).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_body_empty() {
        let entries: Vec<String> = Vec::new();
        assert_eq!(listing_body(&entries, "Nothing here."), "Nothing here.");
    }

    #[test]
    fn test_listing_body_keeps_order() {
        let entries = vec!["**#3** newest", "**#2** older", "**#1** oldest"];
        let body = listing_body(&entries, "Nothing here.");
        assert_eq!(body, "**#3** newest\n\n**#2** older\n\n**#1** oldest");
    }

    #[test]
    fn test_listing_body_is_capped() {
        let entries = vec!["x".repeat(3000), "y".repeat(3000)];
        let body = listing_body(&entries, "");
        assert_eq!(body.chars().count(), MAX_DESCRIPTION_CHARS);
        assert!(body.ends_with('…'));
    }

    #[test]
    fn test_listing_footer() {
        assert!(listing_footer(3, 3).is_none());
        assert!(listing_footer(10, 14).is_some());
    }

    #[test]
    fn test_record_commands_require_moderation() {
        for cmd in [warnings(), clearwarnings(), case(), reason(), history(), note(), notes()] {
            assert!(cmd.guild_only, "{}", cmd.name);
            assert_eq!(
                cmd.required_permissions,
                serenity::Permissions::MODERATE_MEMBERS,
                "{}",
                cmd.name
            );
        }
    }
}
