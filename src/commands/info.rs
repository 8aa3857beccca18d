use super::{reply, target_snapshot, truncate};
use crate::{Context, Error};
use poise::CreateReply;
use poise::serenity_prelude::{self as serenity, Colour, CreateEmbed, Mentionable, Timestamp};
use std::fmt::Display;

/// Cases shown in the user info embed
const RECENT_CASES: i64 = 5;
/// Discord rejects embed field values longer than this
const MAX_FIELD_CHARS: usize = 1024;

fn discord_time(timestamp: Timestamp) -> String {
    format!("<t:{}:f>", timestamp.unix_timestamp())
}

/// Show information about a member
#[poise::command(slash_command, guild_only, default_member_permissions = "MODERATE_MEMBERS")]
pub async fn userinfo(
    ctx: Context<'_>,
    #[description = "The member to get info about (leave empty for yourself)"]
    member: Option<serenity::Member>,
) -> Result<(), Error> {
    let member = match member {
        Some(member) => member,
        None => match ctx.author_member().await {
            Some(member) => member.into_owned(),
            None => {
                return reply(ctx, "❌ That member could not be found!", true).await;
            }
        },
    };

    let snapshot = ctx.guild().map(|guild| target_snapshot(&guild, &member));

    let mut status = Vec::new();
    if let Some(until) = member.communication_disabled_until {
        if snapshot.as_ref().is_some_and(|s| s.timed_out) {
            status.push(format!("⏱️ Timed out until: {}", discord_time(until)));
        }
    }
    if let Some(voice) = snapshot.as_ref().and_then(|s| s.voice) {
        if voice.mute {
            status.push("🔇 Server Muted".to_string());
        }
        if voice.deaf {
            status.push("🔈 Server Deafened".to_string());
        }
    }

    let mut embed = CreateEmbed::new()
        .title(format!("User Info - {}", member.user.tag()))
        .colour(Colour::BLURPLE)
        .thumbnail(member.face())
        .field("Username", member.user.name.clone(), true)
        .field("Nickname", member.nick.clone().unwrap_or_else(|| "None".to_string()), true)
        .field("ID", member.user.id.to_string(), true)
        .field(
            "Joined Server",
            member.joined_at.map_or_else(|| "Unknown".to_string(), discord_time),
            true,
        )
        .field("Account Created", discord_time(member.user.id.created_at()), true);

    if !status.is_empty() {
        embed = embed.field("Current Status", status.join("\n"), false);
    }

    if !member.roles.is_empty() {
        let roles = member
            .roles
            .iter()
            .map(|role| role.mention().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        embed = embed.field("Roles", truncate(&roles, MAX_FIELD_CHARS), false);
    }

    embed = embed.field("📋 Moderation History", moderation_summary(ctx, &member).await, false);

    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

async fn moderation_summary(ctx: Context<'_>, member: &serenity::Member) -> String {
    let store = &ctx.data().store;
    if !store.is_enabled() {
        return "⚠️ Moderation tracking is not enabled on this bot.".to_string();
    }
    let (guild_id, user_id) = (member.guild_id.get(), member.user.id.get());

    let cases = store.list_cases(guild_id, user_id, RECENT_CASES).await;
    let total = store.count_cases(guild_id, user_id).await;
    let warnings = store.count_warnings(guild_id, user_id).await;
    history_summary(&cases, total, warnings)
}

/// Recent cases, a count of older ones and the warning total, capped to one field
fn history_summary<T: Display>(cases: &[T], total: i64, warnings: i64) -> String {
    let mut summary = if cases.is_empty() {
        "No moderation actions found".to_string()
    } else {
        cases
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n\n")
    };
    let shown = i64::try_from(cases.len()).unwrap_or(i64::MAX);
    if total > shown {
        summary.push_str(&format!("\n\n*...and {} more action(s)*", total - shown));
    }
    let footer = format!("\n\nWarnings: {warnings}");

    // Keep the warning count visible however long the reasons are
    let room = MAX_FIELD_CHARS.saturating_sub(footer.chars().count());
    let mut summary = truncate(&summary, room);
    summary.push_str(&footer);
    summary
}

/// Get a member's profile picture
#[poise::command(slash_command, guild_only)]
pub async fn userpicture(
    ctx: Context<'_>,
    #[description = "The member to get picture of"] member: serenity::Member,
) -> Result<(), Error> {
    reply(ctx, member.face(), false).await
}

/// Get a member's profile banner
#[poise::command(slash_command, guild_only)]
pub async fn userbanner(
    ctx: Context<'_>,
    #[description = "The member to get the banner of"] member: serenity::Member,
) -> Result<(), Error> {
    // Banners are only included when the user is fetched directly
    let user = ctx.http().get_user(member.user.id).await?;
    match user.banner_url() {
        Some(banner) => reply(ctx, banner, false).await,
        None => {
            reply(
                ctx,
                format!("{} does not have a banner.", member.mention()),
                false,
            )
            .await
        }
    }
}

/// Check if the bot is responsive
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn ping(ctx: Context<'_>) -> Result<(), Error> {
    let latency = ctx.ping().await;
    if latency.is_zero() {
        ctx.say("Pong!").await?;
    } else {
        ctx.say(format!("Pong! Gateway latency: {} ms", latency.as_millis()))
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_command_definition() {
        let cmd = ping();
        assert_eq!(cmd.name, "ping");
        assert!(
            cmd.description
                .as_deref()
                .unwrap_or_default()
                .contains("Check if the bot is responsive")
        );
        assert!(cmd.guild_only);
        assert!(cmd.create_as_slash_command().is_some());
    }

    #[test]
    fn test_userinfo_member_is_optional() {
        let cmd = userinfo();
        assert_eq!(cmd.parameters.len(), 1);
        assert!(!cmd.parameters[0].required);
    }

    #[test]
    fn test_history_summary_lists_cases_and_warnings() {
        let cases = ["**#2** ban", "**#1** kick"];
        assert_eq!(
            history_summary(&cases, 2, 1),
            "**#2** ban\n\n**#1** kick\n\nWarnings: 1"
        );
        assert_eq!(
            history_summary::<&str>(&[], 0, 0),
            "No moderation actions found\n\nWarnings: 0"
        );
    }

    #[test]
    fn test_history_summary_fits_in_a_field() {
        let long_reason = format!("**#1** mute\nReason: {}", "a".repeat(1500));
        let cases = vec![long_reason; 5];
        let summary = history_summary(&cases, 9, 3);
        assert!(summary.chars().count() <= MAX_FIELD_CHARS);
        assert!(summary.ends_with("\n\nWarnings: 3"));
        assert!(summary.contains('…'));
    }

    #[test]
    fn test_discord_time() {
        let timestamp = Timestamp::from_unix_timestamp(1_700_000_000).unwrap();
        assert_eq!(discord_time(timestamp), "<t:1700000000:f>");
    }
}
