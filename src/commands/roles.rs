use super::{moderate, reply, role_info};
use crate::moderation::{ModerationAction, NewRole};
use crate::{Context, Error};
use poise::serenity_prelude as serenity;

/// Change or reset a member's nickname
#[poise::command(slash_command, guild_only, default_member_permissions = "MANAGE_NICKNAMES")]
pub async fn nickname(
    ctx: Context<'_>,
    #[description = "The member to rename"] member: serenity::Member,
    #[description = "New nickname (leave empty to reset)"] nickname: Option<String>,
) -> Result<(), Error> {
    let nickname = nickname
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    moderate(ctx, ModerationAction::Nickname { nickname }, Some(&member), None).await
}

/// Give a role to a member
#[poise::command(slash_command, guild_only, default_member_permissions = "MANAGE_ROLES")]
pub async fn addrole(
    ctx: Context<'_>,
    #[description = "The member to give the role to"] member: serenity::Member,
    #[description = "The role to give"] role: serenity::Role,
) -> Result<(), Error> {
    let action = ModerationAction::AddRole {
        role: role_info(&role),
    };
    moderate(ctx, action, Some(&member), None).await
}

/// Take a role away from a member
#[poise::command(slash_command, guild_only, default_member_permissions = "MANAGE_ROLES")]
pub async fn removerole(
    ctx: Context<'_>,
    #[description = "The member to take the role from"] member: serenity::Member,
    #[description = "The role to remove"] role: serenity::Role,
) -> Result<(), Error> {
    let action = ModerationAction::RemoveRole {
        role: role_info(&role),
    };
    moderate(ctx, action, Some(&member), None).await
}

/// Create a new role
#[poise::command(slash_command, guild_only, default_member_permissions = "MANAGE_ROLES")]
pub async fn createrole(
    ctx: Context<'_>,
    #[description = "Name of the role"] name: String,
    #[description = "Colour as hex, e.g. #ff8800"] color: Option<String>,
    #[description = "Show members separately in the member list"] hoist: Option<bool>,
    #[description = "Allow anyone to mention the role"] mentionable: Option<bool>,
) -> Result<(), Error> {
    let colour = match color.as_deref().map(parse_colour) {
        None => None,
        Some(Some(colour)) => Some(colour),
        Some(None) => {
            return reply(ctx, "❌ Invalid color! Use a hex value like #ff8800.", true).await;
        }
    };
    let action = ModerationAction::CreateRole {
        role: NewRole {
            name: name.trim().to_string(),
            colour,
            hoist: hoist.unwrap_or(false),
            mentionable: mentionable.unwrap_or(false),
        },
    };
    moderate(ctx, action, None, None).await
}

/// Delete a role
#[poise::command(slash_command, guild_only, default_member_permissions = "MANAGE_ROLES")]
pub async fn deleterole(
    ctx: Context<'_>,
    #[description = "The role to delete"] role: serenity::Role,
) -> Result<(), Error> {
    let action = ModerationAction::DeleteRole {
        role: role_info(&role),
    };
    moderate(ctx, action, None, None).await
}

/// Parse `#rrggbb`, `rrggbb` or `0xrrggbb` into an RGB value
fn parse_colour(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    let hex = raw
        .strip_prefix('#')
        .or_else(|| raw.strip_prefix("0x"))
        .unwrap_or(raw);
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}
