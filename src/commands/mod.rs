//! Slash and prefix commands
//!
//! Moderation commands snapshot the guild state they need and hand a
//! `ModerationRequest` to the gate. Record, info and owner commands talk to the
//! case store or the status register directly.

mod channels;
mod info;
mod moderation;
mod owner;
mod records;
mod roles;
mod voice;

use crate::moderation::{
    Actor, ModerationAction, ModerationError, ModerationRequest, ModerationResult, Responder,
    RoleInfo, SerenityPlatform, TargetMember, VoiceStatus,
};
use crate::{COMMAND_TARGET, Context, Data, ERROR_TARGET, Error};
use chrono::Utc;
use poise::CreateReply;
use poise::serenity_prelude::{self as serenity, Guild, GuildId, Member, UserId};
use tracing::{error, warn};

/// Most entries a listing command shows
pub const MAX_LISTED: i64 = 10;

/// Every command the bot registers
#[must_use]
pub fn all() -> Vec<poise::Command<Data, Error>> {
    vec![
        moderation::kick(),
        moderation::ban(),
        moderation::unban(),
        moderation::mute(),
        moderation::unmute(),
        voice::vmute(),
        voice::vunmute(),
        voice::deafen(),
        voice::undeafen(),
        voice::disconnect(),
        roles::nickname(),
        roles::addrole(),
        roles::removerole(),
        roles::createrole(),
        roles::deleterole(),
        channels::lock(),
        channels::unlock(),
        channels::slowmode(),
        channels::purge(),
        records::warn(),
        records::warnings(),
        records::clearwarnings(),
        records::case(),
        records::reason(),
        records::history(),
        records::note(),
        records::notes(),
        info::userinfo(),
        info::userpicture(),
        info::userbanner(),
        info::ping(),
        owner::killswitch(),
        owner::updatemode(),
        owner::ownersleep(),
        owner::botstatus(),
    ]
}

/// Answers the moderator through the invoking poise context
pub struct PoiseResponder<'a>(pub Context<'a>);

#[async_trait::async_trait]
impl<'a> Responder for PoiseResponder<'a> {
    async fn defer(&self, ephemeral: bool) -> ModerationResult<()> {
        if ephemeral {
            self.0.defer_ephemeral().await?;
        } else {
            self.0.defer().await?;
        }
        Ok(())
    }

    async fn reply(&self, content: String, ephemeral: bool) -> ModerationResult<()> {
        self.0
            .send(CreateReply::default().content(content).ephemeral(ephemeral))
            .await?;
        Ok(())
    }
}

/// Guild snapshots of the invoker, the bot and the target
struct Scene {
    guild_id: GuildId,
    actor: Actor,
    bot: Actor,
    target: Option<TargetMember>,
}

impl Scene {
    /// Snapshot everything from the interaction and the guild cache, so the
    /// gate can acknowledge without waiting on HTTP
    fn resolve(ctx: Context<'_>, target: Option<&Member>) -> ModerationResult<Self> {
        let bot_id = ctx.cache().current_user().id;
        let interaction_member = match ctx {
            poise::Context::Application(app) => app.interaction.member.as_deref().cloned(),
            poise::Context::Prefix(_) => None,
        };
        let guild = ctx
            .guild()
            .ok_or_else(|| ModerationError::precondition("This server is not cached yet, try again shortly!"))?;
        Self::from_guild(&guild, interaction_member.as_ref(), ctx.author().id, bot_id, target)
    }

    fn from_guild(
        guild: &Guild,
        author: Option<&Member>,
        author_id: UserId,
        bot_id: UserId,
        target: Option<&Member>,
    ) -> ModerationResult<Self> {
        let author = author
            .or_else(|| guild.members.get(&author_id))
            .ok_or_else(|| ModerationError::precondition("Could not load your member profile!"))?;
        let bot = guild
            .members
            .get(&bot_id)
            .ok_or_else(|| ModerationError::precondition("This server is not cached yet, try again shortly!"))?;

        Ok(Self {
            guild_id: guild.id,
            actor: actor_snapshot(guild, author),
            bot: actor_snapshot(guild, bot),
            target: target.map(|member| target_snapshot(guild, member)),
        })
    }
}

fn rank(guild: &Guild, member: &Member) -> u16 {
    guild.member_highest_role(member).map_or(0, |role| role.position)
}

pub(crate) fn actor_snapshot(guild: &Guild, member: &Member) -> Actor {
    // Guild-level permissions; channel overwrites do not apply to member actions
    #[allow(deprecated)]
    let permissions = guild.member_permissions(member);
    Actor {
        id: member.user.id.get(),
        display_name: member.display_name().to_string(),
        permissions,
        top_role_position: rank(guild, member),
        is_guild_owner: guild.owner_id == member.user.id,
    }
}

/// Snapshot `member`, preferring the cached copy for current roles
pub(crate) fn target_snapshot(guild: &Guild, member: &Member) -> TargetMember {
    let member = guild.members.get(&member.user.id).unwrap_or(member);
    let voice = guild.voice_states.get(&member.user.id).and_then(|state| {
        state.channel_id.map(|channel_id| VoiceStatus {
            channel_id: channel_id.get(),
            mute: state.mute,
            deaf: state.deaf,
        })
    });

    TargetMember {
        id: member.user.id.get(),
        display_name: member.display_name().to_string(),
        top_role_position: rank(guild, member),
        voice,
        timed_out: member
            .communication_disabled_until
            .is_some_and(|until| until.unix_timestamp() > Utc::now().timestamp()),
        role_ids: member.roles.iter().map(|role| role.get()).collect(),
    }
}

pub(crate) fn role_info(role: &serenity::Role) -> RoleInfo {
    RoleInfo {
        id: role.id.get(),
        name: role.name.clone(),
        position: role.position,
    }
}

/// Run `action` through the moderation gate
pub(crate) async fn moderate(
    ctx: Context<'_>,
    action: ModerationAction,
    target: Option<&Member>,
    reason: Option<String>,
) -> Result<(), Error> {
    let scene = match Scene::resolve(ctx, target) {
        Ok(scene) => scene,
        Err(e) => return report_error(ctx, &e).await,
    };

    let platform = SerenityPlatform::new(ctx.serenity_context().http.clone(), scene.guild_id);
    let request = ModerationRequest {
        guild_id: scene.guild_id.get(),
        actor: scene.actor,
        bot: scene.bot,
        action,
        target: scene.target,
        reason,
    };

    ctx.data()
        .gate(&platform)
        .run(&PoiseResponder(ctx), request)
        .await;
    Ok(())
}

/// Log `error` and show its user message to the invoker only
pub(crate) async fn report_error(ctx: Context<'_>, error: &ModerationError) -> Result<(), Error> {
    match error {
        ModerationError::PlatformUnavailable(_) | ModerationError::Unexpected { .. } => {
            error!(
                target: ERROR_TARGET,
                command = %ctx.command().qualified_name,
                error = %error,
                "Command failed"
            );
        }
        _ => {
            warn!(
                target: COMMAND_TARGET,
                command = %ctx.command().qualified_name,
                error = %error,
                "Command refused"
            );
        }
    }
    reply(ctx, error.user_message(), true).await
}

pub(crate) async fn reply(
    ctx: Context<'_>,
    content: impl Into<String>,
    ephemeral: bool,
) -> Result<(), Error> {
    ctx.send(CreateReply::default().content(content).ephemeral(ephemeral))
        .await?;
    Ok(())
}

/// Cut `text` to at most `max_chars` characters, ending in an ellipsis when cut
pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

/// Display name of the invoker as recorded in the store
pub(crate) fn invoker_name(ctx: Context<'_>) -> String {
    ctx.author().display_name().to_string()
}

/// Parse a user id typed as text
pub(crate) fn parse_user_id(raw: &str) -> Option<UserId> {
    raw.trim()
        .trim_start_matches("<@")
        .trim_start_matches('!')
        .trim_end_matches('>')
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .map(UserId::new)
}
