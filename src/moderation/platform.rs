//! Platform adapter
//!
//! Every guild mutation the moderation pipeline can perform goes through
//! `ModerationPlatform`, so the pipeline can be tested against a mock.

use crate::COMMAND_TARGET;
use crate::moderation::{ModerationError, ModerationResult, NewRole};
use ::serenity::http::HttpError;
use chrono::{DateTime, Duration, Utc};
use poise::serenity_prelude::{
    self as serenity, ChannelId, EditChannel, EditMember, EditRole, GetMessages, GuildId, Http, MessageId,
    PermissionOverwrite, PermissionOverwriteType, Permissions, RoleId, TargetId, Timestamp, UserId,
};
use std::sync::Arc;
use tracing::info;

/// Guild mutations used by moderation commands
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ModerationPlatform: Send + Sync {
    async fn kick(&self, user_id: u64, reason: &str) -> ModerationResult<()>;

    async fn ban(&self, user_id: u64, delete_message_days: u8, reason: &str)
    -> ModerationResult<()>;

    async fn unban(&self, user_id: u64, reason: &str) -> ModerationResult<()>;

    /// Time the member out until `until`
    async fn timeout(&self, user_id: u64, until: DateTime<Utc>, reason: &str)
    -> ModerationResult<()>;

    async fn remove_timeout(&self, user_id: u64, reason: &str) -> ModerationResult<()>;

    async fn set_voice_mute(&self, user_id: u64, mute: bool, reason: &str)
    -> ModerationResult<()>;

    async fn set_voice_deafen(&self, user_id: u64, deafen: bool, reason: &str)
    -> ModerationResult<()>;

    async fn disconnect(&self, user_id: u64, reason: &str) -> ModerationResult<()>;

    /// `None` resets the nickname
    async fn set_nickname(
        &self,
        user_id: u64,
        nickname: Option<String>,
        reason: &str,
    ) -> ModerationResult<()>;

    async fn add_role(&self, user_id: u64, role_id: u64, reason: &str) -> ModerationResult<()>;

    async fn remove_role(&self, user_id: u64, role_id: u64, reason: &str)
    -> ModerationResult<()>;

    /// Create a role and return its id
    async fn create_role(&self, role: &NewRole, reason: &str) -> ModerationResult<u64>;

    async fn delete_role(&self, role_id: u64, reason: &str) -> ModerationResult<()>;

    /// Deny or restore `SEND_MESSAGES` for `@everyone` in a channel
    async fn set_channel_locked(
        &self,
        channel_id: u64,
        locked: bool,
        reason: &str,
    ) -> ModerationResult<()>;

    async fn set_slowmode(&self, channel_id: u64, seconds: u16, reason: &str)
    -> ModerationResult<()>;

    /// Delete up to `count` recent messages, returning how many were removed
    async fn purge(&self, channel_id: u64, count: u8) -> ModerationResult<usize>;
}

/// Bulk deletion only accepts messages younger than this
const BULK_DELETE_MAX_AGE_DAYS: i64 = 14;

/// `ModerationPlatform` over the Discord HTTP API, bound to one guild
pub struct SerenityPlatform {
    http: Arc<Http>,
    guild_id: GuildId,
}

impl SerenityPlatform {
    #[must_use]
    pub fn new(http: Arc<Http>, guild_id: GuildId) -> Self {
        Self { http, guild_id }
    }

    async fn edit_member(&self, user_id: u64, builder: EditMember<'_>) -> ModerationResult<()> {
        self.guild_id
            .edit_member(&*self.http, UserId::new(user_id), builder)
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ModerationPlatform for SerenityPlatform {
    async fn kick(&self, user_id: u64, reason: &str) -> ModerationResult<()> {
        info!(target: COMMAND_TARGET, user_id, guild_id = %self.guild_id, "Kicking user");
        self.guild_id
            .kick_with_reason(&*self.http, UserId::new(user_id), reason)
            .await?;
        Ok(())
    }

    async fn ban(
        &self,
        user_id: u64,
        delete_message_days: u8,
        reason: &str,
    ) -> ModerationResult<()> {
        info!(target: COMMAND_TARGET, user_id, guild_id = %self.guild_id, "Banning user");
        self.guild_id
            .ban_with_reason(&*self.http, UserId::new(user_id), delete_message_days, reason)
            .await?;
        Ok(())
    }

    async fn unban(&self, user_id: u64, reason: &str) -> ModerationResult<()> {
        info!(target: COMMAND_TARGET, user_id, guild_id = %self.guild_id, "Unbanning user");
        match self
            .http
            .remove_ban(self.guild_id, UserId::new(user_id), Some(reason))
            .await
        {
            Ok(()) => Ok(()),
            Err(serenity::Error::Http(HttpError::UnsuccessfulRequest(response)))
                if response.status_code.as_u16() == 404 =>
            {
                Err(ModerationError::PlatformRejected(
                    "User not found or not banned".to_string(),
                ))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn timeout(
        &self,
        user_id: u64,
        until: DateTime<Utc>,
        reason: &str,
    ) -> ModerationResult<()> {
        info!(target: COMMAND_TARGET, user_id, %until, "Timing out user");
        let builder = EditMember::new()
            .disable_communication_until_datetime(Timestamp::from(until))
            .audit_log_reason(reason);
        self.edit_member(user_id, builder).await
    }

    async fn remove_timeout(&self, user_id: u64, reason: &str) -> ModerationResult<()> {
        let builder = EditMember::new().enable_communication().audit_log_reason(reason);
        self.edit_member(user_id, builder).await
    }

    async fn set_voice_mute(&self, user_id: u64, mute: bool, reason: &str) -> ModerationResult<()> {
        let builder = EditMember::new().mute(mute).audit_log_reason(reason);
        self.edit_member(user_id, builder).await
    }

    async fn set_voice_deafen(
        &self,
        user_id: u64,
        deafen: bool,
        reason: &str,
    ) -> ModerationResult<()> {
        let builder = EditMember::new().deafen(deafen).audit_log_reason(reason);
        self.edit_member(user_id, builder).await
    }

    async fn disconnect(&self, user_id: u64, reason: &str) -> ModerationResult<()> {
        let builder = EditMember::new().disconnect_member().audit_log_reason(reason);
        self.edit_member(user_id, builder).await
    }

    async fn set_nickname(
        &self,
        user_id: u64,
        nickname: Option<String>,
        reason: &str,
    ) -> ModerationResult<()> {
        // An empty nickname clears it
        let builder = EditMember::new()
            .nickname(nickname.unwrap_or_default())
            .audit_log_reason(reason);
        self.edit_member(user_id, builder).await
    }

    async fn add_role(&self, user_id: u64, role_id: u64, reason: &str) -> ModerationResult<()> {
        self.http
            .add_member_role(self.guild_id, UserId::new(user_id), RoleId::new(role_id), Some(reason))
            .await?;
        Ok(())
    }

    async fn remove_role(&self, user_id: u64, role_id: u64, reason: &str) -> ModerationResult<()> {
        self.http
            .remove_member_role(
                self.guild_id,
                UserId::new(user_id),
                RoleId::new(role_id),
                Some(reason),
            )
            .await?;
        Ok(())
    }

    async fn create_role(&self, role: &NewRole, reason: &str) -> ModerationResult<u64> {
        let mut builder = EditRole::new()
            .name(role.name.as_str())
            .hoist(role.hoist)
            .mentionable(role.mentionable)
            .audit_log_reason(reason);
        if let Some(colour) = role.colour {
            builder = builder.colour(colour);
        }
        let created = self.guild_id.create_role(&*self.http, builder).await?;
        Ok(created.id.get())
    }

    async fn delete_role(&self, role_id: u64, reason: &str) -> ModerationResult<()> {
        self.http
            .delete_role(self.guild_id, RoleId::new(role_id), Some(reason))
            .await?;
        Ok(())
    }

    async fn set_channel_locked(
        &self,
        channel_id: u64,
        locked: bool,
        reason: &str,
    ) -> ModerationResult<()> {
        let channel_id = ChannelId::new(channel_id);
        let everyone_role = self.guild_id.everyone_role();
        let everyone = PermissionOverwriteType::Role(everyone_role);

        // Keep whatever else the @everyone overwrite already says
        let existing = channel_id
            .to_channel(&*self.http)
            .await?
            .guild()
            .and_then(|channel| {
                channel
                    .permission_overwrites
                    .into_iter()
                    .find(|overwrite| overwrite.kind == everyone)
            });
        let (mut allow, mut deny) = existing.map_or_else(
            || (Permissions::empty(), Permissions::empty()),
            |overwrite| (overwrite.allow, overwrite.deny),
        );

        if locked {
            allow.remove(Permissions::SEND_MESSAGES);
            deny.insert(Permissions::SEND_MESSAGES);
        } else {
            deny.remove(Permissions::SEND_MESSAGES);
        }

        let overwrite = PermissionOverwrite {
            allow,
            deny,
            kind: everyone,
        };
        // The channel helper sends no audit reason, so go through Http directly
        self.http
            .create_permission(
                channel_id,
                TargetId::new(everyone_role.get()),
                &overwrite,
                Some(reason),
            )
            .await?;
        info!(target: COMMAND_TARGET, %channel_id, locked, "Channel lock changed");
        Ok(())
    }

    async fn set_slowmode(&self, channel_id: u64, seconds: u16, reason: &str) -> ModerationResult<()> {
        ChannelId::new(channel_id)
            .edit(
                &*self.http,
                EditChannel::new()
                    .rate_limit_per_user(seconds)
                    .audit_log_reason(reason),
            )
            .await?;
        Ok(())
    }

    async fn purge(&self, channel_id: u64, count: u8) -> ModerationResult<usize> {
        let channel_id = ChannelId::new(channel_id);
        let messages = channel_id
            .messages(&*self.http, GetMessages::new().limit(count))
            .await?;

        let cutoff = (Utc::now() - Duration::days(BULK_DELETE_MAX_AGE_DAYS)).timestamp();
        let ids: Vec<MessageId> = messages
            .iter()
            .filter(|message| message.timestamp.unix_timestamp() > cutoff)
            .map(|message| message.id)
            .collect();

        if ids.is_empty() {
            return Ok(0);
        }

        // Falls back to a single delete when only one id is given
        channel_id.delete_messages(&*self.http, &ids).await?;
        info!(target: COMMAND_TARGET, %channel_id, deleted = ids.len(), "Purged messages");
        Ok(ids.len())
    }
}
