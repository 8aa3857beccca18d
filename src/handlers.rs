use crate::EVENT_TARGET;
use crate::status::{LiveMetrics, StatusMode};
use poise::serenity_prelude::{
    self as serenity, Context, EventHandler, Guild, GuildId, Ready, UnavailableGuild,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Gateway event handler keeping the status register and live metrics current
pub struct Handler {
    status: Arc<StatusMode>,
    metrics: Arc<LiveMetrics>,
}

impl Handler {
    #[must_use]
    pub const fn new(status: Arc<StatusMode>, metrics: Arc<LiveMetrics>) -> Self {
        Self { status, metrics }
    }

    fn record_ready(&self, bot_name: &str, guild_count: usize) {
        self.status.mark_connected();
        self.metrics.set_bot_name(bot_name);
        self.metrics.set_guild_count(guild_count);
    }

    fn refresh_guild_count(&self, ctx: &Context) {
        self.metrics.set_guild_count(ctx.cache.guild_count());
    }
}

#[serenity::async_trait]
impl EventHandler for Handler {
    /// Called when the bot is ready, but the cache may not be fully populated yet.
    async fn ready(&self, ctx: Context, ready: Ready) {
        let user_name = ready.user.name.clone();
        let shard_id = ctx.shard_id;
        info!(target: EVENT_TARGET, "Connected as {user_name}, shard {shard_id}");

        self.record_ready(&user_name, ready.guilds.len());
        self.status.snapshot().presence().apply(&ctx);
    }

    /// Called when the cache is fully populated.
    async fn cache_ready(&self, ctx: Context, guilds: Vec<GuildId>) {
        let guild_count_cache = ctx.cache.guild_count();
        let guild_count = guilds.len();
        if guild_count != guild_count_cache {
            warn!(
                target: EVENT_TARGET,
                "Cache guild count mismatch: {guild_count_cache} (cache) vs {guild_count} (actual)"
            );
        }
        self.refresh_guild_count(&ctx);
        info!(target: EVENT_TARGET, "Cache ready! The bot is in {guild_count} guild(s)");
    }

    async fn guild_create(&self, ctx: Context, guild: Guild, is_new: Option<bool>) {
        if is_new == Some(true) {
            info!(target: EVENT_TARGET, guild_id = %guild.id, name = %guild.name, "Joined guild");
        }
        self.refresh_guild_count(&ctx);
    }

    async fn guild_delete(&self, ctx: Context, incomplete: UnavailableGuild, _full: Option<Guild>) {
        if !incomplete.unavailable {
            info!(target: EVENT_TARGET, guild_id = %incomplete.id, "Left guild");
        }
        self.refresh_guild_count(&ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_handler_implements_event_handler() {
        fn assert_impl<T: EventHandler>() {}
        assert_impl::<Handler>();
    }

    #[test]
    fn test_ready_updates_register_and_metrics() {
        let status = Arc::new(StatusMode::new());
        let metrics = Arc::new(LiveMetrics::new());
        let handler = Handler::new(Arc::clone(&status), Arc::clone(&metrics));

        std::thread::sleep(Duration::from_millis(1100));
        assert!(status.uptime() >= Duration::from_secs(1));

        handler.record_ready("Warden", 4);
        assert!(status.uptime() < Duration::from_secs(1));
        assert_eq!(metrics.bot_name(), "Warden");
        assert_eq!(metrics.guild_count(), 4);
    }

    #[test]
    fn test_ready_keeps_owner_flags() {
        let status = Arc::new(StatusMode::new());
        status.toggle_emergency_shutdown();
        let handler = Handler::new(Arc::clone(&status), Arc::new(LiveMetrics::new()));

        handler.record_ready("Warden", 1);
        assert!(status.is_emergency_shutdown());
    }
}
