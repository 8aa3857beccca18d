//! Bot status tracking
//!
//! `StatusMode` holds the owner-controlled flags (kill switch, update mode,
//! owner asleep) plus the connection start time. `LiveMetrics` holds what the
//! gateway reports. Both are shared by the command layer and the web surface.

use crate::EVENT_TARGET;
use chrono::Utc;
use poise::serenity_prelude::{self as serenity, ActivityData, OnlineStatus, ShardManager};
use std::sync::Arc;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// How often gateway latency is sampled
pub const LATENCY_SAMPLE_INTERVAL: Duration = Duration::from_secs(30);

/// Owner-controlled status flags and uptime origin
#[derive(Debug)]
pub struct StatusMode {
    /// Milliseconds since the epoch at the last connection
    started_at_ms: AtomicI64,
    updating: AtomicBool,
    emergency_shutdown: AtomicBool,
    owner_sleeping: AtomicBool,
}

impl Default for StatusMode {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusMode {
    #[must_use]
    pub fn new() -> Self {
        Self {
            started_at_ms: AtomicI64::new(Utc::now().timestamp_millis()),
            updating: AtomicBool::new(false),
            emergency_shutdown: AtomicBool::new(false),
            owner_sleeping: AtomicBool::new(false),
        }
    }

    /// Reset the uptime origin; called on every gateway ready
    pub fn mark_connected(&self) {
        self.started_at_ms
            .store(Utc::now().timestamp_millis(), Ordering::SeqCst);
    }

    /// Flip update mode and return the new value
    pub fn toggle_updating(&self) -> bool {
        !self.updating.fetch_xor(true, Ordering::SeqCst)
    }

    /// Flip the kill switch and return the new value
    pub fn toggle_emergency_shutdown(&self) -> bool {
        !self.emergency_shutdown.fetch_xor(true, Ordering::SeqCst)
    }

    /// Flip the owner-asleep notice and return the new value
    pub fn toggle_owner_sleeping(&self) -> bool {
        !self.owner_sleeping.fetch_xor(true, Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_emergency_shutdown(&self) -> bool {
        self.emergency_shutdown.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn uptime(&self) -> Duration {
        let elapsed = Utc::now().timestamp_millis() - self.started_at_ms.load(Ordering::SeqCst);
        Duration::from_millis(u64::try_from(elapsed).unwrap_or_default())
    }

    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            updating: self.updating.load(Ordering::SeqCst),
            emergency_shutdown: self.emergency_shutdown.load(Ordering::SeqCst),
            owner_sleeping: self.owner_sleeping.load(Ordering::SeqCst),
            uptime: self.uptime(),
        }
    }
}

/// Point-in-time copy of the status flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub updating: bool,
    pub emergency_shutdown: bool,
    pub owner_sleeping: bool,
    pub uptime: Duration,
}

/// Which status page the web surface renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusPage {
    EmergencyShutdown,
    OwnerSleeping,
    Updating,
    Online,
}

/// Presence the bot publishes on the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceState {
    Invisible,
    /// Idle with an "Updating…" activity
    Updating,
    Online,
}

impl PresenceState {
    /// Publish this presence on the shard `ctx` belongs to.
    ///
    /// The client runs a single shard, and `ready` reapplies the current
    /// presence on every (re)connect.
    pub fn apply(self, ctx: &serenity::Context) {
        match self {
            Self::Invisible => ctx.set_presence(None, OnlineStatus::Invisible),
            Self::Updating => ctx.set_presence(
                Some(ActivityData::custom("Updating…")),
                OnlineStatus::Idle,
            ),
            Self::Online => ctx.set_presence(None, OnlineStatus::Online),
        }
        debug!(target: EVENT_TARGET, presence = ?self, "Presence updated");
    }
}

impl StatusSnapshot {
    /// Emergency beats owner asleep beats updating
    #[must_use]
    pub const fn page(&self) -> StatusPage {
        if self.emergency_shutdown {
            StatusPage::EmergencyShutdown
        } else if self.owner_sleeping {
            StatusPage::OwnerSleeping
        } else if self.updating {
            StatusPage::Updating
        } else {
            StatusPage::Online
        }
    }

    /// Owner asleep has no effect on presence
    #[must_use]
    pub const fn presence(&self) -> PresenceState {
        if self.emergency_shutdown {
            PresenceState::Invisible
        } else if self.updating {
            PresenceState::Updating
        } else {
            PresenceState::Online
        }
    }
}

/// Gateway-derived numbers shown on the stats page
#[derive(Debug)]
pub struct LiveMetrics {
    guild_count: AtomicUsize,
    /// `u64::MAX` until the first heartbeat is acknowledged
    latency_ms: AtomicU64,
    bot_name: RwLock<String>,
}

impl Default for LiveMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self {
            guild_count: AtomicUsize::new(0),
            latency_ms: AtomicU64::new(u64::MAX),
            bot_name: RwLock::new(crate::BOT_NAME.to_string()),
        }
    }

    pub fn set_guild_count(&self, count: usize) {
        self.guild_count.store(count, Ordering::Relaxed);
    }

    #[must_use]
    pub fn guild_count(&self) -> usize {
        self.guild_count.load(Ordering::Relaxed)
    }

    pub fn set_latency(&self, latency: Option<Duration>) {
        let ms = latency.map_or(u64::MAX, |l| u64::try_from(l.as_millis()).unwrap_or(u64::MAX));
        self.latency_ms.store(ms, Ordering::Relaxed);
    }

    #[must_use]
    pub fn latency(&self) -> Option<Duration> {
        match self.latency_ms.load(Ordering::Relaxed) {
            u64::MAX => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    pub fn set_bot_name(&self, name: impl Into<String>) {
        if let Ok(mut guard) = self.bot_name.write() {
            *guard = name.into();
        }
    }

    #[must_use]
    pub fn bot_name(&self) -> String {
        self.bot_name
            .read()
            .map_or_else(|_| crate::BOT_NAME.to_string(), |name| name.clone())
    }

    /// Sample the first shard's heartbeat latency every `LATENCY_SAMPLE_INTERVAL`
    pub fn spawn_latency_sampler(self: Arc<Self>, shard_manager: Arc<ShardManager>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(LATENCY_SAMPLE_INTERVAL);
            loop {
                interval.tick().await;
                let latency = {
                    let runners = shard_manager.runners.lock().await;
                    runners.values().find_map(|runner| runner.latency)
                };
                self.set_latency(latency);
            }
        });
        info!(target: EVENT_TARGET, "Latency sampler started");
    }
}

/// Render a duration as `1d 2h 3m 4s`, leaving out leading zero units
#[must_use]
pub fn format_uptime(uptime: Duration) -> String {
    let total = uptime.as_secs();
    let (days, hours, minutes, seconds) =
        (total / 86_400, (total % 86_400) / 3_600, (total % 3_600) / 60, total % 60);

    if days > 0 {
        format!("{days}d {hours}h {minutes}m {seconds}s")
    } else if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}
