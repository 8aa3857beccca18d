use std::{collections::HashSet, ops::Deref, sync::Arc};

use crate::moderation::{CaseStore, Gate, ModerationPlatform, ModerationResult, check_shutdown};
use crate::status::{LiveMetrics, StatusMode};

/// Shared state handed to every command and event.
#[derive(Clone)]
pub struct Data(pub Arc<DataInner>);

impl std::fmt::Debug for Data {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Data")
            .field("status", &self.status.snapshot())
            .field("guilds", &self.metrics.guild_count())
            .field("tracking", &self.store.is_enabled())
            .field("owners", &self.owners)
            .finish()
    }
}

impl Deref for Data {
    type Target = DataInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Data {
    #[must_use]
    pub fn new(
        status: Arc<StatusMode>,
        metrics: Arc<LiveMetrics>,
        store: CaseStore,
        owners: HashSet<u64>,
    ) -> Self {
        Self(Arc::new(DataInner {
            status,
            metrics,
            store,
            owners,
        }))
    }

    /// Whether `user_id` is one of the configured bot owners
    #[must_use]
    pub fn is_owner(&self, user_id: u64) -> bool {
        self.owners.contains(&user_id)
    }

    /// Reject `user_id` while the kill switch is on, unless they own the bot
    ///
    /// # Errors
    /// Returns `ModerationError::ShutdownActive`.
    pub fn check_shutdown(&self, user_id: u64) -> ModerationResult<()> {
        check_shutdown(&self.status, &self.owners, user_id)
    }

    /// The moderation pipeline acting through `platform`
    pub fn gate<'a, P: ModerationPlatform + ?Sized>(&'a self, platform: &'a P) -> Gate<'a, P> {
        Gate::new(&self.status, &self.owners, &self.store, platform)
    }
}

pub struct DataInner {
    /// Owner-controlled status flags, also read by the web surface
    pub status: Arc<StatusMode>,
    /// Gateway numbers for the stats page
    pub metrics: Arc<LiveMetrics>,
    pub store: CaseStore,
    /// User ids allowed to run owner commands and bypass the kill switch
    pub owners: HashSet<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> Data {
        Data::new(
            Arc::new(StatusMode::new()),
            Arc::new(LiveMetrics::new()),
            CaseStore::disabled(),
            HashSet::from([7]),
        )
    }

    #[test]
    fn test_owner_lookup() {
        let data = data();
        assert!(data.is_owner(7));
        assert!(!data.is_owner(8));
    }

    #[test]
    fn test_shutdown_check_spares_owners() {
        let data = data();
        assert!(data.check_shutdown(8).is_ok());
        data.status.toggle_emergency_shutdown();
        assert!(data.check_shutdown(8).is_err());
        assert!(data.check_shutdown(7).is_ok());
    }

    #[test]
    fn test_clones_share_state() {
        let data = data();
        let copy = data.clone();
        copy.status.toggle_updating();
        assert!(data.status.snapshot().updating);
    }
}
