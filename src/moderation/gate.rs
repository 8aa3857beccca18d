//! Command gate
//!
//! The single pipeline every moderation command runs through:
//! shutdown check, acknowledgement, permission guard, command preconditions,
//! the platform mutation, persistence and finally the reply.

use crate::moderation::{
    ActionKind, Actor, CaseStore, ModerationAction, ModerationError, ModerationPlatform,
    ModerationResult, NewEntry, TargetMember, authorize,
};
use crate::status::StatusMode;
use crate::{COMMAND_TARGET, ERROR_TARGET};
use chrono::{Duration, Utc};
use std::collections::HashSet;
use tracing::{error, info, warn};

/// Longest timeout Discord accepts (28 days)
pub const MAX_TIMEOUT_SECS: i64 = 28 * 24 * 60 * 60;
/// Longest slowmode Discord accepts (6 hours)
pub const MAX_SLOWMODE_SECS: i64 = 6 * 60 * 60;
pub const MAX_PURGE: i64 = 100;
pub const MAX_NICKNAME_CHARS: usize = 32;
pub const MAX_ROLE_NAME_CHARS: usize = 100;

pub const NO_REASON: &str = "No reason provided";
const NOT_RECORDED: &str = "⚠️ This action was not recorded in the case log.";

/// How a command talks back to the invoking moderator
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Responder: Send + Sync {
    /// Acknowledge the interaction so the platform deadline is met.
    ///
    /// An ephemeral acknowledgement leaves no placeholder message in the channel.
    async fn defer(&self, ephemeral: bool) -> ModerationResult<()>;

    async fn reply(&self, content: String, ephemeral: bool) -> ModerationResult<()>;
}

/// Fail with `ShutdownActive` when the kill switch is on and `user_id` is not an owner
///
/// # Errors
/// Returns `ModerationError::ShutdownActive`.
pub fn check_shutdown(
    status: &StatusMode,
    owners: &HashSet<u64>,
    user_id: u64,
) -> ModerationResult<()> {
    if status.is_emergency_shutdown() && !owners.contains(&user_id) {
        return Err(ModerationError::ShutdownActive);
    }
    Ok(())
}

/// Everything the gate needs to know about one invocation
#[derive(Debug, Clone)]
pub struct ModerationRequest {
    pub guild_id: u64,
    pub actor: Actor,
    pub bot: Actor,
    pub action: ModerationAction,
    pub target: Option<TargetMember>,
    pub reason: Option<String>,
}

impl ModerationRequest {
    /// The reason as given, with blank input treated as absent
    fn given_reason(&self) -> Option<&str> {
        self.reason.as_deref().map(str::trim).filter(|r| !r.is_empty())
    }

    fn resolved_reason(&self) -> &str {
        self.given_reason().unwrap_or(NO_REASON)
    }

    /// Reason attached to the platform audit log entry
    #[must_use]
    pub fn audit_reason(&self) -> String {
        match self.given_reason() {
            Some(reason) => format!("{reason} | Action by {}", self.actor.display_name),
            None => format!("Action by {}", self.actor.display_name),
        }
    }

    fn require_target(&self) -> ModerationResult<&TargetMember> {
        self.target
            .as_ref()
            .ok_or_else(|| ModerationError::precondition("That member could not be found!"))
    }

    /// Id and display name of the user the action is recorded against
    fn subject(&self) -> Option<(u64, &str)> {
        match &self.action {
            ModerationAction::Unban { user_id, user_name } => Some((*user_id, user_name.as_str())),
            _ => self
                .target
                .as_ref()
                .map(|target| (target.id, target.display_name.as_str())),
        }
    }
}

/// Result of a successful invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub message: String,
    /// Case or warning number, when one was stored
    pub record_id: Option<i64>,
}

/// What the platform reported back beyond success
enum Effect {
    Done,
    CreatedRole(u64),
    Purged(usize),
}

/// The moderation pipeline bound to the shared state of one invocation
pub struct Gate<'a, P: ModerationPlatform + ?Sized> {
    status: &'a StatusMode,
    owners: &'a HashSet<u64>,
    store: &'a CaseStore,
    platform: &'a P,
}

impl<'a, P: ModerationPlatform + ?Sized> Gate<'a, P> {
    pub fn new(
        status: &'a StatusMode,
        owners: &'a HashSet<u64>,
        store: &'a CaseStore,
        platform: &'a P,
    ) -> Self {
        Self {
            status,
            owners,
            store,
            platform,
        }
    }

    /// Run a request and always answer the moderator.
    ///
    /// Failures are logged and replied ephemerally; nothing propagates.
    pub async fn run<R: Responder + ?Sized>(&self, responder: &R, request: ModerationRequest) {
        let kind = request.action.kind();
        let reply = match self.execute(responder, &request).await {
            Ok(outcome) => {
                info!(
                    target: COMMAND_TARGET,
                    action = %kind,
                    guild_id = request.guild_id,
                    actor_id = request.actor.id,
                    record_id = ?outcome.record_id,
                    "Moderation action completed"
                );
                responder.reply(outcome.message, false).await
            }
            Err(e) => {
                match &e {
                    ModerationError::PlatformUnavailable(_) | ModerationError::Unexpected { .. } => {
                        error!(
                            target: ERROR_TARGET,
                            action = %kind,
                            guild_id = request.guild_id,
                            actor_id = request.actor.id,
                            error = %e,
                            "Moderation action failed"
                        );
                    }
                    _ => {
                        warn!(
                            target: COMMAND_TARGET,
                            action = %kind,
                            guild_id = request.guild_id,
                            actor_id = request.actor.id,
                            error = %e,
                            "Moderation action refused"
                        );
                    }
                }
                responder.reply(e.user_message(), true).await
            }
        };

        if let Err(e) = reply {
            error!(target: ERROR_TARGET, action = %kind, error = %e, "Failed to reply to moderator");
        }
    }

    /// Run every step of the pipeline in order, stopping at the first failure.
    ///
    /// # Errors
    /// Returns the `ModerationError` of the step that stopped the request.
    pub async fn execute<R: Responder + ?Sized>(
        &self,
        responder: &R,
        request: &ModerationRequest,
    ) -> ModerationResult<Outcome> {
        check_shutdown(self.status, self.owners, request.actor.id)?;

        let kind = request.action.kind();
        // A public placeholder would be the newest message and get purged
        responder.defer(kind == ActionKind::Purge).await?;

        authorize(
            &request.bot,
            &request.actor,
            kind,
            request.target.as_ref(),
            request.action.role(),
        )?;

        check_preconditions(request, self.store)?;

        let effect = self.apply(request).await?;

        let record_id = self.persist(request).await;

        let mut message = success_message(request, &effect, record_id);
        if record_id.is_none() && (kind.logs_case() || kind == ActionKind::Warn) {
            message.push('\n');
            message.push_str(NOT_RECORDED);
        }

        Ok(Outcome { message, record_id })
    }

    async fn apply(&self, request: &ModerationRequest) -> ModerationResult<Effect> {
        let audit = request.audit_reason();
        let platform = self.platform;

        match &request.action {
            ModerationAction::Kick => {
                platform.kick(request.require_target()?.id, &audit).await?;
            }
            ModerationAction::Ban { delete_message_days } => {
                platform
                    .ban(request.require_target()?.id, *delete_message_days, &audit)
                    .await?;
            }
            ModerationAction::Unban { user_id, .. } => {
                platform.unban(*user_id, &audit).await?;
            }
            ModerationAction::Timeout { seconds } => {
                let until = Utc::now() + Duration::seconds(*seconds);
                platform
                    .timeout(request.require_target()?.id, until, &audit)
                    .await?;
            }
            ModerationAction::RemoveTimeout => {
                platform
                    .remove_timeout(request.require_target()?.id, &audit)
                    .await?;
            }
            ModerationAction::VoiceMute | ModerationAction::VoiceUnmute => {
                let mute = matches!(request.action, ModerationAction::VoiceMute);
                platform
                    .set_voice_mute(request.require_target()?.id, mute, &audit)
                    .await?;
            }
            ModerationAction::Deafen | ModerationAction::Undeafen => {
                let deafen = matches!(request.action, ModerationAction::Deafen);
                platform
                    .set_voice_deafen(request.require_target()?.id, deafen, &audit)
                    .await?;
            }
            ModerationAction::Disconnect => {
                platform
                    .disconnect(request.require_target()?.id, &audit)
                    .await?;
            }
            ModerationAction::Nickname { nickname } => {
                platform
                    .set_nickname(request.require_target()?.id, nickname.clone(), &audit)
                    .await?;
            }
            ModerationAction::AddRole { role } => {
                platform
                    .add_role(request.require_target()?.id, role.id, &audit)
                    .await?;
            }
            ModerationAction::RemoveRole { role } => {
                platform
                    .remove_role(request.require_target()?.id, role.id, &audit)
                    .await?;
            }
            ModerationAction::CreateRole { role } => {
                let id = platform.create_role(role, &audit).await?;
                return Ok(Effect::CreatedRole(id));
            }
            ModerationAction::DeleteRole { role } => {
                platform.delete_role(role.id, &audit).await?;
            }
            ModerationAction::Lock { channel_id } => {
                platform.set_channel_locked(*channel_id, true, &audit).await?;
            }
            ModerationAction::Unlock { channel_id } => {
                platform.set_channel_locked(*channel_id, false, &audit).await?;
            }
            ModerationAction::Slowmode {
                channel_id,
                seconds,
            } => {
                let seconds = u16::try_from(*seconds).map_err(ModerationError::unexpected)?;
                platform.set_slowmode(*channel_id, seconds, &audit).await?;
            }
            ModerationAction::Purge { channel_id, count } => {
                let count = u8::try_from(*count).map_err(ModerationError::unexpected)?;
                let deleted = platform.purge(*channel_id, count).await?;
                return Ok(Effect::Purged(deleted));
            }
            ModerationAction::Warn => {
                request.require_target()?;
            }
        }

        Ok(Effect::Done)
    }

    /// Store the record for this action. A failed write does not undo the mutation.
    async fn persist(&self, request: &ModerationRequest) -> Option<i64> {
        let kind = request.action.kind();
        if !kind.logs_case() && kind != ActionKind::Warn {
            return None;
        }
        let (user_id, user_name) = request.subject()?;
        let entry = NewEntry {
            guild_id: request.guild_id,
            user_id,
            moderator_id: request.actor.id,
            user_name,
            moderator_name: &request.actor.display_name,
        };

        if kind == ActionKind::Warn {
            self.store
                .create_warning(entry, request.resolved_reason())
                .await
        } else {
            self.store
                .create_case(entry, kind, request.given_reason())
                .await
        }
    }
}

/// Command-specific checks that run after the guard and before any mutation
fn check_preconditions(request: &ModerationRequest, store: &CaseStore) -> ModerationResult<()> {
    let kind = request.action.kind();
    if kind.needs_target() {
        request.require_target()?;
    }
    let target = request.target.as_ref();
    let name = target.map_or("That member", |t| t.display_name.as_str());

    match &request.action {
        ModerationAction::Purge { count, .. } => {
            if !(1..=MAX_PURGE).contains(count) {
                return Err(ModerationError::precondition(
                    "Please provide a number between 1 and 100!",
                ));
            }
        }
        ModerationAction::Timeout { seconds } => {
            if !(1..=MAX_TIMEOUT_SECS).contains(seconds) {
                return Err(ModerationError::precondition(
                    "Timeout duration must be between 1 second and 28 days!",
                ));
            }
        }
        ModerationAction::Slowmode { seconds, .. } => {
            if !(0..=MAX_SLOWMODE_SECS).contains(seconds) {
                return Err(ModerationError::precondition(
                    "Slowmode must be between 0 and 21600 seconds (6 hours)!",
                ));
            }
        }
        ModerationAction::Nickname {
            nickname: Some(nickname),
        } => {
            if nickname.chars().count() > MAX_NICKNAME_CHARS {
                return Err(ModerationError::precondition(
                    "Nicknames can be at most 32 characters long!",
                ));
            }
        }
        ModerationAction::AddRole { role } => {
            if target.is_some_and(|t| t.has_role(role.id)) {
                return Err(ModerationError::precondition(format!(
                    "{name} already has the role **{}**!",
                    role.name
                )));
            }
        }
        ModerationAction::RemoveRole { role } => {
            if !target.is_some_and(|t| t.has_role(role.id)) {
                return Err(ModerationError::precondition(format!(
                    "{name} does not have the role **{}**!",
                    role.name
                )));
            }
        }
        ModerationAction::RemoveTimeout => {
            if !target.is_some_and(|t| t.timed_out) {
                return Err(ModerationError::precondition(format!("{name} is not muted!")));
            }
        }
        ModerationAction::VoiceMute => {
            if target.and_then(|t| t.voice).is_some_and(|v| v.mute) {
                return Err(ModerationError::precondition(format!(
                    "{name} is already voice muted!"
                )));
            }
        }
        ModerationAction::VoiceUnmute => {
            if !target.and_then(|t| t.voice).is_some_and(|v| v.mute) {
                return Err(ModerationError::precondition(format!(
                    "{name} is not voice muted!"
                )));
            }
        }
        ModerationAction::Deafen => {
            if target.and_then(|t| t.voice).is_some_and(|v| v.deaf) {
                return Err(ModerationError::precondition(format!(
                    "{name} is already deafened!"
                )));
            }
        }
        ModerationAction::Undeafen => {
            if !target.and_then(|t| t.voice).is_some_and(|v| v.deaf) {
                return Err(ModerationError::precondition(format!("{name} is not deafened!")));
            }
        }
        ModerationAction::CreateRole { role } => {
            let length = role.name.trim().chars().count();
            if length == 0 || length > MAX_ROLE_NAME_CHARS {
                return Err(ModerationError::precondition(
                    "Role names must be between 1 and 100 characters!",
                ));
            }
        }
        ModerationAction::Warn => {
            if !store.is_enabled() {
                return Err(ModerationError::DatabaseUnavailable);
            }
        }
        _ => {}
    }

    Ok(())
}

fn success_message(request: &ModerationRequest, effect: &Effect, record_id: Option<i64>) -> String {
    let who = request
        .subject()
        .map_or_else(String::new, |(id, _)| format!("<@{id}>"));
    let reason = request.resolved_reason();
    let case = record_id.map_or_else(String::new, |id| format!(" (Case #{id})"));

    match &request.action {
        ModerationAction::Kick => format!("✅ {who} has been kicked.{case} Reason: {reason}"),
        ModerationAction::Ban { .. } => format!("✅ {who} has been banned.{case} Reason: {reason}"),
        ModerationAction::Unban { .. } => {
            format!("✅ {who} has been unbanned.{case} Reason: {reason}")
        }
        ModerationAction::Timeout { seconds } => {
            format!("✅ {who} has been muted for {seconds} seconds.{case} Reason: {reason}")
        }
        ModerationAction::RemoveTimeout => {
            format!("✅ {who} has been unmuted.{case} Reason: {reason}")
        }
        ModerationAction::VoiceMute => {
            format!("✅ {who} has been voice muted.{case} Reason: {reason}")
        }
        ModerationAction::VoiceUnmute => {
            format!("✅ {who} has been voice unmuted.{case} Reason: {reason}")
        }
        ModerationAction::Deafen => format!("✅ {who} has been deafened.{case} Reason: {reason}"),
        ModerationAction::Undeafen => {
            format!("✅ {who} has been undeafened.{case} Reason: {reason}")
        }
        ModerationAction::Disconnect => {
            format!("✅ {who} has been disconnected from voice.{case} Reason: {reason}")
        }
        ModerationAction::Nickname {
            nickname: Some(nickname),
        } => format!("✅ Changed {who}'s nickname to **{nickname}**.{case}"),
        ModerationAction::Nickname { nickname: None } => {
            format!("✅ Reset {who}'s nickname.{case}")
        }
        ModerationAction::AddRole { role } => format!("✅ Added <@&{}> to {who}.", role.id),
        ModerationAction::RemoveRole { role } => {
            format!("✅ Removed <@&{}> from {who}.", role.id)
        }
        ModerationAction::CreateRole { role } => match effect {
            Effect::CreatedRole(id) => format!("✅ Created role <@&{id}>."),
            _ => format!("✅ Created role **{}**.", role.name),
        },
        ModerationAction::DeleteRole { role } => format!("✅ Deleted role **{}**.", role.name),
        ModerationAction::Lock { channel_id } => {
            format!("✅ <#{channel_id}> has been locked. Reason: {reason}")
        }
        ModerationAction::Unlock { channel_id } => {
            format!("✅ <#{channel_id}> has been unlocked. Reason: {reason}")
        }
        ModerationAction::Slowmode {
            channel_id,
            seconds: 0,
        } => format!("✅ Slowmode disabled in <#{channel_id}>."),
        ModerationAction::Slowmode {
            channel_id,
            seconds,
        } => format!("✅ Slowmode set to {seconds} seconds in <#{channel_id}>."),
        ModerationAction::Purge { .. } => {
            let deleted = match effect {
                Effect::Purged(n) => *n,
                _ => 0,
            };
            format!("✅ Deleted {deleted} message(s).")
        }
        ModerationAction::Warn => {
            let warning = record_id.map_or_else(String::new, |id| format!(" (Warning #{id})"));
            format!("✅ {who} has been warned.{warning} Reason: {reason}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moderation::guard::tests::{actor, target};
    use crate::moderation::{MockModerationPlatform, RoleInfo, VoiceStatus};
    use mockall::predicate::{always, eq};
    use poise::serenity_prelude::Permissions;
    use std::sync::Mutex;

    const GUILD: u64 = 555;
    const OWNER: u64 = 1;
    const MODERATOR: u64 = 20;

    /// Keeps every reply so tests can look at them
    #[derive(Default)]
    struct Recorder {
        /// Ephemeral flag of every acknowledgement
        deferred: Mutex<Vec<bool>>,
        replies: Mutex<Vec<(String, bool)>>,
    }

    #[async_trait::async_trait]
    impl Responder for Recorder {
        async fn defer(&self, ephemeral: bool) -> ModerationResult<()> {
            self.deferred.lock().unwrap().push(ephemeral);
            Ok(())
        }

        async fn reply(&self, content: String, ephemeral: bool) -> ModerationResult<()> {
            self.replies.lock().unwrap().push((content, ephemeral));
            Ok(())
        }
    }

    impl Recorder {
        fn last(&self) -> (String, bool) {
            self.replies.lock().unwrap().last().cloned().unwrap()
        }
    }

    fn owners() -> HashSet<u64> {
        HashSet::from([OWNER])
    }

    fn request(action: ModerationAction, target: Option<TargetMember>) -> ModerationRequest {
        ModerationRequest {
            guild_id: GUILD,
            actor: actor(MODERATOR, Permissions::ADMINISTRATOR, 50),
            bot: actor(2, Permissions::ADMINISTRATOR, 10),
            action,
            target,
            reason: None,
        }
    }

    #[tokio::test]
    async fn test_kick_at_equal_rank_changes_nothing() {
        let status = StatusMode::new();
        let owners = owners();
        let store = CaseStore::in_memory().await;
        let mut platform = MockModerationPlatform::new();
        platform.expect_kick().times(0);

        let gate = Gate::new(&status, &owners, &store, &platform);
        let responder = Recorder::default();
        gate.run(&responder, request(ModerationAction::Kick, Some(target(3, 10))))
            .await;

        let (message, ephemeral) = responder.last();
        assert!(ephemeral);
        assert!(message.contains("equal or higher"));
        assert_eq!(store.count_cases(GUILD, 3).await, 0);
    }

    #[tokio::test]
    async fn test_kick_records_case() {
        let status = StatusMode::new();
        let owners = owners();
        let store = CaseStore::in_memory().await;
        let mut platform = MockModerationPlatform::new();
        platform
            .expect_kick()
            .withf(|user_id, reason| *user_id == 3 && reason == "spam | Action by user20")
            .times(1)
            .returning(|_, _| Ok(()));

        let gate = Gate::new(&status, &owners, &store, &platform);
        let mut req = request(ModerationAction::Kick, Some(target(3, 5)));
        req.reason = Some("spam".to_string());
        let outcome = gate.execute(&Recorder::default(), &req).await.unwrap();

        let case_id = outcome.record_id.unwrap();
        assert!(outcome.message.starts_with("✅ <@3> has been kicked."));
        assert!(outcome.message.contains(&format!("(Case #{case_id})")));
        assert!(outcome.message.ends_with("Reason: spam"));

        let case = store.get_case(case_id, GUILD).await.unwrap();
        assert_eq!(case.action_type, "kick");
        assert_eq!(case.user_name.as_deref(), Some("target3"));
    }

    #[tokio::test]
    async fn test_purge_out_of_range_never_deletes() {
        let status = StatusMode::new();
        let owners = owners();
        let store = CaseStore::disabled();
        let mut platform = MockModerationPlatform::new();
        platform.expect_purge().times(0);

        let gate = Gate::new(&status, &owners, &store, &platform);
        for count in [150, 0, -4] {
            let req = request(ModerationAction::Purge { channel_id: 9, count }, None);
            let err = gate.execute(&Recorder::default(), &req).await.unwrap_err();
            assert!(matches!(err, ModerationError::PreconditionFailed(_)), "{count}");
        }
    }

    #[tokio::test]
    async fn test_purge_requests_exact_count() {
        let status = StatusMode::new();
        let owners = owners();
        let store = CaseStore::disabled();
        let mut platform = MockModerationPlatform::new();
        platform
            .expect_purge()
            .with(eq(9), eq(50))
            .times(1)
            .returning(|_, _| Ok(48));

        let gate = Gate::new(&status, &owners, &store, &platform);
        let responder = Recorder::default();
        let req = request(ModerationAction::Purge { channel_id: 9, count: 50 }, None);
        let outcome = gate.execute(&responder, &req).await.unwrap();
        assert_eq!(outcome.message, "✅ Deleted 48 message(s).");
        assert_eq!(outcome.record_id, None);
        // Nothing of ours is left in the channel to be counted
        assert_eq!(*responder.deferred.lock().unwrap(), vec![true]);
    }

    #[tokio::test]
    async fn test_warn_then_list_returns_it() {
        let status = StatusMode::new();
        let owners = owners();
        let store = CaseStore::in_memory().await;
        let platform = MockModerationPlatform::new();

        let gate = Gate::new(&status, &owners, &store, &platform);
        let mut req = request(ModerationAction::Warn, Some(target(3, 5)));
        req.reason = Some("rude".to_string());
        let outcome = gate.execute(&Recorder::default(), &req).await.unwrap();

        let warnings = store.list_warnings(GUILD, 3, 10).await;
        assert_eq!(warnings.len(), 1);
        assert_eq!(Some(warnings[0].id), outcome.record_id);
        assert_eq!(warnings[0].reason, "rude");
        assert_eq!(warnings[0].moderator_id, MODERATOR);
        assert_eq!(warnings[0].moderator_name.as_deref(), Some("user20"));
        assert_eq!(warnings[0].user_name.as_deref(), Some("target3"));
        assert!(outcome.message.contains("Warning #"));
    }

    #[tokio::test]
    async fn test_warn_without_store_reports_tracking_disabled() {
        let status = StatusMode::new();
        let owners = owners();
        let store = CaseStore::disabled();
        let platform = MockModerationPlatform::new();

        let gate = Gate::new(&status, &owners, &store, &platform);
        let responder = Recorder::default();
        let mut req = request(ModerationAction::Warn, Some(target(3, 5)));
        req.reason = Some("rude".to_string());
        gate.run(&responder, req).await;

        let (message, ephemeral) = responder.last();
        assert!(ephemeral);
        assert!(message.contains("Moderation tracking is not enabled"));
    }

    #[tokio::test]
    async fn test_shutdown_blocks_everyone_but_owners() {
        let status = StatusMode::new();
        let owners = owners();
        let store = CaseStore::disabled();
        let mut platform = MockModerationPlatform::new();
        platform.expect_kick().times(1).returning(|_, _| Ok(()));

        assert!(status.toggle_emergency_shutdown());
        let gate = Gate::new(&status, &owners, &store, &platform);

        // No acknowledgement at all while shut down
        let mut responder = MockResponder::new();
        responder.expect_defer().times(0);
        let err = gate
            .execute(&responder, &request(ModerationAction::Kick, Some(target(3, 5))))
            .await
            .unwrap_err();
        assert!(matches!(err, ModerationError::ShutdownActive));

        let mut req = request(ModerationAction::Kick, Some(target(3, 5)));
        req.actor.id = OWNER;
        let outcome = gate.execute(&Recorder::default(), &req).await.unwrap();
        // Store is disabled, so the reply says so
        assert!(outcome.message.contains("not recorded"));

        assert!(!status.toggle_emergency_shutdown());
        assert!(check_shutdown(&status, &owners, MODERATOR).is_ok());
    }

    #[tokio::test]
    async fn test_shutdown_reply_is_ephemeral() {
        let status = StatusMode::new();
        status.toggle_emergency_shutdown();
        let owners = owners();
        let store = CaseStore::disabled();
        let platform = MockModerationPlatform::new();

        let mut responder = MockResponder::new();
        responder.expect_defer().times(0);
        responder
            .expect_reply()
            .withf(|content, ephemeral| *ephemeral && content.contains("emergency shutdown"))
            .times(1)
            .returning(|_, _| Ok(()));

        Gate::new(&status, &owners, &store, &platform)
            .run(&responder, request(ModerationAction::Kick, Some(target(3, 5))))
            .await;
    }

    #[tokio::test]
    async fn test_timeout_bounds() {
        let status = StatusMode::new();
        let owners = owners();
        let store = CaseStore::in_memory().await;
        let mut platform = MockModerationPlatform::new();
        platform
            .expect_timeout()
            .with(eq(3), always(), always())
            .times(1)
            .returning(|_, _, _| Ok(()));

        let gate = Gate::new(&status, &owners, &store, &platform);
        for seconds in [0, MAX_TIMEOUT_SECS + 1] {
            let req = request(ModerationAction::Timeout { seconds }, Some(target(3, 5)));
            assert!(gate.execute(&Recorder::default(), &req).await.is_err());
        }

        let req = request(ModerationAction::Timeout { seconds: 60 }, Some(target(3, 5)));
        let outcome = gate.execute(&Recorder::default(), &req).await.unwrap();
        assert!(outcome.message.contains("muted for 60 seconds"));
        let case = store.get_case(outcome.record_id.unwrap(), GUILD).await.unwrap();
        assert_eq!(case.action_type, "mute");
    }

    #[tokio::test]
    async fn test_unmute_requires_active_timeout() {
        let status = StatusMode::new();
        let owners = owners();
        let store = CaseStore::disabled();
        let mut platform = MockModerationPlatform::new();
        platform.expect_remove_timeout().times(0);

        let gate = Gate::new(&status, &owners, &store, &platform);
        let req = request(ModerationAction::RemoveTimeout, Some(target(3, 5)));
        let err = gate.execute(&Recorder::default(), &req).await.unwrap_err();
        assert_eq!(err.user_message(), "❌ target3 is not muted!");
    }

    #[tokio::test]
    async fn test_voice_state_preconditions() {
        let status = StatusMode::new();
        let owners = owners();
        let store = CaseStore::disabled();
        let mut platform = MockModerationPlatform::new();
        platform.expect_set_voice_mute().times(0);
        platform
            .expect_set_voice_deafen()
            .with(eq(3), eq(true), always())
            .times(1)
            .returning(|_, _, _| Ok(()));

        let mut member = target(3, 5);
        member.voice = Some(VoiceStatus {
            channel_id: 70,
            mute: true,
            deaf: false,
        });

        let gate = Gate::new(&status, &owners, &store, &platform);
        let req = request(ModerationAction::VoiceMute, Some(member.clone()));
        let err = gate.execute(&Recorder::default(), &req).await.unwrap_err();
        assert!(err.user_message().contains("already voice muted"));

        let req = request(ModerationAction::Undeafen, Some(member.clone()));
        assert!(gate.execute(&Recorder::default(), &req).await.is_err());

        let req = request(ModerationAction::Deafen, Some(member));
        assert!(gate.execute(&Recorder::default(), &req).await.is_ok());
    }

    #[tokio::test]
    async fn test_role_preconditions() {
        let status = StatusMode::new();
        let owners = owners();
        let store = CaseStore::disabled();
        let mut platform = MockModerationPlatform::new();
        platform.expect_add_role().times(0);
        platform
            .expect_remove_role()
            .with(eq(3), eq(7), always())
            .times(1)
            .returning(|_, _, _| Ok(()));

        let role = RoleInfo {
            id: 7,
            name: "Regular".to_string(),
            position: 2,
        };
        let mut member = target(3, 5);
        member.role_ids.push(7);

        let gate = Gate::new(&status, &owners, &store, &platform);
        let req = request(ModerationAction::AddRole { role: role.clone() }, Some(member.clone()));
        let err = gate.execute(&Recorder::default(), &req).await.unwrap_err();
        assert!(err.user_message().contains("already has the role"));

        let req = request(ModerationAction::RemoveRole { role }, Some(member));
        let outcome = gate.execute(&Recorder::default(), &req).await.unwrap();
        assert_eq!(outcome.message, "✅ Removed <@&7> from <@3>.");
        assert_eq!(outcome.record_id, None);
    }

    #[tokio::test]
    async fn test_nickname_and_slowmode_limits() {
        let status = StatusMode::new();
        let owners = owners();
        let store = CaseStore::disabled();
        let mut platform = MockModerationPlatform::new();
        platform.expect_set_nickname().times(0);
        platform.expect_set_slowmode().times(0);

        let gate = Gate::new(&status, &owners, &store, &platform);
        let req = request(
            ModerationAction::Nickname {
                nickname: Some("x".repeat(33)),
            },
            Some(target(3, 5)),
        );
        assert!(gate.execute(&Recorder::default(), &req).await.is_err());

        let req = request(
            ModerationAction::Slowmode {
                channel_id: 4,
                seconds: MAX_SLOWMODE_SECS + 1,
            },
            None,
        );
        assert!(gate.execute(&Recorder::default(), &req).await.is_err());
    }

    #[tokio::test]
    async fn test_platform_rejection_is_surfaced() {
        let status = StatusMode::new();
        let owners = owners();
        let store = CaseStore::in_memory().await;
        let mut platform = MockModerationPlatform::new();
        platform
            .expect_unban()
            .times(1)
            .returning(|_, _| Err(ModerationError::PlatformRejected("Unknown Ban".to_string())));

        let gate = Gate::new(&status, &owners, &store, &platform);
        let responder = Recorder::default();
        let req = request(
            ModerationAction::Unban {
                user_id: 88,
                user_name: "88".to_string(),
            },
            None,
        );
        gate.run(&responder, req).await;

        let (message, ephemeral) = responder.last();
        assert!(ephemeral);
        assert_eq!(message, "❌ Discord rejected the action: Unknown Ban");
        assert_eq!(store.count_cases(GUILD, 88).await, 0);
        assert_eq!(*responder.deferred.lock().unwrap(), vec![false]);
    }

    #[tokio::test]
    async fn test_lock_and_unlock_carry_audit_reason() {
        let status = StatusMode::new();
        let owners = owners();
        let store = CaseStore::disabled();
        let mut platform = MockModerationPlatform::new();
        platform
            .expect_set_channel_locked()
            .withf(|channel_id, locked, reason| {
                *channel_id == 9 && *locked && reason == "raid | Action by user20"
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        platform
            .expect_set_channel_locked()
            .withf(|channel_id, locked, reason| {
                *channel_id == 9 && !*locked && reason == "Action by user20"
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let gate = Gate::new(&status, &owners, &store, &platform);
        let mut req = request(ModerationAction::Lock { channel_id: 9 }, None);
        req.reason = Some("raid".to_string());
        let outcome = gate.execute(&Recorder::default(), &req).await.unwrap();
        assert_eq!(outcome.message, "✅ <#9> has been locked. Reason: raid");

        let req = request(ModerationAction::Unlock { channel_id: 9 }, None);
        let outcome = gate.execute(&Recorder::default(), &req).await.unwrap();
        assert_eq!(outcome.message, "✅ <#9> has been unlocked. Reason: No reason provided");
    }

    #[test]
    fn test_audit_reason() {
        let mut req = request(ModerationAction::Kick, None);
        assert_eq!(req.audit_reason(), "Action by user20");
        req.reason = Some("  ".to_string());
        assert_eq!(req.audit_reason(), "Action by user20");
        req.reason = Some("raiding".to_string());
        assert_eq!(req.audit_reason(), "raiding | Action by user20");
    }
}
