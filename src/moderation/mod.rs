//! Moderation system for Modwarden
//!
//! Permission checks, the command gate pipeline, the platform adapter and the
//! case store behind every moderation command.

mod action;
mod error;
mod gate;
mod guard;
mod platform;
mod record;
mod store;

pub use action::{ActionKind, ModerationAction, NewRole};
pub use error::{ModerationError, ModerationResult};
pub use gate::{
    Gate, MAX_PURGE, MAX_TIMEOUT_SECS, ModerationRequest, NO_REASON, Outcome, Responder,
    check_shutdown,
};
pub use guard::{Actor, RoleInfo, TargetMember, VoiceStatus, authorize};
pub use platform::{ModerationPlatform, SerenityPlatform};
pub use record::{ModNote, ModerationCase, NewEntry, Warning};
pub use store::CaseStore;

#[cfg(test)]
pub use gate::MockResponder;
#[cfg(test)]
pub use platform::MockModerationPlatform;
