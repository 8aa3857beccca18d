use crate::{COMMAND_TARGET, CONSOLE_TARGET, Context, Data, ERROR_TARGET, Error};
use poise::FrameworkError;
use std::path::Path;
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Log directory name
pub const LOG_DIR: &str = "logs";
/// Command log file name
pub const COMMAND_LOG_FILE: &str = "commands";
/// Filter used when `RUST_LOG` is unset
const DEFAULT_DIRECTIVES: [&str; 3] = ["info", "serenity=error", "sqlx=warn"];

/// Initialize the logging system with console and file outputs
///
/// # Errors
/// Fails when the log directory cannot be created or a subscriber is already set.
pub fn init() -> Result<(), Error> {
    if !Path::new(LOG_DIR).exists() {
        std::fs::create_dir_all(LOG_DIR)?;
    }

    let command_file = RollingFileAppender::new(Rotation::DAILY, LOG_DIR, COMMAND_LOG_FILE);

    // Human-readable console output
    let console_layer = fmt::layer()
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true)
        .with_ansi(true);

    // JSON command log
    let command_layer = fmt::layer()
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true)
        .with_ansi(false)
        .json()
        .with_writer(command_file);

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => default_filter()?,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(command_layer)
        .try_init()?;

    info!(target: CONSOLE_TARGET, "Logging system initialized");
    Ok(())
}

fn default_filter() -> Result<EnvFilter, Error> {
    let mut filter = EnvFilter::new(DEFAULT_DIRECTIVES[0]);
    for directive in &DEFAULT_DIRECTIVES[1..] {
        filter = filter.add_directive(directive.parse()?);
    }
    Ok(filter)
}

fn guild_label(ctx: Context<'_>) -> String {
    ctx.guild_id()
        .map_or_else(|| "DM".to_string(), |id| id.get().to_string())
}

/// Log the start of a command execution (pre-command hook)
pub async fn log_command_start(ctx: Context<'_>) {
    ctx.set_invocation_data(Instant::now()).await;

    let args = if ctx.command().parameters.is_empty() {
        String::new()
    } else {
        format!("{:?}", ctx.invocation_string())
    };

    info!(
        target: COMMAND_TARGET,
        command = %ctx.command().qualified_name,
        guild_id = %guild_label(ctx),
        user_id = %ctx.author().id,
        arguments = %args,
        event = "start",
        "Command execution started"
    );
}

/// Log the end of a command execution (post-command hook)
pub async fn log_command_end(ctx: Context<'_>) {
    let elapsed = ctx
        .invocation_data::<Instant>()
        .await
        .map(|start| start.elapsed());
    let duration_ms = u64::try_from(elapsed.map_or(0, |d| d.as_millis())).unwrap_or_default();

    info!(
        target: COMMAND_TARGET,
        command = %ctx.command().qualified_name,
        guild_id = %guild_label(ctx),
        user_id = %ctx.author().id,
        duration_ms = duration_ms,
        event = "end",
        "Command execution completed"
    );
}

/// Log errors that occur during command execution
pub fn log_command_error(error: &FrameworkError<'_, Data, Error>) {
    match error {
        FrameworkError::Command { error, ctx, .. } => {
            error!(
                target: ERROR_TARGET,
                command = %ctx.command().qualified_name,
                guild_id = %guild_label(*ctx),
                user_id = %ctx.author().id,
                error = %error,
                "Command error"
            );
        }
        FrameworkError::CommandCheckFailed { error, ctx, .. } => {
            let error_msg = error
                .as_ref()
                .map_or_else(|| "Check failed".to_string(), ToString::to_string);

            warn!(
                target: COMMAND_TARGET,
                command = %ctx.command().qualified_name,
                guild_id = %guild_label(*ctx),
                user_id = %ctx.author().id,
                error = %error_msg,
                "Command check failed"
            );
        }
        FrameworkError::MissingUserPermissions {
            missing_permissions,
            ctx,
            ..
        } => {
            warn!(
                target: COMMAND_TARGET,
                command = %ctx.command().qualified_name,
                guild_id = %guild_label(*ctx),
                user_id = %ctx.author().id,
                missing = ?missing_permissions,
                "Missing user permissions"
            );
        }
        err => {
            error!(
                target: ERROR_TARGET,
                error_type = %error_kind(err),
                error = %err,
                "Other framework error"
            );
        }
    }
}

/// Short name of a framework error category for the logs
fn error_kind(error: &FrameworkError<'_, Data, Error>) -> &'static str {
    match error {
        FrameworkError::Setup { .. } => "setup",
        FrameworkError::EventHandler { .. } => "event_handler",
        FrameworkError::CommandPanic { .. } => "command_panic",
        FrameworkError::ArgumentParse { .. } => "argument_parse",
        FrameworkError::CommandStructureMismatch { .. } => "structure_mismatch",
        FrameworkError::CooldownHit { .. } => "cooldown",
        FrameworkError::MissingBotPermissions { .. } => "missing_bot_permissions",
        FrameworkError::NotAnOwner { .. } => "not_an_owner",
        FrameworkError::GuildOnly { .. } => "guild_only",
        FrameworkError::DmOnly { .. } => "dm_only",
        FrameworkError::NsfwOnly { .. } => "nsfw_only",
        FrameworkError::UnknownCommand { .. } => "unknown_command",
        FrameworkError::UnknownInteraction { .. } => "unknown_interaction",
        _ => "other",
    }
}
