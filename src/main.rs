use std::sync::Arc;

use modwarden::config::Config;
use modwarden::handlers::Handler;
use modwarden::moderation::CaseStore;
use modwarden::status::{LiveMetrics, StatusMode};
use modwarden::web::{self, WebState};
use modwarden::{CONSOLE_TARGET, Context, Data, ERROR_TARGET, Error, commands, logging};
use poise::serenity_prelude::{self as serenity};
use poise::{CreateReply, FrameworkError};
use serenity::GatewayIntents;
use tracing::{error, info, warn};

const PERMISSION_DENIED: &str = "❌ You don't have permission to use this command!";
const UNEXPECTED: &str = "❌ An unexpected error occurred.";

/// Reject every command while the kill switch is on, owners excepted
async fn shutdown_check(ctx: Context<'_>) -> Result<bool, Error> {
    match ctx.data().check_shutdown(ctx.author().id.get()) {
        Ok(()) => Ok(true),
        Err(e) => {
            ctx.send(CreateReply::default().content(e.user_message()).ephemeral(true))
                .await?;
            Ok(false)
        }
    }
}

/// Log every framework error and make sure the invoker hears back
async fn on_error(error: FrameworkError<'_, Data, Error>) {
    logging::log_command_error(&error);

    let message = match &error {
        FrameworkError::MissingUserPermissions { .. } => PERMISSION_DENIED,
        // The check already answered
        FrameworkError::CommandCheckFailed { error: None, .. } => return,
        _ => UNEXPECTED,
    };
    if let Some(ctx) = error.ctx() {
        if let Err(e) = ctx
            .send(CreateReply::default().content(message).ephemeral(true))
            .await
        {
            error!(target: ERROR_TARGET, error = %e, "Failed to report command error");
        }
    }
}

/// Main function to run the bot
async fn async_main() -> Result<(), Error> {
    let dotenv = dotenvy::dotenv();
    logging::init()?;
    if let Err(e) = dotenv {
        info!(target: CONSOLE_TARGET, "No .env file loaded: {e}");
    }

    let config = Config::from_env()?;
    info!(target: CONSOLE_TARGET, ?config, "Configuration loaded");

    let store = match &config.database_url {
        Some(url) => {
            CaseStore::connect(url, config.db_min_connections, config.db_max_connections).await
        }
        None => {
            warn!(target: CONSOLE_TARGET, "DATABASE_URL not set, case tracking is disabled");
            CaseStore::disabled()
        }
    };
    if config.owner_ids.is_empty() {
        warn!(target: CONSOLE_TARGET, "OWNER_IDS not set, owner commands are unusable");
    }

    let status = Arc::new(StatusMode::new());
    let metrics = Arc::new(LiveMetrics::new());
    let data = Data::new(
        Arc::clone(&status),
        Arc::clone(&metrics),
        store,
        config.owner_ids.clone(),
    );
    let web_state = WebState {
        status: Arc::clone(&status),
        metrics: Arc::clone(&metrics),
        credentials: config.stats.clone().map(Arc::new),
    };
    let listen_addr = config.listen_addr();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::all(),
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(config.command_prefix.clone()),
                ..Default::default()
            },
            command_check: Some(|ctx| Box::pin(shutdown_check(ctx))),
            pre_command: |ctx| Box::pin(logging::log_command_start(ctx)),
            post_command: |ctx| Box::pin(logging::log_command_end(ctx)),
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                info!(target: CONSOLE_TARGET, "Registering commands");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                // Setup runs once, so reconnects never rebind the port
                if let Err(e) = web::spawn(listen_addr, web_state).await {
                    error!(target: ERROR_TARGET, %listen_addr, error = %e, "Status server failed to start");
                }
                Ok(data)
            })
        })
        .build();

    let intents = GatewayIntents::non_privileged()
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::MESSAGE_CONTENT;
    let mut client = serenity::ClientBuilder::new(&config.discord_token, intents)
        .event_handler(Handler::new(status, Arc::clone(&metrics)))
        .framework(framework)
        .await?;

    metrics.spawn_latency_sampler(Arc::clone(&client.shard_manager));

    let shard_manager = Arc::clone(&client.shard_manager);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(target: ERROR_TARGET, error = %e, "Failed to listen for shutdown signal");
            return;
        }
        info!(target: CONSOLE_TARGET, "Shutting down");
        shard_manager.shutdown_all().await;
    });

    info!(target: CONSOLE_TARGET, "Starting bot...");
    client.start().await?;

    Ok(())
}

fn main() {
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Error building the runtime: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = runtime.block_on(async_main()) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
