use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::update_listeners::Polling;

use photoconv::cli::{Cli, Commands};
use photoconv::conversion::{check_ffmpeg, ConversionPipeline, ConversionRunner, ConversionSessions, FfmpegConverter};
use photoconv::core::{config, init_logger, log_configuration};
use photoconv::storage::{create_pool, get_connection, schema_version, SqliteUserDirectory, UserDirectory};
use photoconv::telegram::{
    create_bot, schema, setup_bot_commands, ChatDispatcher, ChatOutbox, HandlerDeps, TelegramOutbox,
};

/// Main entry point for the Telegram bot
///
/// Parses CLI arguments and dispatches to appropriate subcommand.
///
/// # Errors
/// Returns an error if initialization fails (logging, database, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Load environment variables from .env if present; config statics read them lazily
    let _ = dotenv();

    init_logger(&config::LOG_FILE_PATH)?;
    log_configuration();

    match cli.command() {
        Commands::Run => run_bot().await,
        Commands::Migrate => run_migrate(),
        Commands::Check => run_check().await,
    }
}

/// Applies pending migrations to `DATABASE_PATH`.
fn run_migrate() -> Result<()> {
    let pool = create_pool(&config::DATABASE_PATH)?;
    let mut conn = get_connection(&pool)?;
    let version = schema_version(&mut conn)?;
    log::info!(
        "Database at {} is up to date (schema version {:?})",
        *config::DATABASE_PATH,
        version
    );
    Ok(())
}

/// Fails when the bot token is missing or ffmpeg cannot be started.
async fn run_check() -> Result<()> {
    config::require_bot_token()?;
    log::info!("✅ Bot token: set");

    if !check_ffmpeg(&config::FFMPEG_BIN).await {
        anyhow::bail!("{} is not available", *config::FFMPEG_BIN);
    }
    log::info!("✅ {} is available", *config::FFMPEG_BIN);
    Ok(())
}

async fn run_bot() -> Result<()> {
    let token = config::require_bot_token()?;

    if !check_ffmpeg(&config::FFMPEG_BIN).await {
        log::warn!(
            "{} is not available; conversions will fail until it is installed",
            *config::FFMPEG_BIN
        );
    }

    let db_pool = create_pool(&config::DATABASE_PATH)?;
    let users: Arc<dyn UserDirectory> = Arc::new(SqliteUserDirectory::new(db_pool));

    let bot = create_bot(&token)?;
    let outbox: Arc<dyn ChatOutbox> = Arc::new(TelegramOutbox::from_config(bot.clone())?);

    let pipeline = ConversionPipeline::with_defaults(
        Arc::clone(&outbox),
        Arc::new(FfmpegConverter::from_config()),
        (*config::TEMP_FILES_DIR).clone(),
    )?;
    let runner = Arc::new(
        ConversionRunner::new(Arc::new(pipeline), Arc::clone(&outbox)).with_user_directory(Arc::clone(&users)),
    );
    let dispatcher = Arc::new(ChatDispatcher::new(
        Arc::new(ConversionSessions::new()),
        Arc::clone(&runner),
        outbox,
        users,
    ));

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to register bot commands: {}", e);
    }

    log::info!("Starting bot in long polling mode");
    let listener = Polling::builder(bot.clone()).drop_pending_updates().build();

    Dispatcher::builder(bot, schema(HandlerDeps::new(dispatcher)))
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("An error from the update listener"),
        )
        .await;

    log::info!("Dispatcher stopped");
    runner.shutdown().await;
    log::info!("Shutdown complete");
    Ok(())
}
