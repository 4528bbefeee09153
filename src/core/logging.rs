//! Logging initialization and startup diagnostics
//!
//! This module provides:
//! - Logger initialization (console + file)
//! - A configuration summary logged once at startup

use anyhow::Result;
use simplelog::*;
use std::fs::File;

use crate::core::config;

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - Failed to create the file or a logger is already set
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file = File::create(log_file_path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;

    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Info,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::Info, Config::default(), log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Logs the resolved runtime configuration at application startup.
///
/// The bot token itself is never logged, only whether it is present.
pub fn log_configuration() {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("⚙️  Configuration");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    if config::BOT_TOKEN.is_empty() {
        log::error!("❌ Bot token: not set ({})", config::BOT_TOKEN_VARS.join(" / "));
    } else {
        log::info!("✅ Bot token: set");
    }

    log::info!("🗄  DATABASE_PATH: {}", config::DATABASE_PATH.as_str());
    log::info!("🎞  FFMPEG_BIN: {}", config::FFMPEG_BIN.as_str());
    log::info!("📂 TEMP_FILES_DIR: {}", config::TEMP_FILES_DIR.display());
    log::info!("⏱  Conversion timeout: {}s", config::conversion::timeout().as_secs());
    log::info!("🖼  Image quality: {}", config::conversion::quality());

    match config::BOT_API_URL.as_deref() {
        Some(url) => log::info!("🌐 BOT_API_URL: {}", url),
        None => log::info!("🌐 BOT_API_URL: default ({})", config::DEFAULT_BOT_API_URL),
    }
}
