use once_cell::sync::Lazy;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::core::error::{AppError, AppResult};

/// Environment variables checked for the bot token, in priority order
pub const BOT_TOKEN_VARS: [&str; 3] = ["TELEGRAM_TOKEN", "BOT_TOKEN", "TELOXIDE_TOKEN"];

/// Bot token
/// Read from TELEGRAM_TOKEN, then BOT_TOKEN, then TELOXIDE_TOKEN.
/// Empty when none is set; use [`require_bot_token`] at startup.
pub static BOT_TOKEN: Lazy<String> =
    Lazy::new(|| resolve_bot_token(|name| env::var(name).ok()).unwrap_or_default());

/// Database file path
/// Read from DATABASE_PATH environment variable
/// Default: app.db
pub static DATABASE_PATH: Lazy<String> =
    Lazy::new(|| env::var("DATABASE_PATH").unwrap_or_else(|_| "app.db".to_string()));

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: app.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "app.log".to_string()));

/// Conversion binary
/// Read from FFMPEG_BIN environment variable, defaults to "ffmpeg"
pub static FFMPEG_BIN: Lazy<String> = Lazy::new(|| env::var("FFMPEG_BIN").unwrap_or_else(|_| "ffmpeg".to_string()));

/// Directory for the scoped input/output files of a conversion
/// Read from TEMP_FILES_DIR environment variable
/// Defaults to the system temp dir, supports tilde (~) expansion
pub static TEMP_FILES_DIR: Lazy<PathBuf> = Lazy::new(|| match env::var("TEMP_FILES_DIR") {
    Ok(dir) if !dir.trim().is_empty() => expand_tilde(dir.trim()),
    _ => env::temp_dir(),
});

/// Custom Bot API server (e.g. a local telegram-bot-api instance)
/// Read from BOT_API_URL environment variable
pub static BOT_API_URL: Lazy<Option<String>> = Lazy::new(|| env::var("BOT_API_URL").ok());

/// Default Bot API base used to build file download URLs
pub const DEFAULT_BOT_API_URL: &str = "https://api.telegram.org";

/// Returns the first non-empty token among [`BOT_TOKEN_VARS`].
///
/// `lookup` abstracts the environment so the priority order can be tested
/// without touching process state.
pub fn resolve_bot_token<F>(lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    BOT_TOKEN_VARS
        .iter()
        .filter_map(|name| lookup(name))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

/// Returns the bot token or a fatal `ConfigMissing` error.
pub fn require_bot_token() -> AppResult<String> {
    if BOT_TOKEN.is_empty() {
        return Err(AppError::ConfigMissing(format!(
            "bot token is not set (expected one of {})",
            BOT_TOKEN_VARS.join(", ")
        )));
    }
    Ok(BOT_TOKEN.clone())
}

fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), env::var_os("HOME")) {
        (Some(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => PathBuf::from(path),
    }
}

/// Conversion configuration
pub mod conversion {
    use super::Duration;

    /// Default upper bound for a single ffmpeg run (in seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

    /// Conversion process timeout
    /// Read from CONVERSION_TIMEOUT_SECS environment variable
    pub fn timeout() -> Duration {
        let secs = std::env::var("CONVERSION_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Duration::from_secs(secs)
    }

    /// Default output quality for lossy formats (1-100)
    pub const DEFAULT_QUALITY: u8 = 90;

    /// Output quality for jpg/webp
    /// Read from IMAGE_QUALITY environment variable
    pub fn quality() -> u8 {
        parse_quality(std::env::var("IMAGE_QUALITY").ok().as_deref())
    }

    /// Accepts 1-100; anything else falls back to [`DEFAULT_QUALITY`].
    pub fn parse_quality(raw: Option<&str>) -> u8 {
        raw.and_then(|v| v.trim().parse::<u8>().ok())
            .filter(|v| (1..=100).contains(v))
            .unwrap_or(DEFAULT_QUALITY)
    }
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Timeout for HTTP requests (in seconds)
    pub const TIMEOUT_SECS: u64 = 60;

    /// Network timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(TIMEOUT_SECS)
    }
}

/// Database configuration
pub mod database {
    /// Maximum connections kept by the SQLite pool
    pub const POOL_MAX_SIZE: u32 = 10;
}
