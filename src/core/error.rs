use thiserror::Error;

use crate::conversion::ConversionError;
use crate::storage::DirectoryError;

/// Centralized error types for the application
///
/// Everything the Telegram adapter and the binary can fail with is converted
/// to this enum for consistent error handling. Uses `thiserror` for automatic
/// error conversion and display formatting.
///
/// # Example
///
/// ```no_run
/// use photoconv::core::error::AppError;
///
/// fn handle_error(err: AppError) {
///     eprintln!("Error: {}", err);
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Required configuration is absent; only raised at startup
    #[error("Missing configuration: {0}")]
    ConfigMissing(String),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Database connection pool errors
    #[error("Database pool error: {0}")]
    DatabasePool(#[from] r2d2::Error),

    /// User directory errors
    #[error("User directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// Conversion pipeline errors
    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// HTTP/Fetch errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing errors
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// Anyhow errors (for general error handling)
    #[error("Application error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;
