//! photoconv - Telegram bot that converts photos between image formats
//!
//! Users register by sharing their phone number, send a photo, and pick a
//! target format from inline buttons; the converted file comes back as a
//! document.
//!
//! # Module Structure
//!
//! - `core`: Configuration, errors, logging, and process helpers
//! - `storage`: SQLite pool, migrations, and the user directory
//! - `conversion`: Per-chat sessions and the download -> convert -> deliver pipeline
//! - `telegram`: Bot wiring, handler schema, and the chat dispatcher

pub mod cli;
pub mod conversion;
pub mod core;
pub mod storage;
pub mod telegram;

// Re-export commonly used types for convenience
pub use conversion::{ConversionPipeline, ConversionRunner, ConversionSessions, ImageFormat};
pub use self::core::{config, AppError, AppResult};
pub use storage::{create_pool, get_connection, DbConnection, DbPool};
pub use telegram::{ChatDispatcher, ChatOutbox, InboundEvent};
