//! Telegram bot integration and handlers

pub mod bot;
pub mod dispatcher;
pub mod handlers;
pub mod outbox;

// Re-exports for convenience
pub use bot::{create_bot, setup_bot_commands, Command};
pub use dispatcher::{ChatDispatcher, InboundEvent};
pub use handlers::{schema, HandlerDeps, HandlerError};
pub use outbox::{ChatOutbox, Keyboard, KeyboardChoice, TelegramOutbox};
