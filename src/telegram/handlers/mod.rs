//! Telegram bot handler tree configuration
//!
//! The schema turns teloxide updates into [`InboundEvent`](crate::telegram::InboundEvent)s
//! and hands them to the chat dispatcher.

mod schema;
mod types;

pub use schema::schema;
pub use types::{callback_event, contact_event, photo_event, HandlerDeps, HandlerError};
