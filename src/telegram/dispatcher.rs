//! Per-chat event routing.
//!
//! [`ChatDispatcher`] owns the conversation rules: registration via a shared
//! contact, one pending photo per chat, and format selection through inline
//! buttons. It only talks to the outside world through [`ChatOutbox`], so the
//! same code runs under teloxide and under test fakes.

use std::sync::Arc;

use strum::IntoEnumIterator;
use teloxide::types::{CallbackQueryId, ChatId};
use teloxide::utils::command::BotCommands;

use super::bot::Command;
use super::outbox::{ChatOutbox, Keyboard, KeyboardChoice};
use crate::conversion::{
    AssetRef, BeginOutcome, ChatState, ConversionRequest, ConversionRunner, ConversionSessions, ImageFormat,
};
use crate::core::error::AppResult;
use crate::core::validation::display_name;
use crate::storage::{register_user, UserDirectory};

pub const CHOOSE_FORMAT_TEXT: &str = "Choose a format to convert your image:";
pub const ALREADY_PENDING_TEXT: &str = "You already sent a photo. Please finish the conversion first.";
pub const NO_PENDING_PHOTO_TEXT: &str = "Please send a photo first.";
pub const UNKNOWN_OPTION_TEXT: &str = "Unknown option.";
pub const PROCESSING_CALLBACK_TEXT: &str = "Processing...";
pub const SHARE_PHONE_TEXT: &str = "Please share your phone number to continue:";
pub const SHARE_PHONE_BUTTON: &str = "Share phone number 📱";
pub const SEND_IMAGE_TEXT: &str = "You can send any image and I will convert it to another type!";
pub const GENERIC_FAILURE_TEXT: &str = "Something went wrong!";

/// Platform-neutral inbound events
#[derive(Debug, Clone)]
pub enum InboundEvent {
    Command {
        chat_id: ChatId,
        command: Command,
    },
    ContactShared {
        chat_id: ChatId,
        name: String,
        phone: String,
    },
    PhotoReceived {
        chat_id: ChatId,
        asset: AssetRef,
    },
    CallbackReceived {
        callback_id: CallbackQueryId,
        chat_id: ChatId,
        data: String,
    },
}

pub struct ChatDispatcher {
    sessions: Arc<ConversionSessions>,
    runner: Arc<ConversionRunner>,
    outbox: Arc<dyn ChatOutbox>,
    users: Arc<dyn UserDirectory>,
}

impl ChatDispatcher {
    pub fn new(
        sessions: Arc<ConversionSessions>,
        runner: Arc<ConversionRunner>,
        outbox: Arc<dyn ChatOutbox>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            sessions,
            runner,
            outbox,
            users,
        }
    }

    pub fn state(&self, chat_id: ChatId) -> ChatState {
        self.sessions.state(chat_id)
    }

    pub fn runner(&self) -> &ConversionRunner {
        &self.runner
    }

    pub async fn handle(&self, event: InboundEvent) -> AppResult<()> {
        match event {
            InboundEvent::Command { chat_id, command } => self.on_command(chat_id, command).await,
            InboundEvent::ContactShared { chat_id, name, phone } => self.on_contact(chat_id, &name, &phone).await,
            InboundEvent::PhotoReceived { chat_id, asset } => self.on_photo(chat_id, asset).await,
            InboundEvent::CallbackReceived {
                callback_id,
                chat_id,
                data,
            } => self.on_callback(&callback_id, chat_id, &data).await,
        }
    }

    async fn on_command(&self, chat_id: ChatId, command: Command) -> AppResult<()> {
        match command {
            Command::Start => {
                let keyboard = Keyboard::ContactRequest {
                    label: SHARE_PHONE_BUTTON.to_string(),
                };
                self.outbox.send_text(chat_id, SHARE_PHONE_TEXT, Some(keyboard)).await
            }
            Command::Help => {
                self.outbox
                    .send_text(chat_id, &Command::descriptions().to_string(), None)
                    .await
            }
        }
    }

    async fn on_contact(&self, chat_id: ChatId, name: &str, phone: &str) -> AppResult<()> {
        match register_user(self.users.as_ref(), name, phone, Some(chat_id.0)) {
            Ok(user) => {
                log::info!("User {} registered from chat {}", user.id, chat_id);
                self.outbox
                    .send_text(chat_id, &format!("Welcome {}!", display_name(&user.name)), None)
                    .await?;
                self.outbox.send_text(chat_id, SEND_IMAGE_TEXT, None).await
            }
            Err(e) => {
                log::error!("Failed to register user from chat {}: {}", chat_id, e);
                self.outbox.send_text(chat_id, GENERIC_FAILURE_TEXT, None).await
            }
        }
    }

    async fn on_photo(&self, chat_id: ChatId, asset: AssetRef) -> AppResult<()> {
        match self.sessions.begin(chat_id, asset) {
            BeginOutcome::Accepted => {
                log::info!("Chat {} is awaiting a format choice", chat_id);
                self.outbox
                    .send_text(chat_id, CHOOSE_FORMAT_TEXT, Some(format_keyboard()))
                    .await
            }
            BeginOutcome::Rejected(reason) => {
                log::info!("Rejected photo from chat {}: {:?}", chat_id, reason);
                self.outbox.send_text(chat_id, ALREADY_PENDING_TEXT, None).await
            }
        }
    }

    async fn on_callback(&self, callback_id: &CallbackQueryId, chat_id: ChatId, data: &str) -> AppResult<()> {
        if !self.sessions.has_session(chat_id) {
            self.answer(callback_id).await;
            return self.outbox.send_text(chat_id, NO_PENDING_PHOTO_TEXT, None).await;
        }

        let Some(target) = ImageFormat::from_callback_data(data) else {
            log::warn!("Unknown callback data from chat {}: {:?}", chat_id, data);
            self.answer(callback_id).await;
            return self.outbox.send_text(chat_id, UNKNOWN_OPTION_TEXT, None).await;
        };

        // A concurrent press may have taken the session since the check above.
        let Some(asset) = self.sessions.resolve(chat_id) else {
            self.answer(callback_id).await;
            return self.outbox.send_text(chat_id, NO_PENDING_PHOTO_TEXT, None).await;
        };

        let request = ConversionRequest { asset, target, chat_id };
        let notice = format!("Converting your photo to {}…", target);
        if let Err(e) = self.outbox.send_text(chat_id, &notice, None).await {
            log::warn!("Failed to send progress notice to chat {}: {}", chat_id, e);
        }
        if let Err(e) = self.outbox.answer_callback(callback_id, PROCESSING_CALLBACK_TEXT).await {
            log::warn!("Failed to answer callback for chat {}: {}", chat_id, e);
        }

        self.runner.spawn(request);
        Ok(())
    }

    /// Acknowledges a button press without a toast.
    async fn answer(&self, callback_id: &CallbackQueryId) {
        if let Err(e) = self.outbox.answer_callback(callback_id, "").await {
            log::warn!("Failed to answer callback {:?}: {}", callback_id, e);
        }
    }
}

/// One `Convert to <fmt>` button per format, one per row.
pub fn format_keyboard() -> Keyboard {
    Keyboard::Choices(
        ImageFormat::iter()
            .map(|format| vec![KeyboardChoice::new(format!("Convert to {}", format), format.callback_data())])
            .collect(),
    )
}
