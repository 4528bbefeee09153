//! Outbound chat capabilities.
//!
//! [`ChatOutbox`] is everything the dispatcher and the conversion pipeline
//! need from the chat platform. [`TelegramOutbox`] implements it on top of
//! `teloxide::Bot`.

use async_trait::async_trait;
use reqwest::Url;
use teloxide::prelude::*;
use teloxide::types::{
    ButtonRequest, CallbackQueryId, ChatId, FileId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, KeyboardButton,
    KeyboardMarkup, ReplyMarkup,
};

use crate::conversion::AssetRef;
use crate::core::config;
use crate::core::error::{AppError, AppResult};

/// A single inline button
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardChoice {
    pub label: String,
    pub data: String,
}

impl KeyboardChoice {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

/// Platform-neutral keyboards
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyboard {
    /// One-time reply keyboard with a single "share my contact" button
    ContactRequest { label: String },
    /// Inline buttons, one row per inner vec
    Choices(Vec<Vec<KeyboardChoice>>),
}

impl From<Keyboard> for ReplyMarkup {
    fn from(keyboard: Keyboard) -> Self {
        match keyboard {
            Keyboard::ContactRequest { label } => {
                let button = KeyboardButton::new(label).request(ButtonRequest::Contact);
                ReplyMarkup::Keyboard(
                    KeyboardMarkup::new(vec![vec![button]])
                        .resize_keyboard()
                        .one_time_keyboard(),
                )
            }
            Keyboard::Choices(rows) => ReplyMarkup::InlineKeyboard(InlineKeyboardMarkup::new(
                rows.into_iter().map(|row| {
                    row.into_iter()
                        .map(|choice| InlineKeyboardButton::callback(choice.label, choice.data))
                        .collect::<Vec<_>>()
                }),
            )),
        }
    }
}

/// Outbound capabilities required from the chat platform.
#[async_trait]
pub trait ChatOutbox: Send + Sync {
    async fn send_text(&self, chat_id: ChatId, text: &str, keyboard: Option<Keyboard>) -> AppResult<()>;

    async fn send_document(&self, chat_id: ChatId, file_name: &str, bytes: Vec<u8>) -> AppResult<()>;

    /// Stops the client-side spinner on a pressed button; empty `text` shows nothing.
    async fn answer_callback(&self, callback_id: &CallbackQueryId, text: &str) -> AppResult<()>;

    async fn resolve_download_url(&self, asset: &AssetRef) -> AppResult<Url>;
}

/// [`ChatOutbox`] backed by the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramOutbox {
    bot: Bot,
    api_base: Url,
}

impl TelegramOutbox {
    pub fn new(bot: Bot, api_base: Url) -> Self {
        Self { bot, api_base }
    }

    /// Outbox using `BOT_API_URL` or the public Bot API for file downloads
    pub fn from_config(bot: Bot) -> AppResult<Self> {
        let base = config::BOT_API_URL.as_deref().unwrap_or(config::DEFAULT_BOT_API_URL);
        Ok(Self::new(bot, Url::parse(base)?))
    }
}

#[async_trait]
impl ChatOutbox for TelegramOutbox {
    async fn send_text(&self, chat_id: ChatId, text: &str, keyboard: Option<Keyboard>) -> AppResult<()> {
        let request = self.bot.send_message(chat_id, text);
        match keyboard {
            Some(keyboard) => request.reply_markup(ReplyMarkup::from(keyboard)).await?,
            None => request.await?,
        };
        Ok(())
    }

    async fn send_document(&self, chat_id: ChatId, file_name: &str, bytes: Vec<u8>) -> AppResult<()> {
        self.bot
            .send_document(chat_id, InputFile::memory(bytes).file_name(file_name.to_string()))
            .await?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &CallbackQueryId, text: &str) -> AppResult<()> {
        let request = self.bot.answer_callback_query(callback_id.clone());
        if text.is_empty() {
            request.await?;
        } else {
            request.text(text).await?;
        }
        Ok(())
    }

    async fn resolve_download_url(&self, asset: &AssetRef) -> AppResult<Url> {
        let file = self.bot.get_file(FileId(asset.0.clone())).await?;
        log::info!("File info retrieved: path = {}, size = {} bytes", file.path, file.size);
        build_file_url(&self.api_base, self.bot.token(), &file.path)
    }
}

/// Builds `<base>/file/bot<token>/<file path>`.
///
/// A local Bot API server reports absolute container paths; the container
/// prefix is stripped so the path is relative to the server's file root.
pub fn build_file_url(base: &Url, token: &str, file_path: &str) -> AppResult<Url> {
    let mut url = base.clone();

    let normalized_path = if base.as_str().contains("api.telegram.org") {
        file_path
    } else {
        let container_prefix = "/var/lib/telegram-bot-api/";
        file_path.strip_prefix(container_prefix).unwrap_or(file_path)
    };

    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| AppError::ConfigMissing("BOT_API_URL cannot be a base URL".to_string()))?;
        segments.pop_if_empty();
        segments.push("file");
        segments.push(&format!("bot{token}"));
        for seg in normalized_path.split('/') {
            if !seg.is_empty() {
                segments.push(seg);
            }
        }
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_file_url_public_api() {
        let base = Url::parse("https://api.telegram.org").unwrap();
        let url = build_file_url(&base, "123:abc", "photos/file_7.jpg").unwrap();
        assert_eq!(url.as_str(), "https://api.telegram.org/file/bot123:abc/photos/file_7.jpg");
    }

    #[test]
    fn test_build_file_url_local_server_strips_container_prefix() {
        let base = Url::parse("http://localhost:8081/").unwrap();
        let url = build_file_url(&base, "123:abc", "/var/lib/telegram-bot-api/123:abc/photos/file_7.jpg").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8081/file/bot123:abc/123:abc/photos/file_7.jpg"
        );
    }

    #[test]
    fn test_build_file_url_rejects_non_base_url() {
        let base = Url::parse("mailto:someone@example.com").unwrap();
        assert!(build_file_url(&base, "t", "photos/a.jpg").is_err());
    }

    #[test]
    fn test_contact_keyboard_renders_reply_keyboard() {
        let markup = ReplyMarkup::from(Keyboard::ContactRequest {
            label: "Share phone number 📱".to_string(),
        });
        match markup {
            ReplyMarkup::Keyboard(keyboard) => {
                assert_eq!(keyboard.keyboard.len(), 1);
                assert_eq!(keyboard.keyboard[0][0].text, "Share phone number 📱");
                assert!(matches!(keyboard.keyboard[0][0].request, Some(ButtonRequest::Contact)));
            }
            other => panic!("unexpected markup: {:?}", other),
        }
    }

    #[test]
    fn test_choices_render_inline_keyboard() {
        let markup = ReplyMarkup::from(Keyboard::Choices(vec![
            vec![KeyboardChoice::new("Convert to png", "convert_png")],
            vec![KeyboardChoice::new("Convert to jpg", "convert_jpg")],
        ]));
        match markup {
            ReplyMarkup::InlineKeyboard(keyboard) => {
                assert_eq!(keyboard.inline_keyboard.len(), 2);
                assert_eq!(keyboard.inline_keyboard[1][0].text, "Convert to jpg");
            }
            other => panic!("unexpected markup: {:?}", other),
        }
    }
}
