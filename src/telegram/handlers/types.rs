//! Handler types and update-to-event translation

use std::sync::Arc;

use teloxide::types::{CallbackQuery, ChatId, Message, PhotoSize, UserId};

use crate::conversion::AssetRef;
use crate::telegram::dispatcher::{ChatDispatcher, InboundEvent};

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub dispatcher: Arc<ChatDispatcher>,
}

impl HandlerDeps {
    pub fn new(dispatcher: Arc<ChatDispatcher>) -> Self {
        Self { dispatcher }
    }
}

/// Contact share -> registration event.
///
/// The sender's first name wins over the name stored on the contact card.
pub fn contact_event(msg: &Message) -> Option<InboundEvent> {
    let contact = msg.contact()?;
    let name = msg
        .from
        .as_ref()
        .map(|u| u.first_name.clone())
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| contact.first_name.clone());

    Some(InboundEvent::ContactShared {
        chat_id: msg.chat.id,
        name,
        phone: contact.phone_number.clone(),
    })
}

/// Photo -> pending conversion, using the highest resolution Telegram offers.
pub fn photo_event(msg: &Message) -> Option<InboundEvent> {
    let photo = largest_by_area(msg.photo()?, |p: &PhotoSize| (p.width, p.height))?;
    Some(InboundEvent::PhotoReceived {
        chat_id: msg.chat.id,
        asset: AssetRef::new(photo.file.id.0.clone()),
    })
}

/// Button press -> format choice. Presses without payload are dropped.
pub fn callback_event(q: &CallbackQuery) -> Option<InboundEvent> {
    let data = q.data.clone()?;
    let chat_id = q
        .message
        .as_ref()
        .map(|m| m.chat().id)
        .unwrap_or_else(|| private_chat(q.from.id));

    Some(InboundEvent::CallbackReceived {
        callback_id: q.id.clone(),
        chat_id,
        data,
    })
}

/// The private chat with `user`, for presses on messages too old to carry their chat.
fn private_chat(user: UserId) -> ChatId {
    ChatId::from(user)
}

pub(crate) fn largest_by_area<T>(items: &[T], dims: impl Fn(&T) -> (u32, u32)) -> Option<&T> {
    items.iter().max_by_key(|item| {
        let (w, h) = dims(item);
        u64::from(w) * u64::from(h)
    })
}
