//! Dispatcher schema and handler chain builders

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use super::types::{callback_event, contact_event, photo_event, HandlerDeps, HandlerError};
use crate::telegram::bot::Command;
use crate::telegram::dispatcher::InboundEvent;

/// Creates the main dispatcher schema for the Telegram bot.
///
/// Branch order: commands, contact shares, photos, then button presses.
/// Anything else is ignored.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    dptree::entry()
        .branch(command_handler(deps.clone()))
        .branch(contact_handler(deps.clone()))
        .branch(photo_handler(deps.clone()))
        .branch(callback_handler(deps))
}

fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                log::info!("Received command: {:?} from chat {}", cmd, msg.chat.id);
                dispatch(
                    &deps,
                    InboundEvent::Command {
                        chat_id: msg.chat.id,
                        command: cmd,
                    },
                )
                .await
            }
        },
    ))
}

fn contact_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter_map(|msg: Message| contact_event(&msg))
        .endpoint(move |event: InboundEvent| {
            let deps = deps.clone();
            async move { dispatch(&deps, event).await }
        })
}

fn photo_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter_map(|msg: Message| photo_event(&msg))
        .endpoint(move |event: InboundEvent| {
            let deps = deps.clone();
            async move { dispatch(&deps, event).await }
        })
}

fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query()
        .filter_map(|q: CallbackQuery| callback_event(&q))
        .endpoint(move |event: InboundEvent| {
            let deps = deps.clone();
            async move { dispatch(&deps, event).await }
        })
}

async fn dispatch(deps: &HandlerDeps, event: InboundEvent) -> Result<(), HandlerError> {
    deps.dispatcher.handle(event).await.map_err(|e| Box::new(e) as HandlerError)
}
