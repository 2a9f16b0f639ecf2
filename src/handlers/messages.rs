use teloxide::prelude::*;

use crate::bot_state::AppState;
use crate::nav::machine;

use super::utils::send_reply;
use super::{complete_booking, HandlerResult};

/// Free-text input: the name and contact steps. A shared phone contact
/// counts as contact input.
pub async fn message_handler(bot: Bot, msg: Message, state: AppState) -> HandlerResult {
    let chat_id = msg.chat.id;

    let input = if let Some(contact) = msg.contact() {
        contact.phone_number.clone()
    } else if let Some(text) = msg.text() {
        // Commands are already routed to command_handler.
        if text.starts_with('/') {
            return Ok(());
        }
        text.to_string()
    } else {
        return Ok(());
    };

    let Some(snapshot) = state.snapshot().await else {
        send_reply(&bot, chat_id, &machine::catalog_unavailable_reply()).await?;
        return Ok(());
    };

    let mut session = state.session(chat_id).await;
    let outcome = machine::handle_text(&mut session, &input, &snapshot);
    send_reply(&bot, chat_id, &outcome.reply).await?;

    if let Some(intent) = outcome.intent {
        complete_booking(&bot, chat_id, &state, &mut session, &intent).await?;
    }

    state.put_session(chat_id, session).await;
    Ok(())
}
