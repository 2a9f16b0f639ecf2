use teloxide::prelude::*;

use crate::bot_state::AppState;
use crate::models::{PaymentStatus, Session};
use crate::nav::machine;
use crate::nav::NavEvent;

use super::utils::{edit_reply, send_reply};
use super::HandlerResult;

pub async fn callback_handler(bot: Bot, q: CallbackQuery, state: AppState) -> HandlerResult {
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };
    let Some(ref message) = q.message else {
        return Ok(());
    };
    let chat_id = message.chat().id;
    let message_id = message.id();

    let Some(event) = NavEvent::parse(data) else {
        log::debug!("unparseable callback payload from chat {chat_id}: {data:?}");
        return Ok(());
    };

    let mut session = state.session(chat_id).await;

    if event == NavEvent::RetryInvoice {
        retry_invoice(&bot, chat_id, &state, &session).await?;
        state.put_session(chat_id, session).await;
        return Ok(());
    }

    let Some(snapshot) = state.snapshot().await else {
        send_reply(&bot, chat_id, &machine::catalog_unavailable_reply()).await?;
        return Ok(());
    };

    let outcome = machine::handle_event(&mut session, event, &snapshot);
    // Menus navigate within the originating message; plain-text replies
    // (stale-selection prompts, hints) go out as new messages so the menu
    // stays usable.
    if outcome.reply.buttons.is_empty() {
        send_reply(&bot, chat_id, &outcome.reply).await?;
    } else {
        edit_reply(&bot, chat_id, message_id, &outcome.reply).await?;
    }
    state.put_session(chat_id, session).await;
    Ok(())
}

/// A fresh invoice under the same order id is permitted while the order
/// is still Pending.
async fn retry_invoice(
    bot: &Bot,
    chat_id: ChatId,
    state: &AppState,
    session: &Session,
) -> HandlerResult {
    let Some(order_id) = session.order_id.as_deref() else {
        bot.send_message(chat_id, "Немає активного замовлення. Надішліть /start.")
            .await?;
        return Ok(());
    };

    let order = match state.lifecycle.find_order(order_id).await {
        Ok(Some(order)) => order,
        Ok(None) => {
            bot.send_message(chat_id, "Замовлення не знайдено. Надішліть /start.")
                .await?;
            return Ok(());
        }
        Err(e) => {
            log::error!("order lookup failed for {order_id}: {e}");
            bot.send_message(chat_id, "⚠️ Щось пішло не так. Спробуйте пізніше.")
                .await?;
            return Ok(());
        }
    };

    match order.status {
        PaymentStatus::Paid => {
            bot.send_message(chat_id, "ℹ️ Це замовлення вже сплачено.").await?;
        }
        PaymentStatus::Failed => {
            bot.send_message(
                chat_id,
                "❌ Оплату за цим замовленням відхилено. Почніть заново: /start",
            )
            .await?;
        }
        PaymentStatus::Pending => match state.lifecycle.request_invoice(&order).await {
            Ok(invoice) => {
                send_reply(bot, chat_id, &machine::confirmation_reply(&order, &invoice.url))
                    .await?;
            }
            Err(e) => {
                log::warn!("invoice retry failed for order {}: {e}", order.order_id);
                send_reply(bot, chat_id, &machine::invoice_failed_reply(&e.to_string())).await?;
            }
        },
    }
    Ok(())
}
