use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, MessageId};
use teloxide::{ApiError, RequestError};

use crate::models::Order;
use crate::nav::machine::format_price;
use crate::nav::Reply;
use crate::orders::PaidNotifier;

/// Inline keyboard for a machine reply, `None` when there are no buttons.
pub fn reply_keyboard(reply: &Reply) -> Option<InlineKeyboardMarkup> {
    if reply.buttons.is_empty() {
        return None;
    }
    let rows: Vec<Vec<InlineKeyboardButton>> = reply
        .buttons
        .iter()
        .map(|row| {
            row.iter()
                .map(|(label, data)| InlineKeyboardButton::callback(label.clone(), data.clone()))
                .collect()
        })
        .collect();
    Some(InlineKeyboardMarkup::new(rows))
}

pub async fn send_reply(
    bot: &Bot,
    chat_id: ChatId,
    reply: &Reply,
) -> Result<(), RequestError> {
    if reply.is_empty() {
        return Ok(());
    }
    let mut request = bot.send_message(chat_id, &reply.text);
    if let Some(keyboard) = reply_keyboard(reply) {
        request = request.reply_markup(keyboard);
    }
    request.await?;
    Ok(())
}

/// Edit the originating message in place, as the menus navigate within a
/// single message. "Message is not modified" is an expected idempotent
/// outcome of re-rendering the same menu, not an error.
pub async fn edit_reply(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    reply: &Reply,
) -> Result<(), RequestError> {
    if reply.is_empty() {
        return Ok(());
    }
    let mut request = bot.edit_message_text(chat_id, message_id, &reply.text);
    if let Some(keyboard) = reply_keyboard(reply) {
        request = request.reply_markup(keyboard);
    }
    match request.await {
        Ok(_) => Ok(()),
        Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Sends the "payment received" message. Used from the webhook path,
/// where only the persisted order row identifies the chat.
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl PaidNotifier for TelegramNotifier {
    async fn notify_paid(&self, order: &Order) {
        let mut text = format!(
            "🎉 Оплату отримано!\n\n📖 «{}» заброньовано на {} дн. ({})",
            order.title,
            order.duration_days,
            format_price(order.price_minor)
        );
        if let Some(location) = &order.location {
            text.push_str(&format!("\n📍 Забрати можна тут: {location}"));
        }
        text.push_str("\n\nДякуємо, що обираєте «Тиху Поличку»! 📚");

        if let Err(e) = self.bot.send_message(order.chat_id, text).await {
            log::error!(
                "failed to notify chat {} about paid order {}: {}",
                order.chat_id,
                order.order_id,
                e
            );
        }
    }
}
