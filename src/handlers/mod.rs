pub mod callbacks;
pub mod commands;
pub mod messages;
pub mod utils;

pub use callbacks::callback_handler;
pub use commands::command_handler;
pub use messages::message_handler;
pub use utils::TelegramNotifier;

use std::error::Error;

use teloxide::prelude::*;
use tokio::time;

use crate::bot_state::AppState;
use crate::models::{BookingIntent, Session};
use crate::nav::machine;

use utils::send_reply;

pub type HandlerResult = Result<(), Box<dyn Error + Send + Sync>>;

/// Booking intent -> persisted order -> invoice. Errors stop the chain:
/// a failed ledger write means no order exists downstream, a failed
/// invoice leaves the order Pending with a retry button.
pub async fn complete_booking(
    bot: &Bot,
    chat_id: ChatId,
    state: &AppState,
    session: &mut Session,
    intent: &BookingIntent,
) -> HandlerResult {
    let order = match state.lifecycle.create_order(chat_id, intent).await {
        Ok(order) => order,
        Err(e) => {
            log::error!("order persistence failed for chat {chat_id}: {e}");
            let reply = machine::persistence_failed_reply(session);
            send_reply(bot, chat_id, &reply).await?;
            return Ok(());
        }
    };
    session.order_id = Some(order.order_id.clone());

    match state.lifecycle.request_invoice(&order).await {
        Ok(invoice) => {
            send_reply(bot, chat_id, &machine::confirmation_reply(&order, &invoice.url)).await?;
        }
        Err(e) => {
            log::warn!("invoice creation failed for order {}: {e}", order.order_id);
            send_reply(bot, chat_id, &machine::invoice_failed_reply(&e.to_string())).await?;
        }
    }
    Ok(())
}

/// Background task dropping sessions idle past their TTL.
pub async fn sweep_sessions_task(state: AppState) {
    let mut interval = time::interval(time::Duration::from_secs(600));
    loop {
        interval.tick().await;
        state.sweep_idle_sessions().await;
    }
}
