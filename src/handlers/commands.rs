use teloxide::prelude::*;

use crate::bot_state::AppState;
use crate::config::Config;
use crate::nav::machine;
use crate::Command;

use super::utils::send_reply;
use super::HandlerResult;

pub async fn command_handler(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: AppState,
    config: Config,
) -> HandlerResult {
    match cmd {
        Command::Start => handle_start(bot, msg, state).await?,
        Command::Help => handle_help(bot, msg).await?,
        Command::Reload => handle_reload(bot, msg, state, config).await?,
        Command::Cancel => handle_cancel(bot, msg, state).await?,
    }
    Ok(())
}

async fn handle_start(bot: Bot, msg: Message, state: AppState) -> HandlerResult {
    let chat_id = msg.chat.id;

    // First interaction may land before any catalog has ever loaded.
    let snapshot = match state.snapshot().await {
        Some(snapshot) => snapshot,
        None => match state.reload_catalog().await {
            Ok(_) => match state.snapshot().await {
                Some(snapshot) => snapshot,
                None => {
                    send_reply(&bot, chat_id, &machine::catalog_unavailable_reply()).await?;
                    return Ok(());
                }
            },
            Err(e) => {
                log::error!("catalog load on /start failed: {e}");
                send_reply(&bot, chat_id, &machine::catalog_unavailable_reply()).await?;
                return Ok(());
            }
        },
    };

    let mut session = state.session(chat_id).await;
    let outcome = machine::start(&mut session, &snapshot);
    send_reply(&bot, chat_id, &outcome.reply).await?;
    state.put_session(chat_id, session).await;
    Ok(())
}

async fn handle_help(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(
        msg.chat.id,
        "📚 «Тиха Поличка» — оренда книжок у затишних місцях.\n\n\
         /start — почати вибір книги\n\
         /cancel — скасувати поточне оформлення\n\
         /help — ця довідка\n\n\
         Оберіть локацію, жанр або автора, книгу і строк оренди — \
         після оплати книга чекатиме на вас у вибраній локації.",
    )
    .await?;
    Ok(())
}

async fn handle_reload(bot: Bot, msg: Message, state: AppState, config: Config) -> HandlerResult {
    if let Some(admin) = config.admin_chat_id {
        if msg.chat.id != admin {
            log::warn!("/reload refused for chat {}", msg.chat.id);
            bot.send_message(msg.chat.id, "Ця команда доступна лише адміністратору.")
                .await?;
            return Ok(());
        }
    }

    match state.reload_catalog().await {
        Ok(count) => {
            bot.send_message(msg.chat.id, format!("✅ Каталог оновлено: {count} книжок."))
                .await?;
        }
        Err(e) => {
            log::error!("catalog reload failed: {e}");
            bot.send_message(
                msg.chat.id,
                "⚠️ Не вдалося оновити каталог. Попередня версія лишається чинною.",
            )
            .await?;
        }
    }
    Ok(())
}

async fn handle_cancel(bot: Bot, msg: Message, state: AppState) -> HandlerResult {
    state.clear_session(msg.chat.id).await;
    bot.send_message(
        msg.chat.id,
        "❌ Оформлення скасовано. Надішліть /start, щоб почати заново.",
    )
    .await?;
    Ok(())
}
