use std::sync::Arc;

use teloxide::{prelude::*, utils::command::BotCommands};

mod bot_state;
mod catalog;
mod config;
mod database;
mod handlers;
mod models;
mod nav;
mod orders;
mod pagination;

use crate::bot_state::AppState;
use crate::catalog::PgCatalogSource;
use crate::config::Config;
use crate::database::Database;
use crate::handlers::{
    callback_handler, command_handler, message_handler, sweep_sessions_task, TelegramNotifier,
};
use crate::orders::{webhook, HttpPaymentProcessor, OrderLifecycle, PgOrderLedger};

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Доступні команди:")]
pub enum Command {
    #[command(description = "почати вибір книги")]
    Start,
    #[command(description = "довідка")]
    Help,
    #[command(description = "оновити каталог")]
    Reload,
    #[command(description = "скасувати оформлення")]
    Cancel,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();
    log::info!("Starting book rental bot...");

    let config = Config::from_env()?;

    let db = Database::new(&config.database_url).await?;
    db.init().await?;
    log::info!("✅ Database initialized");

    let bot = Bot::from_env();

    let ledger = Arc::new(PgOrderLedger::new(db.clone()));
    let processor = Arc::new(HttpPaymentProcessor::new(
        config.payment_api_url.clone(),
        config.payment_api_token.clone(),
    )?);
    let notifier = Arc::new(TelegramNotifier::new(bot.clone()));
    let lifecycle = Arc::new(OrderLifecycle::new(ledger, processor, notifier));

    let state = AppState::new(Arc::new(PgCatalogSource::new(db)), lifecycle.clone());

    // First snapshot. A failure is not fatal: /start retries, and users
    // see an explicit "unavailable" message until a load succeeds.
    match state.reload_catalog().await {
        Ok(count) => log::info!("✅ Catalog loaded: {count} titles"),
        Err(e) => log::error!("initial catalog load failed: {e}"),
    }

    // Payment webhooks arrive independently of the dispatcher.
    let webhook_router = webhook::router(lifecycle, config.webhook_secret.clone());
    let webhook_bind = config.webhook_bind;
    tokio::spawn(async move {
        if let Err(e) = webhook::serve(webhook_bind, webhook_router).await {
            log::error!("webhook server exited: {e}");
        }
    });

    let state_clone = state.clone();
    tokio::spawn(async move {
        sweep_sessions_task(state_clone).await;
    });

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(command_handler),
        )
        .branch(Update::filter_callback_query().endpoint(callback_handler))
        .branch(Update::filter_message().endpoint(message_handler));

    log::info!("🚀 Starting dispatcher...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state, config])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
