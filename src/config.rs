use std::env;
use std::net::SocketAddr;

use anyhow::Context;
use teloxide::types::ChatId;

/// Process configuration, read once at startup from the environment
/// (`.env` is loaded first via dotenvy).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub payment_api_url: String,
    pub payment_api_token: String,
    pub webhook_bind: SocketAddr,
    pub webhook_secret: Option<String>,
    /// When set, /reload is restricted to this chat.
    pub admin_chat_id: Option<ChatId>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let payment_api_url =
            env::var("PAYMENT_API_URL").context("PAYMENT_API_URL must be set")?;
        let payment_api_token =
            env::var("PAYMENT_API_TOKEN").context("PAYMENT_API_TOKEN must be set")?;

        let webhook_bind = env::var("WEBHOOK_BIND")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .context("WEBHOOK_BIND must be host:port")?;
        let webhook_secret = env::var("WEBHOOK_SECRET").ok().filter(|s| !s.is_empty());
        if webhook_secret.is_none() {
            log::warn!("WEBHOOK_SECRET is not set, webhook signatures cannot be verified");
        }

        let admin_chat_id = match env::var("ADMIN_CHAT_ID") {
            Ok(raw) => Some(ChatId(raw.parse().context("ADMIN_CHAT_ID must be an id")?)),
            Err(_) => None,
        };

        Ok(Config {
            database_url,
            payment_api_url,
            payment_api_token,
            webhook_bind,
            webhook_secret,
            admin_chat_id,
        })
    }
}
