use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use rusqlite::Connection;
use teloxide::prelude::*;
use url::Url;
use tracing::info;

use goldshop::bot::{self, App};
use goldshop::db;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let bot_token =
        env::var("TELEGRAM_BOT_TOKEN").context("TELEGRAM_BOT_TOKEN must be set")?;
    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let channel_username =
        env::var("CHANNEL_USERNAME").unwrap_or_else(|_| "@sarvagold".to_string());
    let channel_url = env::var("CHANNEL_URL")
        .unwrap_or_else(|_| "https://t.me/sarvagold".to_string())
        .parse::<Url>()
        .context("CHANNEL_URL must be a valid URL")?;

    info!(database_url, "Initializing database");
    let conn = Connection::open(&database_url)?;
    db::run_migrations(&conn)?;

    // Comma-separated telegram ids of the shop operators.
    if let Ok(admin_ids) = env::var("ADMIN_IDS") {
        for id in admin_ids.split(',') {
            let id = id
                .trim()
                .parse::<i64>()
                .with_context(|| format!("Invalid admin id in ADMIN_IDS: {id}"))?;
            db::add_admin(&conn, id)?;
        }
    }

    let app = Arc::new(App::new(conn, channel_username, channel_url));
    let bot = Bot::new(bot_token);

    info!("Bot initialized, starting dispatcher");

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint({
            let app = Arc::clone(&app);
            move |bot: Bot, msg: Message| {
                let app = Arc::clone(&app);
                async move { bot::handle_message(bot, app, msg).await }
            }
        }))
        .branch(Update::filter_callback_query().endpoint({
            let app = Arc::clone(&app);
            move |bot: Bot, q: CallbackQuery| {
                let app = Arc::clone(&app);
                async move { bot::handle_callback_query(bot, app, q).await }
            }
        }));

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
