//! Top-level dispatch of incoming updates.
//!
//! Operators and end users share one chat surface. A message goes to the
//! operator flow only when the sender is an admin and is either inside an
//! admin wizard or pressing a panel control; everything else, including
//! admins browsing the storefront, goes through the end-user flow.

use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;

use crate::bot::{admin_flow, user_flow, App};
use crate::callback::{is_shopping_action, CallbackData};
use crate::db;
use crate::localization::t;

pub async fn handle_message(bot: Bot, app: Arc<App>, msg: Message) -> Result<()> {
    let Some(from) = &msg.from else {
        return Ok(());
    };
    let telegram_id = from.id.0.cast_signed();

    let is_admin = {
        let conn = app.conn.lock().await;
        db::is_admin(&conn, telegram_id)?
    };

    if is_admin && routes_to_admin_flow(&app, &msg, telegram_id) {
        admin_flow::handle_message(&bot, &app, &msg, telegram_id).await
    } else {
        user_flow::handle_message(&bot, &app, &msg, telegram_id, is_admin).await
    }
}

/// Panel entry points and any in-progress wizard claim the message. Media
/// with no text still reaches the media wizard steps this way.
fn routes_to_admin_flow(app: &App, msg: &Message, telegram_id: i64) -> bool {
    if app.admin_states.is_active(telegram_id) {
        return true;
    }
    let Some(text) = msg.text() else {
        return false;
    };
    text == "/admin" || text == t("btn-admin-panel") || is_admin_menu_label(text)
}

fn is_admin_menu_label(text: &str) -> bool {
    [
        "btn-admin-add-product",
        "btn-admin-edit-product",
        "btn-admin-delete-product",
        "btn-admin-categories",
        "btn-admin-collections",
        "btn-admin-weight-ranges",
        "btn-admin-wage-ranges",
        "btn-admin-approve-users",
        "btn-admin-user-list",
        "btn-admin-user-levels",
        "btn-admin-contact",
    ]
    .iter()
    .any(|key| text == t(key))
}

pub async fn handle_callback_query(bot: Bot, app: Arc<App>, q: CallbackQuery) -> Result<()> {
    // Stop the client spinner regardless of what the payload turns out to be.
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(payload) = q.data.as_deref() else {
        return Ok(());
    };
    let action = CallbackData::decode(payload).action;

    if is_shopping_action(&action) || action == "back" || action == "check_channel_membership" {
        return user_flow::handle_callback(&bot, &app, &q).await;
    }

    let telegram_id = q.from.id.0.cast_signed();
    let is_admin = {
        let conn = app.conn.lock().await;
        db::is_admin(&conn, telegram_id)?
    };
    if is_admin {
        admin_flow::handle_callback(&bot, &app, &q).await
    } else {
        // Stale admin buttons in a demoted operator's chat are ignored.
        Ok(())
    }
}
