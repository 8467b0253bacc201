//! Operator flow: catalog administration and user moderation.
//!
//! Every wizard is a strict linear sequence driven by
//! [`crate::state::AdminState`]. Invalid input re-prompts without advancing;
//! the state is cleared only on completion, explicit cancel, or the back
//! button, which is checked before any state dispatch.

use anyhow::Result;
use chrono::NaiveDateTime;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, ParseMode};
use tracing::warn;

use crate::bot::ui;
use crate::bot::App;
use crate::callback::{AdminAction, CallbackData};
use crate::db::{self, Collection, Product, ProductStatus, User, UserLevel, UserStatus};
use crate::localization::{t, t_args};
use crate::state::{AdminState, MediaRef, ProductDraft, ProductField};
use crate::text_utils;

/// Per-message card caps; longer lists split into several messages.
const USERS_PER_LIST_MESSAGE: usize = 15;
const USERS_PER_LEVEL_MESSAGE: usize = 8;

pub async fn handle_message(bot: &Bot, app: &App, msg: &Message, telegram_id: i64) -> Result<()> {
    let chat_id = msg.chat.id;
    let text = msg.text().unwrap_or("");

    // The back buttons escape any wizard, bypassing its validation.
    if text == t("btn-back-main") {
        app.admin_states.clear(telegram_id);
        return show_main_menu(bot, chat_id).await;
    }
    if text == t("btn-back") {
        app.admin_states.clear(telegram_id);
        return show_admin_menu(bot, chat_id).await;
    }

    if let Some(state) = app.admin_states.get(telegram_id) {
        return handle_state(bot, app, msg, chat_id, telegram_id, text, state).await;
    }

    if text == t("btn-admin-add-product") {
        start_add_product(bot, app, chat_id, telegram_id).await
    } else if text == t("btn-admin-edit-product") {
        app.admin_states.set(telegram_id, AdminState::EditProductCode);
        bot.send_message(chat_id, t("edit-product-start"))
            .parse_mode(ParseMode::Html)
            .await?;
        Ok(())
    } else if text == t("btn-admin-delete-product") {
        app.admin_states
            .set(telegram_id, AdminState::DeleteProductCode);
        bot.send_message(chat_id, t("delete-product-start"))
            .parse_mode(ParseMode::Html)
            .await?;
        Ok(())
    } else if text == t("btn-admin-categories") {
        show_category_management(bot, app, chat_id).await
    } else if text == t("btn-admin-collections") {
        show_collection_management(bot, app, chat_id).await
    } else if text == t("btn-admin-weight-ranges") {
        show_weight_range_management(bot, app, chat_id).await
    } else if text == t("btn-admin-wage-ranges") {
        show_wage_range_management(bot, app, chat_id).await
    } else if text == t("btn-admin-approve-users") {
        show_pending_users(bot, app, chat_id).await
    } else if text == t("btn-admin-user-list") {
        show_users_list(bot, app, chat_id).await
    } else if text == t("btn-admin-user-levels") {
        show_user_level_management(bot, app, chat_id).await
    } else if text == t("btn-admin-contact") {
        show_contact_management(bot, app, chat_id).await
    } else {
        // Includes /admin, the panel button and anything unmatched.
        ensure_operator_user(app, msg, telegram_id).await?;
        show_admin_menu(bot, chat_id).await
    }
}

/// Operators browse the storefront with the same account; give them a user
/// row on first panel open so the shopping flows treat them as registered.
async fn ensure_operator_user(app: &App, msg: &Message, telegram_id: i64) -> Result<()> {
    let conn = app.conn.lock().await;
    if db::find_user_by_telegram_id(&conn, telegram_id)?.is_none() {
        let (first_name, last_name) = match &msg.from {
            Some(from) => (
                from.first_name.clone(),
                from.last_name.clone().unwrap_or_default(),
            ),
            None => (String::new(), String::new()),
        };
        db::create_user(&conn, telegram_id, &first_name, &last_name)?;
    }
    Ok(())
}

pub async fn handle_callback(bot: &Bot, app: &App, q: &CallbackQuery) -> Result<()> {
    let telegram_id = q.from.id.0.cast_signed();
    let chat_id = match &q.message {
        Some(message) => message.chat().id,
        None => return Ok(()),
    };
    let action = match q.data.as_deref().and_then(AdminAction::decode) {
        Some(action) => action,
        None => return Ok(()),
    };

    match action {
        AdminAction::AdminMenu => {
            // Back buttons across the panel land here; any wizard in
            // progress is abandoned.
            app.admin_states.clear(telegram_id);
            show_admin_menu(bot, chat_id).await
        }
        AdminAction::CancelAddProduct => {
            app.admin_states.clear(telegram_id);
            bot.send_message(chat_id, t("add-product-cancelled")).await?;
            show_admin_menu(bot, chat_id).await
        }
        AdminAction::CategorySelect { category_id } => {
            let Some(AdminState::AddProductCategory { mut draft }) =
                app.admin_states.get(telegram_id)
            else {
                return Ok(());
            };
            draft.category_id = Some(category_id);
            app.admin_states
                .set(telegram_id, AdminState::AddProductCollection { draft });
            ask_for_collection(bot, app, chat_id, category_id).await
        }
        AdminAction::CollectionSelect { collection_id } => {
            let Some(AdminState::AddProductCollection { mut draft }) =
                app.admin_states.get(telegram_id)
            else {
                return Ok(());
            };
            match collection_id {
                Some(collection_id) => {
                    let collection = {
                        let conn = app.conn.lock().await;
                        db::find_collection(&conn, collection_id)?
                    };
                    draft.collection_id = Some(collection_id);
                    draft.collection_wage = collection.and_then(|c| c.wage_percentage);
                }
                None => {
                    draft.collection_id = None;
                    draft.collection_wage = None;
                }
            }
            app.admin_states
                .set(telegram_id, AdminState::AddProductCode { draft });
            bot.send_message(chat_id, t("prompt-product-code-admin")).await?;
            Ok(())
        }
        AdminAction::EditProductField { product_id, field } => {
            ask_for_field_value(bot, app, chat_id, telegram_id, product_id, field).await
        }
        AdminAction::EditCategorySelect {
            product_id,
            category_id,
        } => {
            {
                let conn = app.conn.lock().await;
                db::update_product_category(&conn, product_id, category_id)?;
            }
            app.admin_states.clear(telegram_id);
            bot.send_message(chat_id, t("product-updated")).await?;
            show_admin_menu(bot, chat_id).await
        }
        AdminAction::EditCollectionSelect {
            product_id,
            collection_id,
        } => {
            {
                let conn = app.conn.lock().await;
                db::update_product_collection(&conn, product_id, collection_id)?;
            }
            app.admin_states.clear(telegram_id);
            bot.send_message(chat_id, t("product-updated")).await?;
            show_admin_menu(bot, chat_id).await
        }
        AdminAction::DeleteProduct { product_id } => {
            let deleted = {
                let conn = app.conn.lock().await;
                db::delete_product(&conn, product_id)?
            };
            let key = if deleted { "product-deleted" } else { "product-not-found" };
            bot.send_message(chat_id, t(key)).await?;
            show_admin_menu(bot, chat_id).await
        }
        AdminAction::DisableProduct { product_id } => {
            {
                let conn = app.conn.lock().await;
                db::set_product_status(&conn, product_id, ProductStatus::Inactive)?;
            }
            bot.send_message(chat_id, t("product-disabled")).await?;
            show_admin_menu(bot, chat_id).await
        }
        AdminAction::AddCategory => {
            app.admin_states.set(telegram_id, AdminState::AddCategoryName);
            bot.send_message(chat_id, t("prompt-category-name")).await?;
            Ok(())
        }
        AdminAction::DeleteCategory { category_id } => {
            let deleted = {
                let conn = app.conn.lock().await;
                db::delete_category(&conn, category_id)?
            };
            let key = if deleted { "category-deleted" } else { "category-delete-failed" };
            bot.send_message(chat_id, t(key)).await?;
            show_category_management(bot, app, chat_id).await
        }
        AdminAction::AddCollection => ask_for_collection_category(bot, app, chat_id).await,
        AdminAction::SelectCollectionCategory { category_id } => {
            app.admin_states
                .set(telegram_id, AdminState::AddCollectionName { category_id });
            bot.send_message(chat_id, t("prompt-collection-name")).await?;
            Ok(())
        }
        AdminAction::SetCollectionWage { collection_id } => {
            app.admin_states
                .set(telegram_id, AdminState::SetCollectionWage { collection_id });
            bot.send_message(chat_id, t("prompt-collection-wage")).await?;
            Ok(())
        }
        AdminAction::DeleteCollection { collection_id } => {
            {
                let conn = app.conn.lock().await;
                db::delete_collection(&conn, collection_id)?;
            }
            bot.send_message(chat_id, t("collection-deleted")).await?;
            show_collection_management(bot, app, chat_id).await
        }
        AdminAction::AddWeightRange => {
            app.admin_states
                .set(telegram_id, AdminState::AddWeightRangeName);
            bot.send_message(chat_id, t("prompt-weight-range-name")).await?;
            Ok(())
        }
        AdminAction::WeightRangeCategorySelect { category_id } => {
            let Some(AdminState::AddWeightRangeMin { name, .. }) =
                app.admin_states.get(telegram_id)
            else {
                return Ok(());
            };
            app.admin_states
                .set(telegram_id, AdminState::AddWeightRangeMin { name, category_id });
            bot.send_message(chat_id, t("prompt-weight-range-min")).await?;
            Ok(())
        }
        AdminAction::DeleteWeightRange { range_id } => {
            {
                let conn = app.conn.lock().await;
                db::delete_weight_range(&conn, range_id)?;
            }
            bot.send_message(chat_id, t("weight-range-deleted")).await?;
            show_weight_range_management(bot, app, chat_id).await
        }
        AdminAction::AddWageRange => {
            app.admin_states
                .set(telegram_id, AdminState::AddWageRangeName);
            bot.send_message(chat_id, t("prompt-wage-range-name")).await?;
            Ok(())
        }
        AdminAction::WageRangeCategorySelect { category_id } => {
            let Some(AdminState::AddWageRangeMin { name, .. }) = app.admin_states.get(telegram_id)
            else {
                return Ok(());
            };
            app.admin_states
                .set(telegram_id, AdminState::AddWageRangeMin { name, category_id });
            bot.send_message(chat_id, t("prompt-wage-range-min")).await?;
            Ok(())
        }
        AdminAction::DeleteWageRange { range_id } => {
            {
                let conn = app.conn.lock().await;
                db::delete_wage_range(&conn, range_id)?;
            }
            bot.send_message(chat_id, t("wage-range-deleted")).await?;
            show_wage_range_management(bot, app, chat_id).await
        }
        AdminAction::ApproveUser { telegram_id: target } => {
            moderate_user(bot, app, chat_id, target, UserStatus::Approved).await
        }
        AdminAction::RejectUser { telegram_id: target } => {
            moderate_user(bot, app, chat_id, target, UserStatus::Rejected).await
        }
        AdminAction::ManageUserLevel { telegram_id: target } => {
            show_user_level_options(bot, app, chat_id, target).await
        }
        AdminAction::SetUserLevel {
            telegram_id: target,
            level,
        } => set_user_level(bot, app, chat_id, target, &level).await,
        AdminAction::SearchUserLevel => {
            app.admin_states.set(telegram_id, AdminState::SearchUserQuery);
            bot.send_message(chat_id, t("user-search-title"))
                .parse_mode(ParseMode::Html)
                .reply_markup(ui::back_keyboard())
                .await?;
            Ok(())
        }
        AdminAction::ClearUserSearch => {
            app.admin_states.clear(telegram_id);
            show_user_level_management(bot, app, chat_id).await
        }
        AdminAction::DeleteUser { telegram_id: target } => {
            confirm_delete_user(bot, app, chat_id, target).await
        }
        AdminAction::ConfirmDeleteUserYes { telegram_id: target } => {
            delete_user(bot, app, chat_id, target).await
        }
        AdminAction::ConfirmDeleteUserNo => show_users_list(bot, app, chat_id).await,
        AdminAction::EditContactAddress => {
            let contact = {
                let conn = app.conn.lock().await;
                db::get_contact_info(&conn)?
            };
            app.admin_states.set(
                telegram_id,
                AdminState::EditContactAddress {
                    phone: contact.phone,
                },
            );
            bot.send_message(
                chat_id,
                t_args("edit-address-title", &[("address", contact.address)]),
            )
            .parse_mode(ParseMode::Html)
            .await?;
            Ok(())
        }
        AdminAction::EditContactPhone => {
            let contact = {
                let conn = app.conn.lock().await;
                db::get_contact_info(&conn)?
            };
            app.admin_states.set(
                telegram_id,
                AdminState::EditContactPhone {
                    address: contact.address,
                },
            );
            bot.send_message(chat_id, t_args("edit-phone-title", &[("phone", contact.phone)]))
                .parse_mode(ParseMode::Html)
                .await?;
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Wizard states

async fn handle_state(
    bot: &Bot,
    app: &App,
    msg: &Message,
    chat_id: ChatId,
    telegram_id: i64,
    text: &str,
    state: AdminState,
) -> Result<()> {
    match state {
        AdminState::AddProductMedia => match capture_media(msg) {
            Some(media) => {
                let draft = ProductDraft {
                    media: Some(media),
                    ..Default::default()
                };
                app.admin_states
                    .set(telegram_id, AdminState::AddProductCategory { draft });
                ask_for_category(bot, app, chat_id).await
            }
            None => {
                bot.send_message(chat_id, t("add-product-need-media"))
                    .reply_markup(ui::single_column(vec![(
                        t("btn-cancel"),
                        "cancel_add_product".to_string(),
                    )]))
                    .await?;
                Ok(())
            }
        },
        AdminState::AddProductCategory { .. } => ask_for_category(bot, app, chat_id).await,
        AdminState::AddProductCollection { mut draft } => {
            // "0" typed instead of tapped skips the collection.
            if text_utils::normalize_digits(text.trim()) == "0" {
                draft.collection_id = None;
                draft.collection_wage = None;
                app.admin_states
                    .set(telegram_id, AdminState::AddProductCode { draft });
                bot.send_message(chat_id, t("prompt-product-code-admin")).await?;
            } else {
                bot.send_message(chat_id, t("use-collection-buttons")).await?;
            }
            Ok(())
        }
        AdminState::AddProductCode { mut draft } => {
            let code = match text_utils::validate_product_code(text) {
                Some(code) => code,
                None => {
                    bot.send_message(chat_id, t("invalid-product-code")).await?;
                    return Ok(());
                }
            };
            let duplicate = {
                let conn = app.conn.lock().await;
                db::find_product_by_code_any_status(&conn, &code)?.is_some()
            };
            if duplicate {
                bot.send_message(chat_id, t("duplicate-product-code")).await?;
                return Ok(());
            }
            draft.product_code = Some(code);

            match draft.collection_wage {
                Some(wage) => {
                    app.admin_states
                        .set(telegram_id, AdminState::AddProductWeight { draft });
                    bot.send_message(
                        chat_id,
                        t_args("wage-from-collection", &[("wage", ui::format_number(wage))]),
                    )
                    .await?;
                    bot.send_message(chat_id, t("prompt-product-weight")).await?;
                }
                None => {
                    app.admin_states
                        .set(telegram_id, AdminState::AddProductWage { draft });
                    bot.send_message(chat_id, t("prompt-product-wage")).await?;
                }
            }
            Ok(())
        }
        AdminState::AddProductWage { mut draft } => match parse_number(text) {
            Some(wage) => {
                draft.wage_percentage = Some(wage);
                app.admin_states
                    .set(telegram_id, AdminState::AddProductWeight { draft });
                bot.send_message(chat_id, t("prompt-product-weight")).await?;
                Ok(())
            }
            None => {
                bot.send_message(chat_id, t("invalid-product-wage")).await?;
                Ok(())
            }
        },
        AdminState::AddProductWeight { draft } => match parse_number(text) {
            Some(weight) => finish_add_product(bot, app, chat_id, telegram_id, draft, weight).await,
            None => {
                bot.send_message(chat_id, t("invalid-product-weight")).await?;
                Ok(())
            }
        },
        AdminState::EditProductCode => {
            let product = find_product_for_admin(app, text).await?;
            match product {
                Some(product) => {
                    app.admin_states.clear(telegram_id);
                    show_product_edit_options(bot, app, chat_id, &product).await
                }
                None => {
                    bot.send_message(chat_id, t("product-not-found-by-code")).await?;
                    Ok(())
                }
            }
        }
        AdminState::EditProductValue { product_id, field } => {
            update_product_field(bot, app, msg, chat_id, telegram_id, product_id, field, text)
                .await
        }
        AdminState::DeleteProductCode => {
            let product = find_product_for_admin(app, text).await?;
            match product {
                Some(product) => {
                    app.admin_states.clear(telegram_id);
                    confirm_delete_product(bot, chat_id, &product).await
                }
                None => {
                    bot.send_message(chat_id, t("product-not-found-by-code")).await?;
                    Ok(())
                }
            }
        }
        AdminState::AddCategoryName => {
            let name = text.trim();
            let duplicate = {
                let conn = app.conn.lock().await;
                db::find_category_by_name(&conn, name)?.is_some()
            };
            if name.is_empty() || duplicate {
                bot.send_message(chat_id, t("duplicate-category")).await?;
                return Ok(());
            }
            {
                let conn = app.conn.lock().await;
                db::create_category(&conn, name)?;
            }
            app.admin_states.clear(telegram_id);
            bot.send_message(chat_id, t_args("category-added", &[("name", name.to_string())]))
                .await?;
            show_category_management(bot, app, chat_id).await
        }
        AdminState::AddCollectionName { category_id } => {
            let name = text.trim();
            let duplicate = {
                let conn = app.conn.lock().await;
                db::find_collection_by_name(&conn, name)?.is_some()
            };
            if name.is_empty() || duplicate {
                bot.send_message(chat_id, t("duplicate-collection")).await?;
                return Ok(());
            }
            app.admin_states.set(
                telegram_id,
                AdminState::AddCollectionWage {
                    name: name.to_string(),
                    category_id,
                },
            );
            bot.send_message(chat_id, t("prompt-collection-wage-new")).await?;
            Ok(())
        }
        AdminState::AddCollectionWage { name, category_id } => {
            // Zero or non-numeric input means "no stored wage".
            let wage = parse_number(text).filter(|w| *w > 0.0);
            {
                let conn = app.conn.lock().await;
                db::create_collection(&conn, &name, category_id, wage)?;
            }
            app.admin_states.clear(telegram_id);
            let suffix = match wage {
                Some(wage) => t_args(
                    "collection-added-with-wage",
                    &[("wage", ui::format_number(wage))],
                ),
                None => t("collection-added-no-wage"),
            };
            bot.send_message(
                chat_id,
                t_args("collection-added", &[("name", name), ("wage", suffix)]),
            )
            .await?;
            show_collection_management(bot, app, chat_id).await
        }
        AdminState::SetCollectionWage { collection_id } => {
            let wage = parse_number(text).filter(|w| *w > 0.0);
            let name = {
                let conn = app.conn.lock().await;
                db::update_collection_wage(&conn, collection_id, wage)?;
                db::find_collection(&conn, collection_id)?
                    .map(|c| c.name)
                    .unwrap_or_default()
            };
            app.admin_states.clear(telegram_id);
            let shown = match wage {
                Some(wage) => format!("{}%", ui::format_number(wage)),
                None => t("collection-wage-removed"),
            };
            bot.send_message(
                chat_id,
                t_args("collection-wage-set", &[("name", name), ("wage", shown)]),
            )
            .await?;
            show_collection_management(bot, app, chat_id).await
        }
        AdminState::AddWeightRangeName => {
            let name = text.trim();
            if name.is_empty() {
                bot.send_message(chat_id, t("empty-weight-range-name")).await?;
                return Ok(());
            }
            app.admin_states.set(
                telegram_id,
                AdminState::AddWeightRangeMin {
                    name: name.to_string(),
                    category_id: None,
                },
            );
            ask_for_range_category(bot, app, chat_id, "weight_range_category_select").await
        }
        AdminState::AddWeightRangeMin { name, category_id } => match parse_number(text) {
            Some(min) => {
                app.admin_states.set(
                    telegram_id,
                    AdminState::AddWeightRangeMax {
                        name,
                        category_id,
                        min,
                    },
                );
                bot.send_message(chat_id, t("prompt-weight-range-max")).await?;
                Ok(())
            }
            None => {
                bot.send_message(chat_id, t("invalid-weight-range-min")).await?;
                Ok(())
            }
        },
        AdminState::AddWeightRangeMax {
            name,
            category_id,
            min,
        } => {
            let max = match parse_number(text) {
                Some(max) => max,
                None => {
                    bot.send_message(chat_id, t("invalid-weight-range-max")).await?;
                    return Ok(());
                }
            };
            if !text_utils::valid_range_bounds(min, max) {
                bot.send_message(chat_id, t("weight-range-max-too-small")).await?;
                return Ok(());
            }
            {
                let conn = app.conn.lock().await;
                db::create_weight_range(&conn, &name, category_id, min, max)?;
            }
            app.admin_states.clear(telegram_id);
            bot.send_message(
                chat_id,
                t_args(
                    "weight-range-added",
                    &[
                        ("name", name),
                        ("min", ui::format_number(min)),
                        ("max", ui::format_number(max)),
                    ],
                ),
            )
            .await?;
            show_weight_range_management(bot, app, chat_id).await
        }
        AdminState::AddWageRangeName => {
            let name = text.trim();
            if name.is_empty() {
                bot.send_message(chat_id, t("empty-wage-range-name")).await?;
                return Ok(());
            }
            app.admin_states.set(
                telegram_id,
                AdminState::AddWageRangeMin {
                    name: name.to_string(),
                    category_id: None,
                },
            );
            ask_for_range_category(bot, app, chat_id, "wage_range_category_select").await
        }
        AdminState::AddWageRangeMin { name, category_id } => match parse_number(text) {
            Some(min) => {
                app.admin_states.set(
                    telegram_id,
                    AdminState::AddWageRangeMax {
                        name,
                        category_id,
                        min,
                    },
                );
                bot.send_message(chat_id, t("prompt-wage-range-max")).await?;
                Ok(())
            }
            None => {
                bot.send_message(chat_id, t("invalid-wage-range-min")).await?;
                Ok(())
            }
        },
        AdminState::AddWageRangeMax {
            name,
            category_id,
            min,
        } => {
            let max = match parse_number(text) {
                Some(max) => max,
                None => {
                    bot.send_message(chat_id, t("invalid-wage-range-max")).await?;
                    return Ok(());
                }
            };
            if !text_utils::valid_range_bounds(min, max) {
                bot.send_message(chat_id, t("wage-range-max-too-small")).await?;
                return Ok(());
            }
            {
                let conn = app.conn.lock().await;
                db::create_wage_range(&conn, &name, category_id, min, max)?;
            }
            app.admin_states.clear(telegram_id);
            bot.send_message(
                chat_id,
                t_args(
                    "wage-range-added",
                    &[
                        ("name", name),
                        ("min", ui::format_number(min)),
                        ("max", ui::format_number(max)),
                    ],
                ),
            )
            .await?;
            show_wage_range_management(bot, app, chat_id).await
        }
        AdminState::SearchUserQuery => {
            let query = text.trim();
            if query.is_empty() {
                bot.send_message(chat_id, t("empty-search-query")).await?;
                return Ok(());
            }
            let users = {
                let conn = app.conn.lock().await;
                db::search_users(&conn, query)?
            };
            app.admin_states.clear(telegram_id);

            if users.is_empty() {
                let keyboard = InlineKeyboardMarkup::new(vec![vec![
                    InlineKeyboardButton::callback(t("btn-search-again"), "search_user_level"),
                    InlineKeyboardButton::callback(t("btn-back"), "clear_user_search"),
                ]]);
                bot.send_message(
                    chat_id,
                    t_args("no-search-results", &[("query", query.to_string())]),
                )
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboard)
                .await?;
                return Ok(());
            }
            show_user_search_results(bot, chat_id, &users, query).await
        }
        AdminState::EditContactAddress { phone } => {
            if text.trim().is_empty() {
                bot.send_message(chat_id, t("empty-address")).await?;
                return Ok(());
            }
            {
                let conn = app.conn.lock().await;
                db::update_contact_info(&conn, text, &phone)?;
            }
            app.admin_states.clear(telegram_id);
            bot.send_message(
                chat_id,
                t_args("address-updated", &[("address", text.to_string())]),
            )
            .parse_mode(ParseMode::Html)
            .await?;
            show_contact_management(bot, app, chat_id).await
        }
        AdminState::EditContactPhone { address } => {
            if text.trim().is_empty() {
                bot.send_message(chat_id, t("empty-phone")).await?;
                return Ok(());
            }
            {
                let conn = app.conn.lock().await;
                db::update_contact_info(&conn, &address, text)?;
            }
            app.admin_states.clear(telegram_id);
            bot.send_message(chat_id, t_args("phone-updated", &[("phone", text.to_string())]))
                .parse_mode(ParseMode::Html)
                .await?;
            show_contact_management(bot, app, chat_id).await
        }
    }
}

// ---------------------------------------------------------------------------
// Add / edit / delete product

async fn start_add_product(bot: &Bot, app: &App, chat_id: ChatId, telegram_id: i64) -> Result<()> {
    app.admin_states.set(telegram_id, AdminState::AddProductMedia);
    bot.send_message(chat_id, t("add-product-start"))
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

/// The media slots are mutually exclusive; photos keep only the largest size.
fn capture_media(msg: &Message) -> Option<MediaRef> {
    if let Some(largest) = msg.photo().and_then(|photos| photos.last()) {
        return Some(MediaRef::Photo(largest.file.id.to_string()));
    }
    if let Some(video) = msg.video() {
        return Some(MediaRef::Video(video.file.id.to_string()));
    }
    if let Some(animation) = msg.animation() {
        return Some(MediaRef::Animation(animation.file.id.to_string()));
    }
    None
}

async fn finish_add_product(
    bot: &Bot,
    app: &App,
    chat_id: ChatId,
    telegram_id: i64,
    draft: ProductDraft,
    weight: f64,
) -> Result<()> {
    let (Some(media), Some(category_id), Some(code)) =
        (draft.media, draft.category_id, draft.product_code)
    else {
        // A hole in the draft means the wizard was bypassed; start over.
        app.admin_states.clear(telegram_id);
        return show_admin_menu(bot, chat_id).await;
    };
    let wage = draft.wage_percentage.or(draft.collection_wage);

    {
        let conn = app.conn.lock().await;
        // The product name defaults to its code; operators rename later
        // through the edit wizard.
        db::create_product(
            &conn,
            &code,
            &code,
            &media.into(),
            category_id,
            draft.collection_id,
            wage,
            Some(weight),
        )?;
    }
    app.admin_states.clear(telegram_id);

    let text = format!(
        "{}\n\n{}",
        t("product-added"),
        t_args("product-summary-code", &[("code", code)])
    );
    bot.send_message(chat_id, text).await?;
    show_admin_menu(bot, chat_id).await
}

async fn find_product_for_admin(app: &App, code: &str) -> Result<Option<Product>> {
    let normalized = text_utils::normalize_digits(code.trim());
    let conn = app.conn.lock().await;
    db::find_product_by_code_any_status(&conn, &normalized)
}

async fn show_product_edit_options(
    bot: &Bot,
    app: &App,
    chat_id: ChatId,
    product: &Product,
) -> Result<()> {
    let (category_name, collection_name) = {
        let conn = app.conn.lock().await;
        let category_name = db::find_category(&conn, product.category_id)?.map(|c| c.name);
        let collection_name = match product.collection_id {
            Some(collection_id) => db::find_collection(&conn, collection_id)?.map(|c| c.name),
            None => None,
        };
        (category_name, collection_name)
    };

    let mut lines = vec![
        t("edit-product-title"),
        String::new(),
        t_args("product-summary-code", &[("code", product.product_code.clone())]),
        t_args("product-summary-name", &[("name", product.name.clone())]),
    ];
    if let Some(category) = category_name {
        lines.push(t_args("product-summary-category", &[("category", category)]));
    }
    if let Some(collection) = collection_name {
        lines.push(t_args("product-summary-collection", &[("collection", collection)]));
    }
    if let Some(wage) = product.wage_percentage {
        lines.push(t_args("product-summary-wage", &[("wage", ui::format_number(wage))]));
    }
    if let Some(weight) = product.weight {
        lines.push(t_args(
            "product-summary-weight",
            &[("weight", ui::format_number(weight))],
        ));
    }
    lines.push(String::new());
    lines.push(t("edit-pick-field"));

    let id = product.id.to_string();
    let field_button = |label: &str, field: ProductField| {
        (
            t(label),
            CallbackData::encode("edit_product_field", &[&id, field.as_str()]),
        )
    };
    let keyboard = ui::single_column(vec![
        field_button("btn-edit-field-code", ProductField::Code),
        field_button("btn-edit-field-name", ProductField::Name),
        field_button("btn-edit-field-category", ProductField::Category),
        field_button("btn-edit-field-collection", ProductField::Collection),
        field_button("btn-edit-field-wage", ProductField::Wage),
        field_button("btn-edit-field-weight", ProductField::Weight),
        field_button("btn-edit-field-image", ProductField::Image),
        (t("btn-back"), "admin_menu".to_string()),
    ]);

    bot.send_message(chat_id, lines.join("\n"))
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard)
        .await?;
    Ok(())
}

async fn ask_for_field_value(
    bot: &Bot,
    app: &App,
    chat_id: ChatId,
    telegram_id: i64,
    product_id: i64,
    field: ProductField,
) -> Result<()> {
    app.admin_states
        .set(telegram_id, AdminState::EditProductValue { product_id, field });

    match field {
        ProductField::Category => {
            let categories = {
                let conn = app.conn.lock().await;
                db::list_categories(&conn)?
            };
            let id = product_id.to_string();
            let mut buttons: Vec<(String, String)> = categories
                .iter()
                .map(|category| {
                    (
                        category.name.clone(),
                        CallbackData::encode(
                            "edit_category_select",
                            &[&id, &category.id.to_string()],
                        ),
                    )
                })
                .collect();
            buttons.push((t("btn-back"), "admin_menu".to_string()));
            bot.send_message(chat_id, t("edit-pick-new-category"))
                .reply_markup(ui::single_column(buttons))
                .await?;
        }
        ProductField::Collection => {
            let collections = {
                let conn = app.conn.lock().await;
                let category_id = db::find_product(&conn, product_id)?.map(|p| p.category_id);
                db::list_collections(&conn, category_id)?
            };
            let id = product_id.to_string();
            let mut text = t("edit-pick-new-collection");
            if collections.is_empty() {
                text = format!("{}\n\n{}", text, t("no-collections-warning"));
            }
            let mut buttons: Vec<(String, String)> = collections
                .iter()
                .map(|collection| {
                    (
                        collection.name.clone(),
                        CallbackData::encode(
                            "edit_collection_select",
                            &[&id, &collection.id.to_string()],
                        ),
                    )
                })
                .collect();
            buttons.push((
                t("btn-remove-collection"),
                CallbackData::encode("edit_collection_select", &[&id, "0"]),
            ));
            buttons.push((t("btn-back"), "admin_menu".to_string()));
            bot.send_message(chat_id, text)
                .reply_markup(ui::single_column(buttons))
                .await?;
        }
        ProductField::Code => {
            bot.send_message(chat_id, t("edit-prompt-code")).await?;
        }
        ProductField::Name => {
            bot.send_message(chat_id, t("edit-prompt-name")).await?;
        }
        ProductField::Wage => {
            bot.send_message(chat_id, t("edit-prompt-wage")).await?;
        }
        ProductField::Weight => {
            bot.send_message(chat_id, t("edit-prompt-weight")).await?;
        }
        ProductField::Image => {
            bot.send_message(chat_id, t("edit-prompt-image")).await?;
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn update_product_field(
    bot: &Bot,
    app: &App,
    msg: &Message,
    chat_id: ChatId,
    telegram_id: i64,
    product_id: i64,
    field: ProductField,
    text: &str,
) -> Result<()> {
    match field {
        ProductField::Code => {
            let code = match text_utils::validate_product_code(text) {
                Some(code) => code,
                None => {
                    bot.send_message(chat_id, t("invalid-product-code")).await?;
                    return Ok(());
                }
            };
            // Re-saving the product's own code is not a collision.
            let duplicate = {
                let conn = app.conn.lock().await;
                db::find_product_by_code_any_status(&conn, &code)?
                    .is_some_and(|existing| existing.id != product_id)
            };
            if duplicate {
                bot.send_message(chat_id, t("duplicate-product-code")).await?;
                return Ok(());
            }
            let conn = app.conn.lock().await;
            db::update_product_code(&conn, product_id, &code)?;
        }
        ProductField::Name => {
            if text.trim().is_empty() {
                bot.send_message(chat_id, t("edit-empty-name")).await?;
                return Ok(());
            }
            let conn = app.conn.lock().await;
            db::update_product_name(&conn, product_id, text)?;
        }
        ProductField::Category => {
            // Normally picked via buttons; a typed id still works.
            let category_id = match text_utils::normalize_digits(text.trim()).parse::<i64>() {
                Ok(category_id) => category_id,
                Err(_) => {
                    bot.send_message(chat_id, t("edit-prompt-new-value")).await?;
                    return Ok(());
                }
            };
            let conn = app.conn.lock().await;
            db::update_product_category(&conn, product_id, category_id)?;
        }
        ProductField::Collection => {
            let normalized = text_utils::normalize_digits(text.trim());
            let collection_id = if normalized == "0" {
                None
            } else {
                match normalized.parse::<i64>() {
                    Ok(collection_id) => Some(collection_id),
                    Err(_) => {
                        bot.send_message(chat_id, t("edit-prompt-new-value")).await?;
                        return Ok(());
                    }
                }
            };
            let conn = app.conn.lock().await;
            db::update_product_collection(&conn, product_id, collection_id)?;
        }
        ProductField::Wage => {
            let wage = match parse_number(text) {
                Some(wage) => wage,
                None => {
                    bot.send_message(chat_id, t("invalid-product-wage")).await?;
                    return Ok(());
                }
            };
            let conn = app.conn.lock().await;
            db::update_product_wage(&conn, product_id, wage)?;
        }
        ProductField::Weight => {
            let weight = match parse_number(text) {
                Some(weight) => weight,
                None => {
                    bot.send_message(chat_id, t("invalid-product-weight")).await?;
                    return Ok(());
                }
            };
            let conn = app.conn.lock().await;
            db::update_product_weight(&conn, product_id, weight)?;
        }
        ProductField::Image => {
            let media = match capture_media(msg) {
                Some(media) => media,
                None => {
                    bot.send_message(chat_id, t("edit-need-media")).await?;
                    return Ok(());
                }
            };
            let conn = app.conn.lock().await;
            db::update_product_media(&conn, product_id, &media.into())?;
        }
    }

    app.admin_states.clear(telegram_id);
    bot.send_message(chat_id, t("product-updated")).await?;
    show_admin_menu(bot, chat_id).await
}

async fn confirm_delete_product(bot: &Bot, chat_id: ChatId, product: &Product) -> Result<()> {
    let id = product.id.to_string();
    let keyboard = ui::single_column(vec![
        (
            t("btn-delete-hard"),
            CallbackData::encode("delete_product", &[&id]),
        ),
        (
            t("btn-disable"),
            CallbackData::encode("disable_product", &[&id]),
        ),
        (t("btn-cancel"), "admin_menu".to_string()),
    ]);
    bot.send_message(
        chat_id,
        t_args(
            "delete-product-confirm",
            &[("code", product.product_code.clone())],
        ),
    )
    .parse_mode(ParseMode::Html)
    .reply_markup(keyboard)
    .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Pickers

async fn ask_for_category(bot: &Bot, app: &App, chat_id: ChatId) -> Result<()> {
    let categories = {
        let conn = app.conn.lock().await;
        db::list_categories(&conn)?
    };
    let buttons: Vec<(String, String)> = categories
        .iter()
        .map(|category| {
            (
                category.name.clone(),
                CallbackData::encode("category_select", &[&category.id.to_string()]),
            )
        })
        .collect();
    bot.send_message(chat_id, t("pick-category"))
        .reply_markup(ui::single_column(buttons))
        .await?;
    Ok(())
}

async fn ask_for_collection(bot: &Bot, app: &App, chat_id: ChatId, category_id: i64) -> Result<()> {
    let collections = {
        let conn = app.conn.lock().await;
        db::list_collections(&conn, Some(category_id))?
    };
    let mut text = t("pick-collection-optional");
    if collections.is_empty() {
        text = format!("{}\n\n{}", text, t("no-collections-warning"));
    }
    let mut buttons: Vec<(String, String)> = collections
        .iter()
        .map(|collection| {
            (
                collection.name.clone(),
                CallbackData::encode("collection_select", &[&collection.id.to_string()]),
            )
        })
        .collect();
    buttons.push((t("btn-skip"), "collection_select:0".to_string()));
    bot.send_message(chat_id, text)
        .reply_markup(ui::single_column(buttons))
        .await?;
    Ok(())
}

async fn ask_for_collection_category(bot: &Bot, app: &App, chat_id: ChatId) -> Result<()> {
    let categories = {
        let conn = app.conn.lock().await;
        db::list_categories(&conn)?
    };
    let mut buttons: Vec<(String, String)> = categories
        .iter()
        .map(|category| {
            (
                category.name.clone(),
                CallbackData::encode("select_collection_category", &[&category.id.to_string()]),
            )
        })
        .collect();
    buttons.push((t("btn-no-category"), "select_collection_category:0".to_string()));
    bot.send_message(chat_id, t("pick-collection-category"))
        .reply_markup(ui::single_column(buttons))
        .await?;
    Ok(())
}

async fn ask_for_range_category(
    bot: &Bot,
    app: &App,
    chat_id: ChatId,
    action: &str,
) -> Result<()> {
    let categories = {
        let conn = app.conn.lock().await;
        db::list_categories(&conn)?
    };
    let mut buttons: Vec<(String, String)> = categories
        .iter()
        .map(|category| {
            (
                category.name.clone(),
                CallbackData::encode(action, &[&category.id.to_string()]),
            )
        })
        .collect();
    buttons.push((t("btn-no-category"), CallbackData::encode(action, &["0"])));
    bot.send_message(chat_id, t("pick-range-category-optional"))
        .reply_markup(ui::single_column(buttons))
        .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Catalog management views

async fn show_category_management(bot: &Bot, app: &App, chat_id: ChatId) -> Result<()> {
    let categories = {
        let conn = app.conn.lock().await;
        db::list_categories(&conn)?
    };

    let mut text = format!("{}\n\n", t("manage-categories-title"));
    if categories.is_empty() {
        text.push_str(&t("no-categories-admin"));
        text.push('\n');
    } else {
        for category in &categories {
            text.push_str(&t_args("category-row", &[("name", category.name.clone())]));
            text.push('\n');
        }
    }

    let mut buttons: Vec<(String, String)> = categories
        .iter()
        .map(|category| {
            (
                t_args("btn-delete-named", &[("name", category.name.clone())]),
                CallbackData::encode("delete_category", &[&category.id.to_string()]),
            )
        })
        .collect();
    buttons.push((t("btn-add-category"), "add_category".to_string()));
    buttons.push((t("btn-back"), "admin_menu".to_string()));

    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(ui::single_column(buttons))
        .await?;
    Ok(())
}

fn collection_row(collection: &Collection, category_name: Option<&str>) -> String {
    let category = match category_name {
        Some(name) => t_args("collection-row-category", &[("category", name.to_string())]),
        None => String::new(),
    };
    let wage = match collection.wage_percentage {
        Some(wage) => t_args("collection-row-wage", &[("wage", ui::format_number(wage))]),
        None => String::new(),
    };
    t_args(
        "collection-row",
        &[
            ("name", collection.name.clone()),
            ("category", category),
            ("wage", wage),
        ],
    )
}

async fn show_collection_management(bot: &Bot, app: &App, chat_id: ChatId) -> Result<()> {
    let (collections, rows) = {
        let conn = app.conn.lock().await;
        let collections = db::list_collections(&conn, None)?;
        let mut rows = Vec::with_capacity(collections.len());
        for collection in &collections {
            let category_name = match collection.category_id {
                Some(category_id) => db::find_category(&conn, category_id)?.map(|c| c.name),
                None => None,
            };
            rows.push(collection_row(collection, category_name.as_deref()));
        }
        (collections, rows)
    };

    let mut text = format!("{}\n\n", t("manage-collections-title"));
    if rows.is_empty() {
        text.push_str(&t("no-collections-admin"));
        text.push('\n');
    } else {
        for row in &rows {
            text.push_str(row);
            text.push('\n');
        }
    }

    let mut keyboard_rows: Vec<Vec<InlineKeyboardButton>> = collections
        .iter()
        .map(|collection| {
            let id = collection.id.to_string();
            vec![
                InlineKeyboardButton::callback(
                    t_args("btn-collection-wage", &[("name", collection.name.clone())]),
                    CallbackData::encode("set_collection_wage", &[&id]),
                ),
                InlineKeyboardButton::callback(
                    t_args("btn-delete-named", &[("name", collection.name.clone())]),
                    CallbackData::encode("delete_collection", &[&id]),
                ),
            ]
        })
        .collect();
    keyboard_rows.push(vec![InlineKeyboardButton::callback(
        t("btn-add-collection"),
        "add_collection",
    )]);
    keyboard_rows.push(vec![InlineKeyboardButton::callback(
        t("btn-back"),
        "admin_menu",
    )]);

    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(InlineKeyboardMarkup::new(keyboard_rows))
        .await?;
    Ok(())
}

async fn show_weight_range_management(bot: &Bot, app: &App, chat_id: ChatId) -> Result<()> {
    let (ranges, scope_names) = {
        let conn = app.conn.lock().await;
        let ranges = db::list_weight_ranges(&conn, None)?;
        let mut scope_names = Vec::with_capacity(ranges.len());
        for range in &ranges {
            scope_names.push(range_scope_names(&conn, range.category_id, range.collection_id)?);
        }
        (ranges, scope_names)
    };

    let mut text = format!("{}\n\n", t("manage-weight-ranges-title"));
    if ranges.is_empty() {
        text.push_str(&t("no-weight-ranges-admin"));
        text.push('\n');
    } else {
        for (range, (category, collection)) in ranges.iter().zip(&scope_names) {
            text.push_str(&t_args("range-row", &[("name", range.name.clone())]));
            text.push('\n');
            text.push_str(&t_args(
                "range-row-weight-bounds",
                &[
                    ("min", ui::format_number(range.min_weight)),
                    ("max", ui::format_number(range.max_weight)),
                ],
            ));
            text.push('\n');
            if let Some(category) = category {
                text.push_str(&t_args("range-row-category", &[("category", category.clone())]));
                text.push('\n');
            }
            if let Some(collection) = collection {
                text.push_str(&t_args(
                    "range-row-collection",
                    &[("collection", collection.clone())],
                ));
                text.push('\n');
            }
            text.push('\n');
        }
    }

    let mut buttons: Vec<(String, String)> = ranges
        .iter()
        .map(|range| {
            let display = t_args(
                "weight-range-display",
                &[
                    ("name", range.name.clone()),
                    ("min", ui::format_number(range.min_weight)),
                    ("max", ui::format_number(range.max_weight)),
                ],
            );
            (
                t_args("btn-delete-named", &[("name", display)]),
                CallbackData::encode("delete_weight_range", &[&range.id.to_string()]),
            )
        })
        .collect();
    buttons.push((t("btn-add-weight-range"), "add_weight_range".to_string()));
    buttons.push((t("btn-back"), "admin_menu".to_string()));

    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(ui::single_column(buttons))
        .await?;
    Ok(())
}

async fn show_wage_range_management(bot: &Bot, app: &App, chat_id: ChatId) -> Result<()> {
    let (ranges, scope_names) = {
        let conn = app.conn.lock().await;
        let ranges = db::list_wage_ranges(&conn, None)?;
        let mut scope_names = Vec::with_capacity(ranges.len());
        for range in &ranges {
            scope_names.push(range_scope_names(&conn, range.category_id, range.collection_id)?);
        }
        (ranges, scope_names)
    };

    let mut text = format!("{}\n\n", t("manage-wage-ranges-title"));
    if ranges.is_empty() {
        text.push_str(&t("no-wage-ranges-admin"));
        text.push('\n');
    } else {
        for (range, (category, collection)) in ranges.iter().zip(&scope_names) {
            text.push_str(&t_args("range-row", &[("name", range.name.clone())]));
            text.push('\n');
            text.push_str(&t_args(
                "range-row-wage-bounds",
                &[
                    ("min", ui::format_number(range.min_wage)),
                    ("max", ui::format_number(range.max_wage)),
                ],
            ));
            text.push('\n');
            if let Some(category) = category {
                text.push_str(&t_args("range-row-category", &[("category", category.clone())]));
                text.push('\n');
            }
            if let Some(collection) = collection {
                text.push_str(&t_args(
                    "range-row-collection",
                    &[("collection", collection.clone())],
                ));
                text.push('\n');
            }
            text.push('\n');
        }
    }

    let mut buttons: Vec<(String, String)> = ranges
        .iter()
        .map(|range| {
            let display = t_args(
                "wage-range-display",
                &[
                    ("name", range.name.clone()),
                    ("min", ui::format_number(range.min_wage)),
                    ("max", ui::format_number(range.max_wage)),
                ],
            );
            (
                t_args("btn-delete-named", &[("name", display)]),
                CallbackData::encode("delete_wage_range", &[&range.id.to_string()]),
            )
        })
        .collect();
    buttons.push((t("btn-add-wage-range"), "add_wage_range".to_string()));
    buttons.push((t("btn-back"), "admin_menu".to_string()));

    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(ui::single_column(buttons))
        .await?;
    Ok(())
}

fn range_scope_names(
    conn: &rusqlite::Connection,
    category_id: Option<i64>,
    collection_id: Option<i64>,
) -> Result<(Option<String>, Option<String>)> {
    let category = match category_id {
        Some(category_id) => db::find_category(conn, category_id)?.map(|c| c.name),
        None => None,
    };
    let collection = match collection_id {
        Some(collection_id) => db::find_collection(conn, collection_id)?.map(|c| c.name),
        None => None,
    };
    Ok((category, collection))
}

// ---------------------------------------------------------------------------
// User moderation

async fn show_pending_users(bot: &Bot, app: &App, chat_id: ChatId) -> Result<()> {
    let users = {
        let conn = app.conn.lock().await;
        db::list_pending_users(&conn)?
    };

    if users.is_empty() {
        bot.send_message(chat_id, t("no-pending-users")).await?;
        return Ok(());
    }

    let mut text = format!("{}\n\n", t("pending-users-title"));
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();
    for user in &users {
        text.push_str(&t_args(
            "pending-user-row",
            &[
                ("name", user.full_name()),
                ("internal_id", user.internal_id.clone()),
                ("created_at", format_created(&user.created_at, false)),
            ],
        ));
        text.push_str("\n\n");

        let id = user.telegram_id.to_string();
        rows.push(vec![
            InlineKeyboardButton::callback(
                t_args("btn-approve-named", &[("name", user.first_name.clone())]),
                CallbackData::encode("approve_user", &[&id]),
            ),
            InlineKeyboardButton::callback(
                t_args("btn-reject-named", &[("name", user.first_name.clone())]),
                CallbackData::encode("reject_user", &[&id]),
            ),
        ]);
    }
    rows.push(vec![InlineKeyboardButton::callback(t("btn-back"), "admin_menu")]);

    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(InlineKeyboardMarkup::new(rows))
        .await?;
    Ok(())
}

/// Applies a moderation verdict and notifies the affected user in their own
/// chat. A failed notification (user blocked the bot, never started it) is
/// logged and does not fail the verdict.
async fn moderate_user(
    bot: &Bot,
    app: &App,
    chat_id: ChatId,
    target: i64,
    status: UserStatus,
) -> Result<()> {
    let user = {
        let conn = app.conn.lock().await;
        db::update_user_status(&conn, target, status)?;
        db::find_user_by_telegram_id(&conn, target)?
    };

    let (notification, confirmation) = match status {
        UserStatus::Approved => {
            let internal_id = user.map(|u| u.internal_id).unwrap_or_default();
            (
                t_args("approved-notification", &[("internal_id", internal_id)]),
                t("user-approved"),
            )
        }
        _ => (t("rejected-notification"), t("user-rejected")),
    };

    if let Err(e) = bot
        .send_message(ChatId(target), notification)
        .parse_mode(ParseMode::Html)
        .await
    {
        warn!(telegram_id = target, error = %e, "Moderation notification failed");
    }

    bot.send_message(chat_id, confirmation).await?;
    show_pending_users(bot, app, chat_id).await
}

// ---------------------------------------------------------------------------
// User list / levels / search

fn user_card(user: &User, with_level: bool) -> String {
    let mut lines = vec![
        t("user-card-top"),
        t_args("user-card-name", &[("name", user.full_name())]),
        t_args(
            "user-card-internal-id",
            &[("internal_id", user.internal_id.clone())],
        ),
    ];
    if with_level {
        lines.push(t_args(
            "user-card-level",
            &[("level", ui::level_label(&user.level))],
        ));
    } else {
        lines.push(t_args(
            "user-card-status",
            &[("status", ui::status_label(&user.status))],
        ));
        lines.push(t_args(
            "user-card-created",
            &[("created_at", format_created(&user.created_at, true))],
        ));
    }
    lines.push(t("user-card-bottom"));
    lines.push(String::new());
    lines.join("\n")
}

async fn show_users_list(bot: &Bot, app: &App, chat_id: ChatId) -> Result<()> {
    let (users, (total, approved, pending, rejected)) = {
        let conn = app.conn.lock().await;
        (db::list_users(&conn)?, db::count_users_by_status(&conn)?)
    };

    if users.is_empty() {
        bot.send_message(chat_id, t("no-users")).await?;
        return Ok(());
    }

    let mut text = format!(
        "{}\n\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n\n{}\n\n",
        t("user-list-title"),
        t("stats-separator"),
        t("stats-overall-header"),
        t_args("stats-approved", &[("count", approved.to_string())]),
        t_args("stats-pending", &[("count", pending.to_string())]),
        t_args("stats-rejected", &[("count", rejected.to_string())]),
        t_args("stats-total-users", &[("count", total.to_string())]),
        t("stats-separator"),
        t("user-list-header"),
    );

    let back_keyboard = || {
        InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
            t("btn-back"),
            "admin_menu",
        )]])
    };

    let mut in_batch = 0;
    for (index, user) in users.iter().enumerate() {
        text.push_str(&user_card(user, false));
        text.push('\n');
        in_batch += 1;

        if in_batch >= USERS_PER_LIST_MESSAGE && index < users.len() - 1 {
            text.push_str(&t("list-continues-marker"));
            bot.send_message(chat_id, text)
                .parse_mode(ParseMode::Html)
                .reply_markup(back_keyboard())
                .await?;
            text = format!("{}\n\n", t("user-list-continued"));
            in_batch = 0;
        }
    }

    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(back_keyboard())
        .await?;
    Ok(())
}

async fn show_user_level_management(bot: &Bot, app: &App, chat_id: ChatId) -> Result<()> {
    let (users, level_counts) = {
        let conn = app.conn.lock().await;
        (db::list_users(&conn)?, db::count_users_by_level(&conn)?)
    };

    if users.is_empty() {
        bot.send_message(chat_id, t("no-users")).await?;
        return Ok(());
    }

    let mut text = format!("{}\n\n{}\n{}\n", t("manage-levels-title"), t("stats-separator"), t("stats-levels-header"));
    for (level, count) in &level_counts {
        text.push_str(&t_args(
            "stats-level-row",
            &[
                ("level", ui::level_label(level.as_str())),
                ("count", count.to_string()),
            ],
        ));
        text.push('\n');
    }
    text.push_str(&t_args("stats-total-users", &[("count", users.len().to_string())]));
    text.push('\n');
    text.push_str(&t("stats-separator"));
    text.push_str("\n\n");
    text.push_str(&t("user-list-header"));
    text.push_str("\n\n");

    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();
    let mut in_batch = 0;

    for (index, user) in users.iter().enumerate() {
        text.push_str(&user_card(user, true));
        text.push('\n');
        rows.push(vec![InlineKeyboardButton::callback(
            t_args("btn-change-level", &[("name", user.full_name())]),
            CallbackData::encode("manage_user_level", &[&user.telegram_id.to_string()]),
        )]);
        in_batch += 1;

        if in_batch >= USERS_PER_LEVEL_MESSAGE && index < users.len() - 1 {
            text.push_str(&t("list-continues-marker"));
            rows.push(vec![InlineKeyboardButton::callback(t("btn-back"), "admin_menu")]);
            bot.send_message(chat_id, text)
                .parse_mode(ParseMode::Html)
                .reply_markup(InlineKeyboardMarkup::new(std::mem::take(&mut rows)))
                .await?;
            text = format!("{}\n\n", t("user-list-continued"));
            in_batch = 0;
        }
    }

    rows.push(vec![InlineKeyboardButton::callback(
        t("btn-search-user"),
        "search_user_level",
    )]);
    rows.push(vec![InlineKeyboardButton::callback(t("btn-back"), "admin_menu")]);

    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(InlineKeyboardMarkup::new(rows))
        .await?;
    Ok(())
}

async fn show_user_level_options(bot: &Bot, app: &App, chat_id: ChatId, target: i64) -> Result<()> {
    let user = {
        let conn = app.conn.lock().await;
        db::find_user_by_telegram_id(&conn, target)?
    };
    let user = match user {
        Some(user) => user,
        None => {
            bot.send_message(chat_id, t("user-not-found")).await?;
            return Ok(());
        }
    };

    let text = t_args(
        "change-level-title",
        &[
            ("name", user.full_name()),
            ("internal_id", user.internal_id.clone()),
            ("level", ui::level_label(&user.level)),
        ],
    );

    let id = target.to_string();
    let mut buttons: Vec<(String, String)> = UserLevel::ALL
        .iter()
        .map(|level| {
            let label = ui::level_label(level.as_str());
            let label = if level.as_str() == user.level {
                format!("✓ {label}")
            } else {
                label
            };
            (
                label,
                CallbackData::encode("set_user_level", &[&id, level.as_str()]),
            )
        })
        .collect();
    buttons.push((t("btn-back"), "admin_menu".to_string()));

    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(ui::single_column(buttons))
        .await?;
    Ok(())
}

async fn set_user_level(
    bot: &Bot,
    app: &App,
    chat_id: ChatId,
    target: i64,
    level: &str,
) -> Result<()> {
    let level = match UserLevel::parse(level) {
        Some(level) => level,
        None => {
            bot.send_message(chat_id, t("invalid-level")).await?;
            return Ok(());
        }
    };

    let user = {
        let conn = app.conn.lock().await;
        db::find_user_by_telegram_id(&conn, target)?
    };
    let user = match user {
        Some(user) => user,
        None => {
            bot.send_message(chat_id, t("user-not-found")).await?;
            return Ok(());
        }
    };

    {
        let conn = app.conn.lock().await;
        db::update_user_level(&conn, target, level)?;
    }

    bot.send_message(
        chat_id,
        t_args(
            "level-changed",
            &[
                ("name", user.full_name()),
                ("level", ui::level_label(level.as_str())),
            ],
        ),
    )
    .parse_mode(ParseMode::Html)
    .await?;
    show_user_level_management(bot, app, chat_id).await
}

async fn show_user_search_results(
    bot: &Bot,
    chat_id: ChatId,
    users: &[User],
    query: &str,
) -> Result<()> {
    let mut text = format!(
        "{}\n\n{}\n{}\n{}\n\n",
        t("search-results-title"),
        t_args("search-query-line", &[("query", query.to_string())]),
        t_args("search-results-count", &[("count", users.len().to_string())]),
        t("stats-separator"),
    );

    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();
    let mut in_batch = 0;

    for (index, user) in users.iter().enumerate() {
        text.push_str(&user_card(user, true));
        text.push('\n');

        let id = user.telegram_id.to_string();
        rows.push(vec![InlineKeyboardButton::callback(
            t_args("btn-change-level", &[("name", user.full_name())]),
            CallbackData::encode("manage_user_level", &[&id]),
        )]);
        rows.push(vec![InlineKeyboardButton::callback(
            t_args("btn-delete-named", &[("name", user.full_name())]),
            CallbackData::encode("delete_user", &[&id]),
        )]);
        in_batch += 1;

        if in_batch >= USERS_PER_LEVEL_MESSAGE && index < users.len() - 1 {
            text.push_str(&t("list-continues-marker"));
            rows.push(vec![InlineKeyboardButton::callback(
                t("btn-back"),
                "clear_user_search",
            )]);
            bot.send_message(chat_id, text)
                .parse_mode(ParseMode::Html)
                .reply_markup(InlineKeyboardMarkup::new(std::mem::take(&mut rows)))
                .await?;
            text = format!("{}\n\n", t("search-results-continued"));
            in_batch = 0;
        }
    }

    rows.push(vec![InlineKeyboardButton::callback(
        t("btn-search-again"),
        "search_user_level",
    )]);
    rows.push(vec![InlineKeyboardButton::callback(
        t("btn-back-to-list"),
        "clear_user_search",
    )]);

    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(InlineKeyboardMarkup::new(rows))
        .await?;
    Ok(())
}

async fn confirm_delete_user(bot: &Bot, app: &App, chat_id: ChatId, target: i64) -> Result<()> {
    let user = {
        let conn = app.conn.lock().await;
        db::find_user_by_telegram_id(&conn, target)?
    };
    let user = match user {
        Some(user) => user,
        None => {
            bot.send_message(chat_id, t("user-not-found")).await?;
            return show_users_list(bot, app, chat_id).await;
        }
    };

    let id = target.to_string();
    let keyboard = InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback(
            t("btn-delete-user-yes"),
            CallbackData::encode("confirm_delete_user_yes", &[&id]),
        ),
        InlineKeyboardButton::callback(t("btn-delete-user-no"), "confirm_delete_user_no"),
    ]]);

    bot.send_message(
        chat_id,
        t_args(
            "delete-user-confirm",
            &[
                ("name", user.full_name()),
                ("internal_id", user.internal_id),
            ],
        ),
    )
    .parse_mode(ParseMode::Html)
    .reply_markup(keyboard)
    .await?;
    Ok(())
}

async fn delete_user(bot: &Bot, app: &App, chat_id: ChatId, target: i64) -> Result<()> {
    let user = {
        let conn = app.conn.lock().await;
        db::find_user_by_telegram_id(&conn, target)?
    };
    let user = match user {
        Some(user) => user,
        None => {
            bot.send_message(chat_id, t("user-not-found")).await?;
            return show_users_list(bot, app, chat_id).await;
        }
    };

    {
        let conn = app.conn.lock().await;
        db::delete_user(&conn, target)?;
    }

    bot.send_message(
        chat_id,
        t_args(
            "user-deleted",
            &[
                ("name", user.full_name()),
                ("internal_id", user.internal_id),
            ],
        ),
    )
    .parse_mode(ParseMode::Html)
    .await?;
    show_users_list(bot, app, chat_id).await
}

// ---------------------------------------------------------------------------
// Contact management and menus

async fn show_contact_management(bot: &Bot, app: &App, chat_id: ChatId) -> Result<()> {
    let contact = {
        let conn = app.conn.lock().await;
        db::get_contact_info(&conn)?
    };

    let keyboard = ui::single_column(vec![
        (t("btn-edit-contact-address"), "edit_contact_address".to_string()),
        (t("btn-edit-contact-phone"), "edit_contact_phone".to_string()),
        (t("btn-back"), "admin_menu".to_string()),
    ]);

    bot.send_message(
        chat_id,
        t_args(
            "manage-contact-title",
            &[("address", contact.address), ("phone", contact.phone)],
        ),
    )
    .parse_mode(ParseMode::Html)
    .reply_markup(keyboard)
    .await?;
    Ok(())
}

async fn show_admin_menu(bot: &Bot, chat_id: ChatId) -> Result<()> {
    bot.send_message(chat_id, t("admin-panel-title"))
        .parse_mode(ParseMode::Html)
        .reply_markup(ui::admin_menu_keyboard())
        .await?;
    Ok(())
}

async fn show_main_menu(bot: &Bot, chat_id: ChatId) -> Result<()> {
    bot.send_message(chat_id, t("main-menu-title"))
        .parse_mode(ParseMode::Html)
        .reply_markup(ui::main_menu_keyboard(true))
        .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Input parsing

/// Any finite number; bounds and wages may legitimately be zero.
fn parse_number(text: &str) -> Option<f64> {
    let normalized = text_utils::normalize_digits(text.trim());
    match normalized.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => None,
    }
}

/// Stored timestamps are SQLite `DATETIME` text. Unparseable values are
/// shown raw rather than dropped.
fn format_created(created_at: &str, slashed: bool) -> String {
    match NaiveDateTime::parse_from_str(created_at, "%Y-%m-%d %H:%M:%S") {
        Ok(datetime) => {
            let pattern = if slashed { "%Y/%m/%d %H:%M" } else { "%Y-%m-%d %H:%M" };
            datetime.format(pattern).to_string()
        }
        Err(_) => created_at.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number_accepts_zero_and_persian() {
        assert_eq!(parse_number("0"), Some(0.0));
        assert_eq!(parse_number("۱۵.۵"), Some(15.5));
        assert_eq!(parse_number(" 8 "), Some(8.0));
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn test_format_created_known_layout() {
        assert_eq!(format_created("2026-03-01 14:30:00", false), "2026-03-01 14:30");
        assert_eq!(format_created("2026-03-01 14:30:00", true), "2026/03/01 14:30");
    }

    #[test]
    fn test_format_created_falls_back_to_raw() {
        assert_eq!(format_created("not a date", true), "not a date");
    }

    #[test]
    fn test_user_card_level_variant_has_no_status_line() {
        let user = User {
            id: 1,
            telegram_id: 42,
            first_name: "Ali".into(),
            last_name: "Hosseini".into(),
            internal_id: "USER-0001".into(),
            status: "approved".into(),
            level: "vip".into(),
            created_at: "2026-01-01 08:00:00".into(),
        };

        let level_card = user_card(&user, true);
        assert!(level_card.contains("USER-0001"));
        assert!(level_card.contains("VIP"));
        assert!(!level_card.contains("تایید شده"));

        let status_card = user_card(&user, false);
        assert!(status_card.contains("تایید شده"));
        assert!(status_card.contains("2026/01/01 08:00"));
    }
}
