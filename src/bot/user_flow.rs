//! End-user flow: registration, catalog browsing and product search.
//!
//! Every interaction passes the channel-membership gate first (operators are
//! exempt). Unregistered actors are funnelled into the two-step name capture
//! before anything else. Free-text search states live in
//! [`crate::state::UserState`]; pagination travels inside reply-button labels
//! rather than callbacks, so the text dispatcher pattern-matches those labels
//! on the next inbound message.

use anyhow::Result;
use lazy_static::lazy_static;
use regex::Regex;
use teloxide::prelude::*;
use teloxide::types::{
    ChatId, FileId, InlineKeyboardMarkup, InputFile, MessageId, ParseMode, Recipient, ReplyMarkup,
};
use tracing::{debug, warn};
use url::Url;

use crate::bot::ui::{self, RangeKind, PRODUCTS_PAGE_SIZE};
use crate::bot::App;
use crate::callback::{FilterKind, UserAction};
use crate::db::{self, Product, ProductFilter, ProductMedia};
use crate::localization::{t, t_args};
use crate::state::UserState;
use crate::text_utils;

lazy_static! {
    static ref NAV_PATTERN: Regex = Regex::new(r"^(◀️ قبلی|▶️ بعدی):(\d+):(\d+)$")
        .expect("Navigation button pattern should be valid");
    static ref VIEW_CODE_PATTERN: Regex =
        Regex::new(r"^🔍 مشاهده کد (\d+)$").expect("View-code button pattern should be valid");
}

pub async fn handle_message(
    bot: &Bot,
    app: &App,
    msg: &Message,
    telegram_id: i64,
    is_admin: bool,
) -> Result<()> {
    let chat_id = msg.chat.id;
    let text = msg.text().unwrap_or("");

    if !is_admin && !is_channel_member(bot, app, telegram_id).await {
        return show_membership_required(bot, app, chat_id).await;
    }

    let user = {
        let conn = app.conn.lock().await;
        db::find_user_by_telegram_id(&conn, telegram_id)?
    };

    if user.is_none() {
        if is_admin {
            // Operators get a user row on first contact, from their profile
            // names, so the shopping views can resolve their level.
            let (first_name, last_name) = profile_names(msg);
            let conn = app.conn.lock().await;
            db::create_user(&conn, telegram_id, &first_name, &last_name)?;
        } else {
            return handle_registration(bot, app, chat_id, telegram_id, text).await;
        }
    }

    if text == "/start" {
        app.user_states.clear(telegram_id);
        return show_main_menu(bot, chat_id, is_admin).await;
    }

    if let Some(state) = app.user_states.get(telegram_id) {
        return handle_state(bot, app, chat_id, telegram_id, is_admin, text, state).await;
    }

    if text == t("btn-products") {
        show_categories(bot, app, chat_id).await
    } else if text == t("btn-search-products") {
        ask_for_product_code(bot, app, chat_id, telegram_id).await
    } else if text == t("btn-contact") {
        show_contact(bot, app, chat_id).await
    } else if text == t("btn-back") || text == t("btn-back-main") {
        show_main_menu(bot, chat_id, is_admin).await
    } else if let Some(category) = {
        let conn = app.conn.lock().await;
        db::find_category_by_name(&conn, text)?
    } {
        show_category_filter_menu(bot, app, chat_id, category.id).await
    } else if let Some(captures) = VIEW_CODE_PATTERN.captures(text) {
        let code = captures[1].to_string();
        search_product_by_code(bot, app, chat_id, &code).await
    } else if let Some(captures) = NAV_PATTERN.captures(text) {
        let category_id: i64 = captures[2].parse().unwrap_or(0);
        let offset: i64 = captures[3].parse().unwrap_or(0);
        show_category_all_products(bot, app, chat_id, category_id, offset).await
    } else if is_numeric_text(text) {
        search_product_by_code(bot, app, chat_id, text).await
    } else {
        debug!(telegram_id, "Unmatched text, falling back to main menu");
        show_main_menu(bot, chat_id, is_admin).await
    }
}

pub async fn handle_callback(bot: &Bot, app: &App, q: &CallbackQuery) -> Result<()> {
    let telegram_id = q.from.id.0.cast_signed();
    let (chat_id, message_id) = match &q.message {
        Some(message) => (message.chat().id, message.id()),
        None => return Ok(()),
    };
    let action = match q.data.as_deref().and_then(UserAction::decode) {
        Some(action) => action,
        None => return Ok(()),
    };

    let is_admin = {
        let conn = app.conn.lock().await;
        db::is_admin(&conn, telegram_id)?
    };

    if !is_admin
        && action != UserAction::CheckChannelMembership
        && !is_channel_member(bot, app, telegram_id).await
    {
        return show_membership_required(bot, app, chat_id).await;
    }

    match action {
        UserAction::Category { category_id, .. } => {
            show_category_filter_menu(bot, app, chat_id, category_id).await
        }
        UserAction::CategoryCollections { category_id } => {
            show_category_collections(bot, app, chat_id, message_id, telegram_id, category_id)
                .await
        }
        UserAction::CategoryWeightRanges { category_id } => {
            show_category_ranges(
                bot,
                app,
                chat_id,
                message_id,
                telegram_id,
                category_id,
                RangeKind::Weight,
            )
            .await
        }
        UserAction::CategoryWageRanges { category_id } => {
            show_category_ranges(
                bot,
                app,
                chat_id,
                message_id,
                telegram_id,
                category_id,
                RangeKind::Wage,
            )
            .await
        }
        UserAction::CategoryAll {
            category_id,
            offset,
        } => show_category_all_products(bot, app, chat_id, category_id, offset).await,
        UserAction::Collection { collection_id } => {
            show_collection_products(bot, app, chat_id, collection_id).await
        }
        UserAction::Product { product_id } => {
            show_product_details(bot, app, chat_id, product_id).await
        }
        UserAction::Weight { weight } => {
            search_products_by_weight(bot, app, chat_id, weight, None, None).await
        }
        UserAction::Wage { wage } => {
            search_products_by_wage(bot, app, chat_id, wage, None, None).await
        }
        UserAction::WeightSearchCategory { category_id } => {
            ask_for_search_collection(
                bot,
                app,
                chat_id,
                message_id,
                telegram_id,
                category_id,
                RangeKind::Weight,
            )
            .await
        }
        UserAction::WeightSearchCollection {
            category_id,
            collection_id,
        } => {
            ask_for_search_range(
                bot,
                app,
                chat_id,
                message_id,
                telegram_id,
                category_id,
                collection_id,
                RangeKind::Weight,
            )
            .await
        }
        UserAction::WeightRange {
            range_id,
            category_id,
            collection_id,
        } => show_weight_range_products(bot, app, chat_id, range_id, category_id, collection_id)
            .await,
        UserAction::WageSearchCategory { category_id } => {
            ask_for_search_collection(
                bot,
                app,
                chat_id,
                message_id,
                telegram_id,
                category_id,
                RangeKind::Wage,
            )
            .await
        }
        UserAction::WageSearchCollection {
            category_id,
            collection_id,
        } => {
            ask_for_search_range(
                bot,
                app,
                chat_id,
                message_id,
                telegram_id,
                category_id,
                collection_id,
                RangeKind::Wage,
            )
            .await
        }
        UserAction::WageRange {
            range_id,
            category_id,
            collection_id,
        } => show_wage_range_products(bot, app, chat_id, range_id, category_id, collection_id)
            .await,
        UserAction::Filter { kind } => {
            show_filter_menu(bot, app, chat_id, message_id, telegram_id, kind).await
        }
        UserAction::Back => show_main_menu(bot, chat_id, is_admin).await,
        UserAction::CheckChannelMembership => {
            if is_admin || is_channel_member(bot, app, telegram_id).await {
                show_main_menu(bot, chat_id, is_admin).await
            } else {
                show_membership_required(bot, app, chat_id).await
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Membership gate and registration

async fn is_channel_member(bot: &Bot, app: &App, telegram_id: i64) -> bool {
    let channel = Recipient::ChannelUsername(app.channel_username.clone());
    match bot
        .get_chat_member(channel, UserId(telegram_id.cast_unsigned()))
        .await
    {
        Ok(member) => member.is_present(),
        Err(e) => {
            // The API refuses the lookup when the bot cannot see the
            // channel; treat that the same as non-membership.
            warn!(telegram_id, error = %e, "Channel membership check failed");
            false
        }
    }
}

async fn show_membership_required(bot: &Bot, app: &App, chat_id: ChatId) -> Result<()> {
    bot.send_message(
        chat_id,
        t_args("join-required", &[("channel_url", app.channel_url.to_string())]),
    )
    .parse_mode(ParseMode::Html)
    .reply_markup(ui::join_channel_keyboard(&app.channel_url))
    .await?;
    Ok(())
}

fn profile_names(msg: &Message) -> (String, String) {
    match &msg.from {
        Some(from) => (
            from.first_name.clone(),
            from.last_name.clone().unwrap_or_default(),
        ),
        None => (String::new(), String::new()),
    }
}

/// One free-text input against the two-step name capture. Replies and the
/// actual row insert stay with the caller.
#[derive(Debug, Clone, PartialEq)]
enum RegistrationStep {
    AskFirstName,
    AskLastName { first_name: String },
    CreateUser { first_name: String, last_name: String },
}

fn registration_step(state: Option<UserState>, text: &str) -> RegistrationStep {
    match state {
        Some(UserState::AwaitingFirstName) => RegistrationStep::AskLastName {
            first_name: text.to_string(),
        },
        Some(UserState::AwaitingLastName { first_name }) => RegistrationStep::CreateUser {
            first_name,
            last_name: text.to_string(),
        },
        _ => RegistrationStep::AskFirstName,
    }
}

async fn handle_registration(
    bot: &Bot,
    app: &App,
    chat_id: ChatId,
    telegram_id: i64,
    text: &str,
) -> Result<()> {
    match registration_step(app.user_states.get(telegram_id), text) {
        RegistrationStep::AskFirstName => {
            app.user_states.set(telegram_id, UserState::AwaitingFirstName);
            bot.send_message(
                chat_id,
                format!("{}\n\n{}", t("welcome"), t("register-prompt-first-name")),
            )
            .parse_mode(ParseMode::Html)
            .await?;
        }
        RegistrationStep::AskLastName { first_name } => {
            app.user_states.set(
                telegram_id,
                UserState::AwaitingLastName {
                    first_name: first_name.clone(),
                },
            );
            bot.send_message(
                chat_id,
                t_args("register-first-name-saved", &[("first_name", first_name)]),
            )
            .parse_mode(ParseMode::Html)
            .await?;
        }
        RegistrationStep::CreateUser {
            first_name,
            last_name,
        } => {
            let user = {
                let conn = app.conn.lock().await;
                db::create_user(&conn, telegram_id, &first_name, &last_name)?
            };
            app.user_states.clear(telegram_id);
            bot.send_message(
                chat_id,
                t_args("registration-done", &[("internal_id", user.internal_id)]),
            )
            .parse_mode(ParseMode::Html)
            .reply_markup(ui::main_menu_inline_keyboard())
            .await?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Waiting states

/// What one free-text message does to a pending search prompt.
#[derive(Debug, Clone, PartialEq)]
enum SearchStep {
    CodeLookup(String),
    WeightLookup {
        weight: f64,
        category_id: Option<i64>,
        collection_id: Option<i64>,
    },
    WageLookup {
        wage: f64,
        category_id: Option<i64>,
        collection_id: Option<i64>,
    },
    RepromptWeight,
    RepromptWage,
    BackToMenu,
}

impl SearchStep {
    /// Only a failed numeric parse keeps the prompt alive. A code attempt
    /// spends its state no matter what the lookup finds.
    fn keeps_state(&self) -> bool {
        matches!(self, SearchStep::RepromptWeight | SearchStep::RepromptWage)
    }
}

fn search_step(state: &UserState, text: &str) -> SearchStep {
    match state {
        UserState::AwaitingProductCode => SearchStep::CodeLookup(text.to_string()),
        UserState::AwaitingWeight {
            category_id,
            collection_id,
        } => match text_utils::parse_positive_number(text) {
            Some(weight) => SearchStep::WeightLookup {
                weight,
                category_id: *category_id,
                collection_id: *collection_id,
            },
            None => SearchStep::RepromptWeight,
        },
        UserState::AwaitingWage {
            category_id,
            collection_id,
        } => match text_utils::parse_positive_number(text) {
            Some(wage) => SearchStep::WageLookup {
                wage,
                category_id: *category_id,
                collection_id: *collection_id,
            },
            None => SearchStep::RepromptWage,
        },
        // Registration states never coexist with a user row.
        UserState::AwaitingFirstName | UserState::AwaitingLastName { .. } => SearchStep::BackToMenu,
    }
}

async fn handle_state(
    bot: &Bot,
    app: &App,
    chat_id: ChatId,
    telegram_id: i64,
    is_admin: bool,
    text: &str,
    state: UserState,
) -> Result<()> {
    // Back always escapes the waiting state, before any state handling.
    if text == t("btn-back") {
        app.user_states.clear(telegram_id);
        return show_main_menu(bot, chat_id, is_admin).await;
    }

    let step = search_step(&state, text);
    if !step.keeps_state() {
        app.user_states.clear(telegram_id);
    }
    match step {
        SearchStep::CodeLookup(code) => search_product_by_code(bot, app, chat_id, &code).await,
        SearchStep::WeightLookup {
            weight,
            category_id,
            collection_id,
        } => search_products_by_weight(bot, app, chat_id, weight, category_id, collection_id).await,
        SearchStep::WageLookup {
            wage,
            category_id,
            collection_id,
        } => search_products_by_wage(bot, app, chat_id, wage, category_id, collection_id).await,
        SearchStep::RepromptWeight => {
            bot.send_message(chat_id, t("invalid-weight-input")).await?;
            Ok(())
        }
        SearchStep::RepromptWage => {
            bot.send_message(chat_id, t("invalid-wage-input")).await?;
            Ok(())
        }
        SearchStep::BackToMenu => show_main_menu(bot, chat_id, is_admin).await,
    }
}

// ---------------------------------------------------------------------------
// Menus

async fn show_main_menu(bot: &Bot, chat_id: ChatId, is_admin: bool) -> Result<()> {
    bot.send_message(chat_id, t("main-menu-title"))
        .parse_mode(ParseMode::Html)
        .reply_markup(ui::main_menu_keyboard(is_admin))
        .await?;
    Ok(())
}

async fn show_categories(bot: &Bot, app: &App, chat_id: ChatId) -> Result<()> {
    let categories = {
        let conn = app.conn.lock().await;
        db::list_categories(&conn)?
    };

    if categories.is_empty() {
        bot.send_message(chat_id, t("no-categories")).await?;
        return Ok(());
    }

    bot.send_message(chat_id, t("categories-title"))
        .parse_mode(ParseMode::Html)
        .reply_markup(ui::categories_keyboard(&categories))
        .await?;
    Ok(())
}

async fn ask_for_product_code(
    bot: &Bot,
    app: &App,
    chat_id: ChatId,
    telegram_id: i64,
) -> Result<()> {
    app.user_states
        .set(telegram_id, UserState::AwaitingProductCode);
    bot.send_message(chat_id, t("prompt-product-code"))
        .reply_markup(ui::back_keyboard())
        .await?;
    Ok(())
}

async fn show_contact(bot: &Bot, app: &App, chat_id: ChatId) -> Result<()> {
    let contact = {
        let conn = app.conn.lock().await;
        db::get_contact_info(&conn)?
    };
    bot.send_message(
        chat_id,
        t_args(
            "contact-info",
            &[("address", contact.address), ("phone", contact.phone)],
        ),
    )
    .parse_mode(ParseMode::Html)
    .await?;
    Ok(())
}

async fn show_filter_menu(
    bot: &Bot,
    app: &App,
    chat_id: ChatId,
    message_id: MessageId,
    telegram_id: i64,
    kind: Option<FilterKind>,
) -> Result<()> {
    match kind {
        Some(FilterKind::Category) => show_categories(bot, app, chat_id).await,
        Some(FilterKind::Collection) => {
            let (collections, level) = {
                let conn = app.conn.lock().await;
                (
                    db::list_collections(&conn, None)?,
                    viewer_level(&conn, telegram_id)?,
                )
            };
            if collections.is_empty() {
                bot.send_message(chat_id, t("no-collections-admin")).await?;
                return Ok(());
            }
            let buttons: Vec<(String, String)> = collections
                .iter()
                .map(|collection| {
                    (
                        ui::collection_button_label(collection, &level),
                        format!("collection:{}", collection.id),
                    )
                })
                .chain(std::iter::once((t("btn-back"), "back".to_string())))
                .collect();
            edit_or_send(
                bot,
                chat_id,
                message_id,
                &t("collections-plain-title"),
                Some(ui::single_column(buttons)),
            )
            .await
        }
        Some(FilterKind::Weight) => {
            ask_for_search_category(bot, app, chat_id, RangeKind::Weight).await
        }
        Some(FilterKind::Wage) => ask_for_search_category(bot, app, chat_id, RangeKind::Wage).await,
        None => {
            let buttons = vec![
                (t("btn-filter-category"), "filter:category".to_string()),
                (t("btn-filter-collection"), "filter:collection".to_string()),
                (t("btn-filter-weight"), "filter:weight".to_string()),
                (t("btn-filter-wage"), "filter:wage".to_string()),
                (t("btn-back"), "back".to_string()),
            ];
            bot.send_message(chat_id, t("filter-menu-title"))
                .parse_mode(ParseMode::Html)
                .reply_markup(ui::single_column(buttons))
                .await?;
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Category browsing

async fn show_category_filter_menu(
    bot: &Bot,
    app: &App,
    chat_id: ChatId,
    category_id: i64,
) -> Result<()> {
    let category = {
        let conn = app.conn.lock().await;
        db::find_category(&conn, category_id)?
    };
    let category = match category {
        Some(category) => category,
        None => {
            bot.send_message(chat_id, t("category-not-found")).await?;
            return Ok(());
        }
    };

    let text = format!(
        "{}\n\n{}",
        t_args("category-products-title", &[("category", category.name)]),
        t("pick-filter-type")
    );
    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(ui::filter_menu_keyboard(category_id))
        .await?;
    Ok(())
}

fn viewer_level(conn: &rusqlite::Connection, telegram_id: i64) -> Result<String> {
    Ok(db::find_user_by_telegram_id(conn, telegram_id)?
        .map(|user| user.level)
        .unwrap_or_else(|| "general".to_string()))
}

async fn show_category_collections(
    bot: &Bot,
    app: &App,
    chat_id: ChatId,
    message_id: MessageId,
    telegram_id: i64,
    category_id: i64,
) -> Result<()> {
    let (category, collections, level) = {
        let conn = app.conn.lock().await;
        let category = db::find_category(&conn, category_id)?;
        let collections = db::list_collections(&conn, Some(category_id))?;
        let level = viewer_level(&conn, telegram_id)?;
        (category, collections, level)
    };

    let category = match category {
        Some(category) => category,
        None => {
            bot.send_message(chat_id, t("category-not-found")).await?;
            return Ok(());
        }
    };

    if collections.is_empty() {
        edit_or_send(
            bot,
            chat_id,
            message_id,
            &t_args("no-collections-for-category", &[("category", category.name)]),
            None,
        )
        .await?;
        return Ok(());
    }

    let text = t_args("collections-title", &[("category", category.name)]);
    let keyboard = ui::browse_collections_keyboard(&collections, &level, category_id);
    edit_or_send(bot, chat_id, message_id, &text, Some(keyboard)).await
}

/// Weight/wage preset list for a category. With no presets the flow degrades
/// to free-form numeric entry carrying the category in the waiting state.
async fn show_category_ranges(
    bot: &Bot,
    app: &App,
    chat_id: ChatId,
    message_id: MessageId,
    telegram_id: i64,
    category_id: i64,
    kind: RangeKind,
) -> Result<()> {
    let category = {
        let conn = app.conn.lock().await;
        db::find_category(&conn, category_id)?
    };
    let category = match category {
        Some(category) => category,
        None => {
            bot.send_message(chat_id, t("category-not-found")).await?;
            return Ok(());
        }
    };

    let header = t_args("category-products-title", &[("category", category.name)]);
    let back = format!("category:{category_id}");

    match kind {
        RangeKind::Weight => {
            let ranges = {
                let conn = app.conn.lock().await;
                db::list_weight_ranges(&conn, Some(category_id))?
            };
            if ranges.is_empty() {
                app.user_states.set(
                    telegram_id,
                    UserState::AwaitingWeight {
                        category_id: Some(category_id),
                        collection_id: None,
                    },
                );
                let text = format!(
                    "{}\n\n{}\n{}",
                    header,
                    t("no-weight-ranges-scoped"),
                    t("weight-manual-prompt")
                );
                // Reply keyboards cannot ride on an edit.
                bot.send_message(chat_id, text)
                    .parse_mode(ParseMode::Html)
                    .reply_markup(ui::back_keyboard())
                    .await?;
                return Ok(());
            }
            let text = format!("{}\n\n{}", header, t("pick-weight-range"));
            let keyboard = ui::weight_ranges_keyboard(&ranges, category_id, None, &back);
            edit_or_send(bot, chat_id, message_id, &text, Some(keyboard)).await
        }
        RangeKind::Wage => {
            let ranges = {
                let conn = app.conn.lock().await;
                db::list_wage_ranges(&conn, Some(category_id))?
            };
            if ranges.is_empty() {
                app.user_states.set(
                    telegram_id,
                    UserState::AwaitingWage {
                        category_id: Some(category_id),
                        collection_id: None,
                    },
                );
                let text = format!(
                    "{}\n\n{}\n{}",
                    header,
                    t("no-wage-ranges-scoped"),
                    t("wage-manual-prompt")
                );
                bot.send_message(chat_id, text)
                    .parse_mode(ParseMode::Html)
                    .reply_markup(ui::back_keyboard())
                    .await?;
                return Ok(());
            }
            let text = format!("{}\n\n{}", header, t("pick-wage-range"));
            let keyboard = ui::wage_ranges_keyboard(&ranges, category_id, None, &back);
            edit_or_send(bot, chat_id, message_id, &text, Some(keyboard)).await
        }
    }
}

async fn show_category_all_products(
    bot: &Bot,
    app: &App,
    chat_id: ChatId,
    category_id: i64,
    offset: i64,
) -> Result<()> {
    let (category, products, total) = {
        let conn = app.conn.lock().await;
        let category = db::find_category(&conn, category_id)?;
        let filter = ProductFilter {
            category_id: Some(category_id),
            ..Default::default()
        };
        let products = db::list_products(&conn, &filter, PRODUCTS_PAGE_SIZE, offset)?;
        let total = db::count_products(&conn, &filter)?;
        (category, products, total)
    };

    if category.is_none() {
        bot.send_message(chat_id, t("category-not-found")).await?;
        return Ok(());
    }

    if products.is_empty() {
        bot.send_message(chat_id, t("no-products-in-category")).await?;
        return Ok(());
    }

    let keyboard = ui::product_list_keyboard(&products, Some((category_id, offset, total)));
    send_product_media(bot, chat_id, &products, keyboard).await
}

async fn show_collection_products(
    bot: &Bot,
    app: &App,
    chat_id: ChatId,
    collection_id: i64,
) -> Result<()> {
    let (collection, products) = {
        let conn = app.conn.lock().await;
        let collection = db::find_collection(&conn, collection_id)?;
        let filter = ProductFilter {
            collection_id: Some(collection_id),
            ..Default::default()
        };
        let products = db::list_products(&conn, &filter, -1, 0)?;
        (collection, products)
    };

    if collection.is_none() {
        bot.send_message(chat_id, t("collection-not-found")).await?;
        return Ok(());
    }

    if products.is_empty() {
        bot.send_message(chat_id, t("no-products-in-collection")).await?;
        return Ok(());
    }

    let keyboard = ui::product_list_keyboard(&products, None);
    send_product_media(bot, chat_id, &products, keyboard).await
}

// ---------------------------------------------------------------------------
// Weight / wage preset search

async fn ask_for_search_category(
    bot: &Bot,
    app: &App,
    chat_id: ChatId,
    kind: RangeKind,
) -> Result<()> {
    let categories = {
        let conn = app.conn.lock().await;
        db::list_categories(&conn)?
    };

    let title = match kind {
        RangeKind::Weight => t("weight-search-title"),
        RangeKind::Wage => t("wage-search-title"),
    };
    let action = match kind {
        RangeKind::Weight => "weight_search_category",
        RangeKind::Wage => "wage_search_category",
    };

    let buttons: Vec<(String, String)> = categories
        .iter()
        .map(|category| (category.name.clone(), format!("{action}:{}", category.id)))
        .chain(std::iter::once((t("btn-back"), "back".to_string())))
        .collect();

    bot.send_message(chat_id, format!("{}\n\n{}", title, t("pick-search-category")))
        .parse_mode(ParseMode::Html)
        .reply_markup(ui::single_column(buttons))
        .await?;
    Ok(())
}

async fn ask_for_search_collection(
    bot: &Bot,
    app: &App,
    chat_id: ChatId,
    message_id: MessageId,
    telegram_id: i64,
    category_id: i64,
    kind: RangeKind,
) -> Result<()> {
    let (category, collections, level) = {
        let conn = app.conn.lock().await;
        (
            db::find_category(&conn, category_id)?,
            db::list_collections(&conn, Some(category_id))?,
            viewer_level(&conn, telegram_id)?,
        )
    };
    let category_name = category.map(|c| c.name).unwrap_or_default();

    let title = match kind {
        RangeKind::Weight => t("weight-search-title"),
        RangeKind::Wage => t("wage-search-title"),
    };
    let text = format!(
        "{}\n\n{}\n\n{}",
        title,
        t_args("search-scope-category", &[("category", category_name)]),
        t("pick-collection-optional")
    );

    let keyboard = ui::search_collections_keyboard(kind, &collections, &level, category_id);
    edit_or_send(bot, chat_id, message_id, &text, Some(keyboard)).await
}

async fn ask_for_search_range(
    bot: &Bot,
    app: &App,
    chat_id: ChatId,
    message_id: MessageId,
    telegram_id: i64,
    category_id: i64,
    collection_id: Option<i64>,
    kind: RangeKind,
) -> Result<()> {
    let (category_name, collection_name) = {
        let conn = app.conn.lock().await;
        let category_name = db::find_category(&conn, category_id)?
            .map(|c| c.name)
            .unwrap_or_default();
        let collection_name = match collection_id {
            Some(collection_id) => db::find_collection(&conn, collection_id)?
                .map(|c| c.name)
                .unwrap_or_default(),
            None => t("all-collections-label"),
        };
        (category_name, collection_name)
    };

    let title = match kind {
        RangeKind::Weight => t("weight-search-title"),
        RangeKind::Wage => t("wage-search-title"),
    };
    let scope = format!(
        "{}\n{}",
        t_args("search-scope-category", &[("category", category_name)]),
        t_args("search-scope-collection", &[("collection", collection_name)]),
    );

    match kind {
        RangeKind::Weight => {
            let ranges = {
                let conn = app.conn.lock().await;
                db::list_weight_ranges(&conn, Some(category_id))?
            };
            if ranges.is_empty() {
                app.user_states.set(
                    telegram_id,
                    UserState::AwaitingWeight {
                        category_id: Some(category_id),
                        collection_id,
                    },
                );
                let text = format!(
                    "{}\n{}\n\n{}\n{}",
                    title,
                    scope,
                    t("no-weight-ranges-scoped"),
                    t("weight-manual-prompt")
                );
                bot.send_message(chat_id, text)
                    .parse_mode(ParseMode::Html)
                    .reply_markup(ui::back_keyboard())
                    .await?;
                return Ok(());
            }
            let text = format!("{}\n{}\n\n{}", title, scope, t("pick-weight-range"));
            let keyboard = ui::weight_ranges_keyboard(&ranges, category_id, collection_id, "back");
            edit_or_send(bot, chat_id, message_id, &text, Some(keyboard)).await
        }
        RangeKind::Wage => {
            let ranges = {
                let conn = app.conn.lock().await;
                db::list_wage_ranges(&conn, Some(category_id))?
            };
            if ranges.is_empty() {
                app.user_states.set(
                    telegram_id,
                    UserState::AwaitingWage {
                        category_id: Some(category_id),
                        collection_id,
                    },
                );
                let text = format!(
                    "{}\n{}\n\n{}\n{}",
                    title,
                    scope,
                    t("no-wage-ranges-scoped"),
                    t("wage-manual-prompt")
                );
                bot.send_message(chat_id, text)
                    .parse_mode(ParseMode::Html)
                    .reply_markup(ui::back_keyboard())
                    .await?;
                return Ok(());
            }
            let text = format!("{}\n{}\n\n{}", title, scope, t("pick-wage-range"));
            let keyboard = ui::wage_ranges_keyboard(&ranges, category_id, collection_id, "back");
            edit_or_send(bot, chat_id, message_id, &text, Some(keyboard)).await
        }
    }
}

async fn show_weight_range_products(
    bot: &Bot,
    app: &App,
    chat_id: ChatId,
    range_id: i64,
    category_id: Option<i64>,
    collection_id: Option<i64>,
) -> Result<()> {
    let (range, products) = {
        let conn = app.conn.lock().await;
        let range = match db::find_weight_range(&conn, range_id)? {
            Some(range) => range,
            None => {
                drop(conn);
                bot.send_message(chat_id, t("weight-range-not-found")).await?;
                return Ok(());
            }
        };
        // The tapped button's scope wins over the preset's own.
        let filter = ProductFilter {
            weight_min: Some(range.min_weight),
            weight_max: Some(range.max_weight),
            category_id: category_id.or(range.category_id),
            collection_id: collection_id.or(range.collection_id),
            ..Default::default()
        };
        let products = db::list_products(&conn, &filter, -1, 0)?;
        (range, products)
    };

    if products.is_empty() {
        bot.send_message(
            chat_id,
            t_args(
                "no-products-weight-range",
                &[
                    ("name", range.name),
                    ("min", ui::format_number(range.min_weight)),
                    ("max", ui::format_number(range.max_weight)),
                ],
            ),
        )
        .parse_mode(ParseMode::Html)
        .await?;
        return Ok(());
    }

    let keyboard = ui::product_list_keyboard(&products, None);
    send_product_media(bot, chat_id, &products, keyboard).await
}

async fn show_wage_range_products(
    bot: &Bot,
    app: &App,
    chat_id: ChatId,
    range_id: i64,
    category_id: Option<i64>,
    collection_id: Option<i64>,
) -> Result<()> {
    let (range, products) = {
        let conn = app.conn.lock().await;
        let range = match db::find_wage_range(&conn, range_id)? {
            Some(range) => range,
            None => {
                drop(conn);
                bot.send_message(chat_id, t("wage-range-not-found")).await?;
                return Ok(());
            }
        };
        let filter = ProductFilter {
            wage_min: Some(range.min_wage),
            wage_max: Some(range.max_wage),
            category_id: category_id.or(range.category_id),
            collection_id: collection_id.or(range.collection_id),
            ..Default::default()
        };
        let products = db::list_products(&conn, &filter, -1, 0)?;
        (range, products)
    };

    if products.is_empty() {
        bot.send_message(
            chat_id,
            t_args("no-products-wage-range", &[("name", range.name)]),
        )
        .parse_mode(ParseMode::Html)
        .await?;
        return Ok(());
    }

    let keyboard = ui::product_list_keyboard(&products, None);
    send_product_media(bot, chat_id, &products, keyboard).await
}

async fn search_products_by_weight(
    bot: &Bot,
    app: &App,
    chat_id: ChatId,
    weight: f64,
    category_id: Option<i64>,
    collection_id: Option<i64>,
) -> Result<()> {
    let products = {
        let conn = app.conn.lock().await;
        let filter = ProductFilter {
            weight: Some(weight),
            category_id,
            collection_id,
            ..Default::default()
        };
        db::list_products(&conn, &filter, -1, 0)?
    };

    if products.is_empty() {
        bot.send_message(
            chat_id,
            t_args("no-products-weight", &[("weight", ui::format_number(weight))]),
        )
        .parse_mode(ParseMode::Html)
        .await?;
        return Ok(());
    }

    let keyboard = ui::product_list_keyboard(&products, None);
    send_product_media(bot, chat_id, &products, keyboard).await
}

async fn search_products_by_wage(
    bot: &Bot,
    app: &App,
    chat_id: ChatId,
    wage: f64,
    category_id: Option<i64>,
    collection_id: Option<i64>,
) -> Result<()> {
    let products = {
        let conn = app.conn.lock().await;
        let filter = ProductFilter {
            wage: Some(wage),
            category_id,
            collection_id,
            ..Default::default()
        };
        db::list_products(&conn, &filter, -1, 0)?
    };

    if products.is_empty() {
        bot.send_message(
            chat_id,
            t_args("no-products-wage", &[("wage", ui::format_number(wage))]),
        )
        .parse_mode(ParseMode::Html)
        .await?;
        return Ok(());
    }

    let keyboard = ui::product_list_keyboard(&products, None);
    send_product_media(bot, chat_id, &products, keyboard).await
}

// ---------------------------------------------------------------------------
// Product rendering

async fn search_product_by_code(bot: &Bot, app: &App, chat_id: ChatId, code: &str) -> Result<()> {
    let normalized = text_utils::normalize_digits(code.trim());
    let product = {
        let conn = app.conn.lock().await;
        db::find_product_by_code(&conn, &normalized)?
    };

    match product {
        Some(product) => show_product(bot, app, chat_id, &product).await,
        None => {
            bot.send_message(
                chat_id,
                t_args("product-not-found-code", &[("code", code.to_string())]),
            )
            .parse_mode(ParseMode::Html)
            .await?;
            Ok(())
        }
    }
}

async fn show_product_details(
    bot: &Bot,
    app: &App,
    chat_id: ChatId,
    product_id: i64,
) -> Result<()> {
    let product = {
        let conn = app.conn.lock().await;
        db::find_product(&conn, product_id)?
    };

    match product {
        Some(product) if product.status == "active" => {
            show_product(bot, app, chat_id, &product).await
        }
        _ => {
            bot.send_message(chat_id, t("product-not-found")).await?;
            Ok(())
        }
    }
}

/// Renders one product: its single media reference, with the stored URL as a
/// second attempt for photos, and a plain-text fallback when nothing sends.
async fn show_product(bot: &Bot, app: &App, chat_id: ChatId, product: &Product) -> Result<()> {
    if try_send_media(bot, chat_id, product, None).await {
        return Ok(());
    }

    let (category_name, collection_name) = {
        let conn = app.conn.lock().await;
        let category_name = db::find_category(&conn, product.category_id)?.map(|c| c.name);
        let collection_name = match product.collection_id {
            Some(collection_id) => db::find_collection(&conn, collection_id)?.map(|c| c.name),
            None => None,
        };
        (category_name, collection_name)
    };

    bot.send_message(
        chat_id,
        ui::format_product_text_fallback(
            product,
            category_name.as_deref(),
            collection_name.as_deref(),
        ),
    )
    .await?;
    Ok(())
}

fn has_sendable_media(product: &Product) -> bool {
    product.media().is_some() || product.image_path.is_some()
}

/// One send attempt for a product's media slot. Photo references fall back
/// to the stored URL when the cached file id has gone stale. Send failures
/// are swallowed; the caller decides on a fallback.
async fn try_send_media(
    bot: &Bot,
    chat_id: ChatId,
    product: &Product,
    keyboard: Option<ReplyMarkup>,
) -> bool {
    let url_input = || {
        product
            .image_path
            .as_deref()
            .and_then(|path| path.parse::<Url>().ok())
            .map(InputFile::url)
    };

    match product.media() {
        Some(ProductMedia::Photo(file_id)) => {
            let request = bot.send_photo(chat_id, InputFile::file_id(FileId(file_id)));
            let sent = match keyboard.clone() {
                Some(keyboard) => request.reply_markup(keyboard).await.is_ok(),
                None => request.await.is_ok(),
            };
            if sent {
                return true;
            }
            if let Some(input) = url_input() {
                let request = bot.send_photo(chat_id, input);
                return match keyboard {
                    Some(keyboard) => request.reply_markup(keyboard).await.is_ok(),
                    None => request.await.is_ok(),
                };
            }
            false
        }
        Some(ProductMedia::Video(file_id)) => {
            let request = bot.send_video(chat_id, InputFile::file_id(FileId(file_id)));
            match keyboard {
                Some(keyboard) => request.reply_markup(keyboard).await.is_ok(),
                None => request.await.is_ok(),
            }
        }
        Some(ProductMedia::Animation(file_id)) => {
            let request = bot.send_animation(chat_id, InputFile::file_id(FileId(file_id)));
            match keyboard {
                Some(keyboard) => request.reply_markup(keyboard).await.is_ok(),
                None => request.await.is_ok(),
            }
        }
        None => {
            if let Some(input) = url_input() {
                let request = bot.send_photo(chat_id, input);
                return match keyboard {
                    Some(keyboard) => request.reply_markup(keyboard).await.is_ok(),
                    None => request.await.is_ok(),
                };
            }
            false
        }
    }
}

/// Sends a listing as a burst of media messages, attaching the navigation
/// keyboard to the last one so it lands at the bottom of the burst.
async fn send_product_media(
    bot: &Bot,
    chat_id: ChatId,
    products: &[Product],
    keyboard: teloxide::types::KeyboardMarkup,
) -> Result<()> {
    let with_media: Vec<&Product> = products.iter().filter(|p| has_sendable_media(p)).collect();

    if with_media.is_empty() {
        bot.send_message(chat_id, t("media-list-placeholder"))
            .reply_markup(keyboard)
            .await?;
        return Ok(());
    }

    let last_index = with_media.len() - 1;
    let mut sent_any = false;
    let mut placeholder_sent = false;

    for (index, product) in with_media.iter().enumerate() {
        let is_last = index == last_index;
        let markup = is_last.then(|| ReplyMarkup::Keyboard(keyboard.clone()));
        let sent = try_send_media(bot, chat_id, product, markup).await;
        sent_any |= sent;

        // The keyboard must still reach the chat when the last send dies.
        if is_last && !sent {
            bot.send_message(chat_id, t("placeholder-box"))
                .reply_markup(keyboard.clone())
                .await?;
            placeholder_sent = true;
        }
    }

    if !sent_any && !placeholder_sent {
        bot.send_message(chat_id, t("placeholder-box"))
            .reply_markup(keyboard)
            .await?;
    }
    Ok(())
}

fn is_numeric_text(text: &str) -> bool {
    let normalized = text_utils::normalize_digits(text.trim());
    !normalized.is_empty() && normalized.parse::<f64>().is_ok()
}

/// Edits the tapped message in place, falling back to a fresh message when
/// the edit is rejected (identical content, or the message is too old).
async fn edit_or_send(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    text: &str,
    keyboard: Option<InlineKeyboardMarkup>,
) -> Result<()> {
    let edit = bot
        .edit_message_text(chat_id, message_id, text)
        .parse_mode(ParseMode::Html);
    let edited = match keyboard.clone() {
        Some(keyboard) => edit.reply_markup(keyboard).await.is_ok(),
        None => edit.await.is_ok(),
    };
    if !edited {
        let send = bot.send_message(chat_id, text).parse_mode(ParseMode::Html);
        match keyboard {
            Some(keyboard) => {
                send.reply_markup(keyboard).await?;
            }
            None => {
                send.await?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_prompt_spent_by_any_input() {
        // Matching or not, one attempt ends the prompt.
        let hit = search_step(&UserState::AwaitingProductCode, "1001");
        assert_eq!(hit, SearchStep::CodeLookup("1001".to_string()));
        assert!(!hit.keeps_state());

        let miss = search_step(&UserState::AwaitingProductCode, "یافت نشد");
        assert_eq!(miss, SearchStep::CodeLookup("یافت نشد".to_string()));
        assert!(!miss.keeps_state());
    }

    #[test]
    fn test_numeric_prompts_survive_bad_input() {
        let state = UserState::AwaitingWeight {
            category_id: Some(3),
            collection_id: None,
        };
        let bad = search_step(&state, "لباس");
        assert_eq!(bad, SearchStep::RepromptWeight);
        assert!(bad.keeps_state());

        let good = search_step(&state, " ۸.۵ ");
        assert_eq!(
            good,
            SearchStep::WeightLookup {
                weight: 8.5,
                category_id: Some(3),
                collection_id: None,
            }
        );
        assert!(!good.keeps_state());
    }

    #[test]
    fn test_wage_prompt_carries_scope() {
        let state = UserState::AwaitingWage {
            category_id: Some(2),
            collection_id: Some(7),
        };
        assert_eq!(search_step(&state, "صفر"), SearchStep::RepromptWage);
        assert_eq!(
            search_step(&state, "۷"),
            SearchStep::WageLookup {
                wage: 7.0,
                category_id: Some(2),
                collection_id: Some(7),
            }
        );
    }

    #[test]
    fn test_registration_two_step_walk() {
        assert_eq!(registration_step(None, "سلام"), RegistrationStep::AskFirstName);
        assert_eq!(
            registration_step(Some(UserState::AwaitingFirstName), "علی"),
            RegistrationStep::AskLastName {
                first_name: "علی".to_string(),
            }
        );
        assert_eq!(
            registration_step(
                Some(UserState::AwaitingLastName {
                    first_name: "علی".to_string(),
                }),
                "رضایی",
            ),
            RegistrationStep::CreateUser {
                first_name: "علی".to_string(),
                last_name: "رضایی".to_string(),
            }
        );
    }
}
