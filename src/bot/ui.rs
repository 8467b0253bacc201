//! UI builder module for creating keyboards and formatting message fragments

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup};
use url::Url;

use crate::callback::CallbackData;
use crate::db::{self, Category, Collection, Product, WageRange, WeightRange};
use crate::localization::{t, t_args};

/// Which numeric attribute a preset search targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeKind {
    Weight,
    Wage,
}

impl RangeKind {
    fn prefix(&self) -> &'static str {
        match self {
            RangeKind::Weight => "weight",
            RangeKind::Wage => "wage",
        }
    }
}

/// Products listed per page in the paginated category view.
pub const PRODUCTS_PAGE_SIZE: i64 = 10;

/// Main menu reply keyboard; operators get an extra panel button.
pub fn main_menu_keyboard(is_admin: bool) -> KeyboardMarkup {
    let mut second_row = vec![KeyboardButton::new(t("btn-contact"))];
    if is_admin {
        second_row.push(KeyboardButton::new(t("btn-admin-panel")));
    }
    KeyboardMarkup::new(vec![
        vec![
            KeyboardButton::new(t("btn-products")),
            KeyboardButton::new(t("btn-search-products")),
        ],
        second_row,
    ])
    .resize_keyboard()
}

/// Operator panel reply keyboard, two buttons per row.
pub fn admin_menu_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![
            KeyboardButton::new(t("btn-admin-add-product")),
            KeyboardButton::new(t("btn-admin-edit-product")),
        ],
        vec![
            KeyboardButton::new(t("btn-admin-delete-product")),
            KeyboardButton::new(t("btn-admin-categories")),
        ],
        vec![
            KeyboardButton::new(t("btn-admin-collections")),
            KeyboardButton::new(t("btn-admin-weight-ranges")),
        ],
        vec![
            KeyboardButton::new(t("btn-admin-wage-ranges")),
            KeyboardButton::new(t("btn-admin-approve-users")),
        ],
        vec![
            KeyboardButton::new(t("btn-admin-user-list")),
            KeyboardButton::new(t("btn-admin-user-levels")),
        ],
        vec![KeyboardButton::new(t("btn-admin-contact"))],
        vec![KeyboardButton::new(t("btn-back-main"))],
    ])
    .resize_keyboard()
}

/// A reply keyboard with only the back button.
pub fn back_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![KeyboardButton::new(t("btn-back"))]]).resize_keyboard()
}

/// Category names as reply-keyboard buttons, two per row, back row last.
pub fn categories_keyboard(categories: &[Category]) -> KeyboardMarkup {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    for category in categories {
        row.push(KeyboardButton::new(category.name.clone()));
        if row.len() == 2 {
            rows.push(std::mem::take(&mut row));
        }
    }
    if !row.is_empty() {
        rows.push(row);
    }
    rows.push(vec![KeyboardButton::new(t("btn-back"))]);
    KeyboardMarkup::new(rows).resize_keyboard()
}

/// Per-product view buttons (four per row), an optional previous/next row
/// carrying the offset in the label text, and the back row. Navigation is
/// matched as text on the next inbound message, not as a callback.
pub fn product_list_keyboard(
    products: &[Product],
    nav: Option<(i64, i64, i64)>,
) -> KeyboardMarkup {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    for product in products {
        row.push(KeyboardButton::new(t_args(
            "btn-view-code",
            &[("code", product.product_code.clone())],
        )));
        if row.len() == 4 {
            rows.push(std::mem::take(&mut row));
        }
    }
    if !row.is_empty() {
        rows.push(row);
    }

    if let Some((category_id, offset, total)) = nav {
        let mut nav_row = Vec::new();
        if offset > 0 {
            nav_row.push(KeyboardButton::new(t_args(
                "btn-prev-page",
                &[
                    ("category", category_id.to_string()),
                    ("offset", (offset - PRODUCTS_PAGE_SIZE).to_string()),
                ],
            )));
        }
        if offset + PRODUCTS_PAGE_SIZE < total {
            nav_row.push(KeyboardButton::new(t_args(
                "btn-next-page",
                &[
                    ("category", category_id.to_string()),
                    ("offset", (offset + PRODUCTS_PAGE_SIZE).to_string()),
                ],
            )));
        }
        if !nav_row.is_empty() {
            rows.push(nav_row);
        }
    }

    rows.push(vec![KeyboardButton::new(t("btn-back"))]);
    KeyboardMarkup::new(rows).resize_keyboard()
}

/// An inline keyboard of single-button rows.
pub fn single_column(buttons: Vec<(String, String)>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(
        buttons
            .into_iter()
            .map(|(text, payload)| vec![InlineKeyboardButton::callback(text, payload)]),
    )
}

/// Join-channel prompt: a URL button plus the re-check callback.
pub fn join_channel_keyboard(channel_url: &Url) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::url(
            t("btn-join-channel"),
            channel_url.clone(),
        )],
        vec![InlineKeyboardButton::callback(
            t("btn-check-again"),
            "check_channel_membership",
        )],
    ])
}

/// Filter-type menu shown when a category is opened.
pub fn filter_menu_keyboard(category_id: i64) -> InlineKeyboardMarkup {
    let id = category_id.to_string();
    single_column(vec![
        (
            t("btn-filter-collection"),
            CallbackData::encode("category_collection", &[&id]),
        ),
        (
            t("btn-filter-weight"),
            CallbackData::encode("category_weight", &[&id]),
        ),
        (
            t("btn-filter-wage"),
            CallbackData::encode("category_wage", &[&id]),
        ),
        (
            t("btn-filter-all"),
            CallbackData::encode("category_all", &[&id]),
        ),
        (t("btn-back"), "back".to_string()),
    ])
}

/// A collection button label with the level-gated wage suffix when the
/// viewer is allowed to see it.
pub fn collection_button_label(collection: &Collection, viewer_level: &str) -> String {
    match db::display_wage(collection.wage_percentage, viewer_level) {
        Some(wage) => format!(
            "{}{}",
            collection.name,
            t_args("collection-wage-suffix", &[("wage", format_number(wage))])
        ),
        None => collection.name.clone(),
    }
}

/// Collections of a category for browsing; tapping one lists its products.
pub fn browse_collections_keyboard(
    collections: &[Collection],
    viewer_level: &str,
    category_id: i64,
) -> InlineKeyboardMarkup {
    let mut buttons: Vec<(String, String)> = collections
        .iter()
        .map(|collection| {
            (
                collection_button_label(collection, viewer_level),
                CallbackData::encode("collection", &[&collection.id.to_string()]),
            )
        })
        .collect();
    buttons.push((
        t("btn-back"),
        CallbackData::encode("category", &[&category_id.to_string()]),
    ));
    single_column(buttons)
}

/// Collections offered as scope for a weight/wage preset search, with a
/// "no collection" sentinel row.
pub fn search_collections_keyboard(
    kind: RangeKind,
    collections: &[Collection],
    viewer_level: &str,
    category_id: i64,
) -> InlineKeyboardMarkup {
    let action = format!("{}_search_collection", kind.prefix());
    let id = category_id.to_string();
    let mut buttons: Vec<(String, String)> = collections
        .iter()
        .map(|collection| {
            (
                collection_button_label(collection, viewer_level),
                CallbackData::encode(&action, &[&id, &collection.id.to_string()]),
            )
        })
        .collect();
    buttons.push((
        t("btn-no-collection"),
        CallbackData::encode(&action, &[&id, "0"]),
    ));
    buttons.push((t("btn-back"), "back".to_string()));
    single_column(buttons)
}

/// Weight presets for a category; `back_payload` differs between the browse
/// and search entry points.
pub fn weight_ranges_keyboard(
    ranges: &[WeightRange],
    category_id: i64,
    collection_id: Option<i64>,
    back_payload: &str,
) -> InlineKeyboardMarkup {
    let id = category_id.to_string();
    let collection = collection_id.map_or_else(|| "0".to_string(), |c| c.to_string());
    let mut buttons: Vec<(String, String)> = ranges
        .iter()
        .map(|range| {
            (
                t_args(
                    "weight-range-option",
                    &[
                        ("name", range.name.clone()),
                        ("min", format_number(range.min_weight)),
                        ("max", format_number(range.max_weight)),
                    ],
                ),
                CallbackData::encode(
                    "weight_range",
                    &[&range.id.to_string(), &id, &collection],
                ),
            )
        })
        .collect();
    buttons.push((t("btn-back"), back_payload.to_string()));
    single_column(buttons)
}

pub fn wage_ranges_keyboard(
    ranges: &[WageRange],
    category_id: i64,
    collection_id: Option<i64>,
    back_payload: &str,
) -> InlineKeyboardMarkup {
    let id = category_id.to_string();
    let collection = collection_id.map_or_else(|| "0".to_string(), |c| c.to_string());
    let mut buttons: Vec<(String, String)> = ranges
        .iter()
        .map(|range| {
            (
                range.name.clone(),
                CallbackData::encode("wage_range", &[&range.id.to_string(), &id, &collection]),
            )
        })
        .collect();
    buttons.push((t("btn-back"), back_payload.to_string()));
    single_column(buttons)
}

/// Single inline button returning to the main menu.
pub fn main_menu_inline_keyboard() -> InlineKeyboardMarkup {
    single_column(vec![(t("btn-go-main-menu"), "back".to_string())])
}

/// Localized label for a user level tag; unknown tags fall back to the raw
/// stored value.
pub fn level_label(level: &str) -> String {
    match level {
        "general" => t("level-general"),
        "vip" => t("level-vip"),
        "level1" => t("level-1"),
        "level2" => t("level-2"),
        "level3" => t("level-3"),
        "level4" => t("level-4"),
        other => other.to_string(),
    }
}

pub fn status_label(status: &str) -> String {
    match status {
        "approved" => t("status-approved"),
        "pending" => t("status-pending"),
        "rejected" => t("status-rejected"),
        other => other.to_string(),
    }
}

/// Renders a number without a trailing `.0` for whole values, matching how
/// wages and weights appear in button labels and captions.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Plain-text fallback when every media attempt failed. Deliberately has no
/// name line.
pub fn format_product_text_fallback(
    product: &Product,
    category_name: Option<&str>,
    collection_name: Option<&str>,
) -> String {
    let mut lines = vec![t_args(
        "product-summary-code",
        &[("code", product.product_code.clone())],
    )];
    if let Some(category) = category_name {
        lines.push(t_args(
            "product-summary-category",
            &[("category", category.to_string())],
        ));
    }
    if let Some(collection) = collection_name {
        lines.push(t_args(
            "product-summary-collection",
            &[("collection", collection.to_string())],
        ));
    }
    if let Some(wage) = product.wage_percentage {
        lines.push(t_args("product-summary-wage", &[("wage", format_number(wage))]));
    }
    if let Some(weight) = product.weight {
        lines.push(t_args(
            "product-summary-weight",
            &[("weight", format_number(weight))],
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Collection;

    #[test]
    fn test_format_number_trims_whole_values() {
        assert_eq!(format_number(8.0), "8");
        assert_eq!(format_number(8.5), "8.5");
    }

    #[test]
    fn test_collection_label_hides_wage_for_general() {
        let collection = Collection {
            id: 1,
            name: "Classic".into(),
            category_id: None,
            wage_percentage: Some(8.0),
        };
        assert_eq!(collection_button_label(&collection, "general"), "Classic");
        assert!(collection_button_label(&collection, "vip").contains("8"));
        assert!(collection_button_label(&collection, "level2").contains("10"));
    }

    #[test]
    fn test_product_list_keyboard_nav_bounds() {
        // First page of a 25-product category: next only
        let keyboard = product_list_keyboard(&[], Some((3, 0, 25)));
        let flat: Vec<String> = keyboard
            .keyboard
            .iter()
            .flatten()
            .map(|b| b.text.clone())
            .collect();
        assert!(flat.iter().any(|text| text.contains("بعدی:3:10")));
        assert!(!flat.iter().any(|text| text.contains("قبلی")));

        // Last page: previous only
        let keyboard = product_list_keyboard(&[], Some((3, 20, 25)));
        let flat: Vec<String> = keyboard
            .keyboard
            .iter()
            .flatten()
            .map(|b| b.text.clone())
            .collect();
        assert!(flat.iter().any(|text| text.contains("قبلی:3:10")));
        assert!(!flat.iter().any(|text| text.contains("بعدی")));
    }
}
