//! Callback payload codec.
//!
//! Inline buttons carry flat `action[:arg]*` strings with positional,
//! untyped arguments; `"0"` is the sentinel for "none/skip". There is no
//! escaping, so arguments must never contain `:` themselves (they are
//! numeric ids and enum tokens only). Raw payloads are decoded into typed
//! actions here at the boundary and nowhere else.

use crate::state::ProductField;

/// A decoded payload: the action token plus its positional arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackData {
    pub action: String,
    pub args: Vec<String>,
}

impl CallbackData {
    pub fn decode(payload: &str) -> Self {
        let mut parts = payload.split(':');
        let action = parts.next().unwrap_or_default().to_string();
        let args = parts.map(str::to_string).collect();
        Self { action, args }
    }

    pub fn encode(action: &str, args: &[&str]) -> String {
        if args.is_empty() {
            action.to_string()
        } else {
            format!("{}:{}", action, args.join(":"))
        }
    }

    fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    fn arg_i64(&self, index: usize) -> Option<i64> {
        self.arg(index)?.parse().ok()
    }

    fn arg_f64(&self, index: usize) -> Option<f64> {
        self.arg(index)?.parse().ok()
    }

    /// Positional id argument with the `"0"` sentinel mapped to `None`.
    fn arg_optional_id(&self, index: usize) -> Option<i64> {
        match self.arg(index) {
            Some("0") | None => None,
            Some(value) => value.parse().ok(),
        }
    }
}

/// Shopping actions always handled by the end-user flow, regardless of the
/// actor's role. Operators browse the catalog with the same buttons.
const SHOPPING_ACTIONS: &[&str] = &[
    "weight_search_category",
    "weight_search_collection",
    "weight_range",
    "wage_search_category",
    "wage_search_collection",
    "wage_range",
    "weight",
    "wage",
    "filter",
    "category",
    "category_collection",
    "category_weight",
    "category_wage",
    "category_all",
    "collection",
    "product",
];

pub fn is_shopping_action(action: &str) -> bool {
    SHOPPING_ACTIONS.contains(&action)
}

/// Target of the standalone filter-type chooser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Category,
    Collection,
    Weight,
    Wage,
}

impl FilterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKind::Category => "category",
            FilterKind::Collection => "collection",
            FilterKind::Weight => "weight",
            FilterKind::Wage => "wage",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "category" => Some(FilterKind::Category),
            "collection" => Some(FilterKind::Collection),
            "weight" => Some(FilterKind::Weight),
            "wage" => Some(FilterKind::Wage),
            _ => None,
        }
    }
}

/// Actions reachable from the storefront inline keyboards.
#[derive(Debug, Clone, PartialEq)]
pub enum UserAction {
    Category { category_id: i64, offset: i64 },
    CategoryCollections { category_id: i64 },
    CategoryWeightRanges { category_id: i64 },
    CategoryWageRanges { category_id: i64 },
    CategoryAll { category_id: i64, offset: i64 },
    Collection { collection_id: i64 },
    Product { product_id: i64 },
    Weight { weight: f64 },
    Wage { wage: f64 },
    WeightSearchCategory { category_id: i64 },
    WeightSearchCollection { category_id: i64, collection_id: Option<i64> },
    WeightRange { range_id: i64, category_id: Option<i64>, collection_id: Option<i64> },
    WageSearchCategory { category_id: i64 },
    WageSearchCollection { category_id: i64, collection_id: Option<i64> },
    WageRange { range_id: i64, category_id: Option<i64>, collection_id: Option<i64> },
    Filter { kind: Option<FilterKind> },
    Back,
    CheckChannelMembership,
}

impl UserAction {
    pub fn decode(payload: &str) -> Option<Self> {
        let data = CallbackData::decode(payload);

        // `category`/`category_all` carry an optional trailing
        // `offset:<n>` pair for pagination re-entry.
        let trailing_offset = if data.arg(1) == Some("offset") {
            data.arg_i64(2).unwrap_or(0)
        } else {
            0
        };

        match data.action.as_str() {
            "category" => Some(UserAction::Category {
                category_id: data.arg_i64(0)?,
                offset: trailing_offset,
            }),
            "category_collection" => Some(UserAction::CategoryCollections {
                category_id: data.arg_i64(0)?,
            }),
            "category_weight" => Some(UserAction::CategoryWeightRanges {
                category_id: data.arg_i64(0)?,
            }),
            "category_wage" => Some(UserAction::CategoryWageRanges {
                category_id: data.arg_i64(0)?,
            }),
            "category_all" => Some(UserAction::CategoryAll {
                category_id: data.arg_i64(0)?,
                offset: trailing_offset,
            }),
            "collection" => Some(UserAction::Collection {
                collection_id: data.arg_i64(0)?,
            }),
            "product" => Some(UserAction::Product {
                product_id: data.arg_i64(0)?,
            }),
            "weight" => Some(UserAction::Weight {
                weight: data.arg_f64(0)?,
            }),
            "wage" => Some(UserAction::Wage {
                wage: data.arg_f64(0)?,
            }),
            "weight_search_category" => Some(UserAction::WeightSearchCategory {
                category_id: data.arg_i64(0)?,
            }),
            "weight_search_collection" => Some(UserAction::WeightSearchCollection {
                category_id: data.arg_i64(0)?,
                collection_id: data.arg_optional_id(1),
            }),
            "weight_range" => Some(UserAction::WeightRange {
                range_id: data.arg_i64(0)?,
                category_id: data.arg_optional_id(1),
                collection_id: data.arg_optional_id(2),
            }),
            "wage_search_category" => Some(UserAction::WageSearchCategory {
                category_id: data.arg_i64(0)?,
            }),
            "wage_search_collection" => Some(UserAction::WageSearchCollection {
                category_id: data.arg_i64(0)?,
                collection_id: data.arg_optional_id(1),
            }),
            "wage_range" => Some(UserAction::WageRange {
                range_id: data.arg_i64(0)?,
                category_id: data.arg_optional_id(1),
                collection_id: data.arg_optional_id(2),
            }),
            "filter" => Some(UserAction::Filter {
                kind: data.arg(0).and_then(FilterKind::parse),
            }),
            "back" => Some(UserAction::Back),
            "check_channel_membership" => Some(UserAction::CheckChannelMembership),
            _ => None,
        }
    }
}

/// Actions reachable from the operator inline keyboards.
#[derive(Debug, Clone, PartialEq)]
pub enum AdminAction {
    AdminMenu,
    CancelAddProduct,
    CategorySelect { category_id: i64 },
    CollectionSelect { collection_id: Option<i64> },
    EditProductField { product_id: i64, field: ProductField },
    EditCategorySelect { product_id: i64, category_id: i64 },
    EditCollectionSelect { product_id: i64, collection_id: Option<i64> },
    DeleteProduct { product_id: i64 },
    DisableProduct { product_id: i64 },
    AddCategory,
    DeleteCategory { category_id: i64 },
    AddCollection,
    SelectCollectionCategory { category_id: Option<i64> },
    SetCollectionWage { collection_id: i64 },
    DeleteCollection { collection_id: i64 },
    AddWeightRange,
    WeightRangeCategorySelect { category_id: Option<i64> },
    DeleteWeightRange { range_id: i64 },
    AddWageRange,
    WageRangeCategorySelect { category_id: Option<i64> },
    DeleteWageRange { range_id: i64 },
    ApproveUser { telegram_id: i64 },
    RejectUser { telegram_id: i64 },
    ManageUserLevel { telegram_id: i64 },
    SetUserLevel { telegram_id: i64, level: String },
    SearchUserLevel,
    ClearUserSearch,
    DeleteUser { telegram_id: i64 },
    ConfirmDeleteUserYes { telegram_id: i64 },
    ConfirmDeleteUserNo,
    EditContactAddress,
    EditContactPhone,
}

impl AdminAction {
    pub fn decode(payload: &str) -> Option<Self> {
        let data = CallbackData::decode(payload);

        match data.action.as_str() {
            "admin_menu" => Some(AdminAction::AdminMenu),
            "cancel_add_product" => Some(AdminAction::CancelAddProduct),
            "category_select" => Some(AdminAction::CategorySelect {
                category_id: data.arg_i64(0)?,
            }),
            "collection_select" => Some(AdminAction::CollectionSelect {
                collection_id: data.arg_optional_id(0),
            }),
            "edit_product_field" => Some(AdminAction::EditProductField {
                product_id: data.arg_i64(0)?,
                field: ProductField::parse(data.arg(1)?)?,
            }),
            "edit_category_select" => Some(AdminAction::EditCategorySelect {
                product_id: data.arg_i64(0)?,
                category_id: data.arg_i64(1)?,
            }),
            "edit_collection_select" => Some(AdminAction::EditCollectionSelect {
                product_id: data.arg_i64(0)?,
                collection_id: data.arg_optional_id(1),
            }),
            "delete_product" => Some(AdminAction::DeleteProduct {
                product_id: data.arg_i64(0)?,
            }),
            "disable_product" => Some(AdminAction::DisableProduct {
                product_id: data.arg_i64(0)?,
            }),
            "add_category" => Some(AdminAction::AddCategory),
            "delete_category" => Some(AdminAction::DeleteCategory {
                category_id: data.arg_i64(0)?,
            }),
            "add_collection" => Some(AdminAction::AddCollection),
            "select_collection_category" => Some(AdminAction::SelectCollectionCategory {
                category_id: data.arg_optional_id(0),
            }),
            "set_collection_wage" => Some(AdminAction::SetCollectionWage {
                collection_id: data.arg_i64(0)?,
            }),
            "delete_collection" => Some(AdminAction::DeleteCollection {
                collection_id: data.arg_i64(0)?,
            }),
            "add_weight_range" => Some(AdminAction::AddWeightRange),
            "weight_range_category_select" => Some(AdminAction::WeightRangeCategorySelect {
                category_id: data.arg_optional_id(0),
            }),
            "delete_weight_range" => Some(AdminAction::DeleteWeightRange {
                range_id: data.arg_i64(0)?,
            }),
            "add_wage_range" => Some(AdminAction::AddWageRange),
            "wage_range_category_select" => Some(AdminAction::WageRangeCategorySelect {
                category_id: data.arg_optional_id(0),
            }),
            "delete_wage_range" => Some(AdminAction::DeleteWageRange {
                range_id: data.arg_i64(0)?,
            }),
            "approve_user" => Some(AdminAction::ApproveUser {
                telegram_id: data.arg_i64(0)?,
            }),
            "reject_user" => Some(AdminAction::RejectUser {
                telegram_id: data.arg_i64(0)?,
            }),
            "manage_user_level" => Some(AdminAction::ManageUserLevel {
                telegram_id: data.arg_i64(0)?,
            }),
            "set_user_level" => Some(AdminAction::SetUserLevel {
                telegram_id: data.arg_i64(0)?,
                level: data.arg(1)?.to_string(),
            }),
            "search_user_level" => Some(AdminAction::SearchUserLevel),
            "clear_user_search" => Some(AdminAction::ClearUserSearch),
            "delete_user" => Some(AdminAction::DeleteUser {
                telegram_id: data.arg_i64(0)?,
            }),
            "confirm_delete_user_yes" => Some(AdminAction::ConfirmDeleteUserYes {
                telegram_id: data.arg_i64(0)?,
            }),
            "confirm_delete_user_no" => Some(AdminAction::ConfirmDeleteUserNo),
            "edit_contact_address" => Some(AdminAction::EditContactAddress),
            "edit_contact_phone" => Some(AdminAction::EditContactPhone),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_splits_action_and_args() {
        let data = CallbackData::decode("weight_range:5:3:0");
        assert_eq!(data.action, "weight_range");
        assert_eq!(data.args, vec!["5", "3", "0"]);
    }

    #[test]
    fn test_decode_missing_args_are_absent() {
        let data = CallbackData::decode("filter");
        assert_eq!(data.action, "filter");
        assert!(data.args.is_empty());
        assert_eq!(data.arg(0), None);
    }

    #[test]
    fn test_encode_round_trip() {
        let payload = CallbackData::encode("set_user_level", &["12345", "vip"]);
        assert_eq!(payload, "set_user_level:12345:vip");

        let data = CallbackData::decode(&payload);
        assert_eq!(data.action, "set_user_level");
        assert_eq!(data.args, vec!["12345", "vip"]);
    }

    #[test]
    fn test_zero_sentinel_means_none() {
        let action = UserAction::decode("weight_range:5:3:0");
        assert_eq!(
            action,
            Some(UserAction::WeightRange {
                range_id: 5,
                category_id: Some(3),
                collection_id: None
            })
        );
    }

    #[test]
    fn test_shopping_actions_route_to_user_flow() {
        for action in [
            "category", "category_all", "collection", "product", "filter", "weight",
            "wage", "weight_range", "wage_range", "weight_search_category",
            "weight_search_collection", "wage_search_category", "wage_search_collection",
            "category_collection", "category_weight", "category_wage",
        ] {
            assert!(is_shopping_action(action), "{action} should be shopping");
        }
        assert!(!is_shopping_action("delete_product"));
        assert!(!is_shopping_action("admin_menu"));
        assert!(!is_shopping_action("back"));
    }

    #[test]
    fn test_user_action_category_offset() {
        assert_eq!(
            UserAction::decode("category:7"),
            Some(UserAction::Category {
                category_id: 7,
                offset: 0
            })
        );
        assert_eq!(
            UserAction::decode("category:7:offset:20"),
            Some(UserAction::Category {
                category_id: 7,
                offset: 20
            })
        );
    }

    #[test]
    fn test_admin_action_edit_field() {
        use crate::state::ProductField;
        assert_eq!(
            AdminAction::decode("edit_product_field:9:wage_percentage"),
            Some(AdminAction::EditProductField {
                product_id: 9,
                field: ProductField::Wage
            })
        );
        assert_eq!(AdminAction::decode("edit_product_field:9:status"), None);
    }

    #[test]
    fn test_filter_kind_optional() {
        assert_eq!(UserAction::decode("filter"), Some(UserAction::Filter { kind: None }));
        assert_eq!(
            UserAction::decode("filter:weight"),
            Some(UserAction::Filter {
                kind: Some(FilterKind::Weight)
            })
        );
        assert_eq!(
            UserAction::decode("filter:bogus"),
            Some(UserAction::Filter { kind: None })
        );
    }

    #[test]
    fn test_unknown_action_rejected() {
        assert_eq!(UserAction::decode("drop_tables"), None);
        assert_eq!(AdminAction::decode("drop_tables"), None);
    }

    #[test]
    fn test_malformed_id_rejected() {
        assert_eq!(UserAction::decode("category:abc"), None);
        assert_eq!(AdminAction::decode("approve_user:abc"), None);
    }
}
