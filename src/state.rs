//! Per-actor conversation state for both flows.
//!
//! Each flow owns one [`ConversationStore`] keyed by telegram id. Wizard
//! steps are enum variants carrying exactly the fields that step needs, so
//! there is no untyped scratch bag to mis-key. State lives in memory only
//! and is dropped on restart.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::db::ProductMedia;

/// In-memory conversation table keyed by actor id.
#[derive(Debug, Default)]
pub struct ConversationStore<S> {
    entries: Mutex<HashMap<i64, S>>,
}

impl<S: Clone> ConversationStore<S> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, actor_id: i64) -> Option<S> {
        match self.entries.lock() {
            Ok(entries) => entries.get(&actor_id).cloned(),
            Err(poisoned) => poisoned.into_inner().get(&actor_id).cloned(),
        }
    }

    pub fn set(&self, actor_id: i64, state: S) {
        match self.entries.lock() {
            Ok(mut entries) => {
                entries.insert(actor_id, state);
            }
            Err(poisoned) => {
                poisoned.into_inner().insert(actor_id, state);
            }
        }
    }

    /// Removes the actor's entry, state and carried data together.
    pub fn clear(&self, actor_id: i64) {
        match self.entries.lock() {
            Ok(mut entries) => {
                entries.remove(&actor_id);
            }
            Err(poisoned) => {
                poisoned.into_inner().remove(&actor_id);
            }
        }
    }

    pub fn is_active(&self, actor_id: i64) -> bool {
        self.get(actor_id).is_some()
    }
}

/// Media captured during the add/edit product wizards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MediaRef {
    Photo(String),
    Video(String),
    Animation(String),
}

impl From<MediaRef> for ProductMedia {
    fn from(media: MediaRef) -> Self {
        match media {
            MediaRef::Photo(file_id) => ProductMedia::Photo(file_id),
            MediaRef::Video(file_id) => ProductMedia::Video(file_id),
            MediaRef::Animation(file_id) => ProductMedia::Animation(file_id),
        }
    }
}

/// End-user conversation states. Absence of an entry means idle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UserState {
    AwaitingFirstName,
    AwaitingLastName {
        first_name: String,
    },
    AwaitingProductCode,
    AwaitingWeight {
        category_id: Option<i64>,
        collection_id: Option<i64>,
    },
    AwaitingWage {
        category_id: Option<i64>,
        collection_id: Option<i64>,
    },
}

/// Accumulated fields of the add-product wizard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub media: Option<MediaRef>,
    pub category_id: Option<i64>,
    pub collection_id: Option<i64>,
    pub collection_wage: Option<f64>,
    pub product_code: Option<String>,
    pub wage_percentage: Option<f64>,
}

/// Operator conversation states. Absence of an entry means the operator is
/// at the panel menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AdminState {
    // Add product wizard
    AddProductMedia,
    AddProductCategory { draft: ProductDraft },
    AddProductCollection { draft: ProductDraft },
    AddProductCode { draft: ProductDraft },
    AddProductWage { draft: ProductDraft },
    AddProductWeight { draft: ProductDraft },

    // Edit product wizard
    EditProductCode,
    EditProductValue { product_id: i64, field: ProductField },

    // Delete / disable product
    DeleteProductCode,

    // Category management
    AddCategoryName,

    // Collection management
    AddCollectionName { category_id: Option<i64> },
    AddCollectionWage { name: String, category_id: Option<i64> },
    SetCollectionWage { collection_id: i64 },

    // Range management
    AddWeightRangeName,
    AddWeightRangeMin { name: String, category_id: Option<i64> },
    AddWeightRangeMax { name: String, category_id: Option<i64>, min: f64 },
    AddWageRangeName,
    AddWageRangeMin { name: String, category_id: Option<i64> },
    AddWageRangeMax { name: String, category_id: Option<i64>, min: f64 },

    // User management
    SearchUserQuery,

    // Contact editing, each carrying the untouched other field
    EditContactAddress { phone: String },
    EditContactPhone { address: String },
}

/// Editable product fields offered by the field picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductField {
    Code,
    Name,
    Category,
    Collection,
    Wage,
    Weight,
    Image,
}

impl ProductField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductField::Code => "product_code",
            ProductField::Name => "name",
            ProductField::Category => "category_id",
            ProductField::Collection => "collection_id",
            ProductField::Wage => "wage_percentage",
            ProductField::Weight => "weight",
            ProductField::Image => "image",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "product_code" => Some(ProductField::Code),
            "name" => Some(ProductField::Name),
            "category_id" => Some(ProductField::Category),
            "collection_id" => Some(ProductField::Collection),
            "wage_percentage" => Some(ProductField::Wage),
            "weight" => Some(ProductField::Weight),
            "image" => Some(ProductField::Image),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_isolation_between_actors() {
        let store = ConversationStore::new();
        store.set(1, UserState::AwaitingFirstName);
        store.set(
            2,
            UserState::AwaitingLastName {
                first_name: "Ali".into(),
            },
        );

        store.clear(1);

        assert_eq!(store.get(1), None);
        assert_eq!(
            store.get(2),
            Some(UserState::AwaitingLastName {
                first_name: "Ali".into()
            })
        );
    }

    #[test]
    fn test_clear_removes_state_and_data() {
        let store = ConversationStore::new();
        store.set(
            7,
            AdminState::AddWeightRangeMax {
                name: "light".into(),
                category_id: Some(3),
                min: 6.0,
            },
        );
        assert!(store.is_active(7));

        store.clear(7);

        assert!(!store.is_active(7));
        assert_eq!(store.get(7), None);
    }

    #[test]
    fn test_last_write_wins() {
        let store = ConversationStore::new();
        store.set(5, UserState::AwaitingProductCode);
        store.set(
            5,
            UserState::AwaitingWeight {
                category_id: Some(1),
                collection_id: None,
            },
        );

        assert_eq!(
            store.get(5),
            Some(UserState::AwaitingWeight {
                category_id: Some(1),
                collection_id: None
            })
        );
    }

    #[test]
    fn test_product_field_round_trip() {
        for field in [
            ProductField::Code,
            ProductField::Name,
            ProductField::Category,
            ProductField::Collection,
            ProductField::Wage,
            ProductField::Weight,
            ProductField::Image,
        ] {
            assert_eq!(ProductField::parse(field.as_str()), Some(field));
        }
        assert_eq!(ProductField::parse("status"), None);
    }
}
