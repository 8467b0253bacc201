//! Cross-module flows: callback payloads built from real store ids, typed
//! input normalization feeding lookups, and wizard state bookkeeping.

use anyhow::Result;
use goldshop::callback::{AdminAction, CallbackData, UserAction};
use goldshop::db::{self, ProductMedia, UserLevel};
use goldshop::state::{AdminState, ConversationStore, MediaRef, ProductDraft, UserState};
use goldshop::text_utils;
use rusqlite::Connection;

fn setup() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    db::run_migrations(&conn)?;
    Ok(conn)
}

#[test]
fn test_catalog_buttons_decode_to_store_ids() -> Result<()> {
    let conn = setup()?;
    let rings = db::create_category(&conn, "انگشتر")?;
    let classic = db::create_collection(&conn, "کلاسیک", Some(rings), Some(8.0))?;
    let product_id = db::create_product(
        &conn,
        "1001",
        "1001",
        &ProductMedia::Photo("file-1001".into()),
        rings,
        Some(classic),
        Some(8.0),
        Some(3.0),
    )?;

    let payload = CallbackData::encode("product", &[&product_id.to_string()]);
    let Some(UserAction::Product { product_id: decoded }) = UserAction::decode(&payload) else {
        panic!("product payload should decode");
    };
    assert!(db::find_product(&conn, decoded)?.is_some());

    let payload = CallbackData::encode("weight_range", &["5", &rings.to_string(), "0"]);
    assert_eq!(
        UserAction::decode(&payload),
        Some(UserAction::WeightRange {
            range_id: 5,
            category_id: Some(rings),
            collection_id: None
        })
    );
    Ok(())
}

#[test]
fn test_persian_code_input_reaches_lookup() -> Result<()> {
    let conn = setup()?;
    let rings = db::create_category(&conn, "انگشتر")?;
    db::create_product(
        &conn,
        "1001",
        "1001",
        &ProductMedia::Photo("file-1001".into()),
        rings,
        None,
        None,
        Some(3.0),
    )?;

    let typed = " ۱۰۰۱ ";
    let code = text_utils::validate_product_code(typed).expect("digits should validate");
    assert!(db::find_product_by_code(&conn, &code)?.is_some());

    assert!(text_utils::validate_product_code("100").is_none());
    assert!(text_utils::validate_product_code("10011").is_none());
    assert!(text_utils::validate_product_code("10a1").is_none());
    Ok(())
}

#[test]
fn test_add_product_wizard_state_walk() {
    let store: ConversationStore<AdminState> = ConversationStore::new();
    let operator = 42;

    assert!(!store.is_active(operator));
    store.set(operator, AdminState::AddProductMedia);
    assert!(store.is_active(operator));

    let draft = ProductDraft {
        media: Some(MediaRef::Photo("file-abc".into())),
        ..Default::default()
    };
    store.set(operator, AdminState::AddProductCategory { draft });

    let Some(AdminState::AddProductCategory { mut draft }) = store.get(operator) else {
        panic!("state should survive a round trip");
    };
    draft.category_id = Some(7);
    draft.collection_wage = Some(8.0);
    store.set(operator, AdminState::AddProductCode { draft });

    let Some(AdminState::AddProductCode { draft }) = store.get(operator) else {
        panic!("state should survive a round trip");
    };
    assert_eq!(draft.category_id, Some(7));
    assert_eq!(draft.collection_wage, Some(8.0));

    store.clear(operator);
    assert!(!store.is_active(operator));
}

#[test]
fn test_states_are_isolated_per_actor() {
    let store: ConversationStore<UserState> = ConversationStore::new();
    store.set(1, UserState::AwaitingFirstName);
    store.set(
        2,
        UserState::AwaitingLastName {
            first_name: "علی".into(),
        },
    );

    assert_eq!(store.get(1), Some(UserState::AwaitingFirstName));
    let Some(UserState::AwaitingLastName { first_name }) = store.get(2) else {
        panic!("actor 2 keeps its own state");
    };
    assert_eq!(first_name, "علی");

    store.clear(1);
    assert!(!store.is_active(1));
    assert!(store.is_active(2));
}

#[test]
fn test_media_ref_maps_to_single_slot() -> Result<()> {
    let conn = setup()?;
    let rings = db::create_category(&conn, "انگشتر")?;

    let media: ProductMedia = MediaRef::Video("vid-1".into()).into();
    let id = db::create_product(&conn, "1001", "1001", &media, rings, None, None, Some(1.0))?;

    let product = db::find_product(&conn, id)?.unwrap();
    assert_eq!(product.video_file_id.as_deref(), Some("vid-1"));
    assert!(product.image_file_id.is_none());
    assert!(product.animation_file_id.is_none());

    db::update_product_media(&conn, id, &MediaRef::Photo("pic-2".into()).into())?;
    let product = db::find_product(&conn, id)?.unwrap();
    assert_eq!(product.image_file_id.as_deref(), Some("pic-2"));
    assert!(product.video_file_id.is_none());
    Ok(())
}

#[test]
fn test_admin_buttons_decode_against_store() -> Result<()> {
    let conn = setup()?;
    db::create_user(&conn, 100, "علی", "حسینی")?;

    let payload = CallbackData::encode("set_user_level", &["100", "level3"]);
    let Some(AdminAction::SetUserLevel { telegram_id, level }) = AdminAction::decode(&payload)
    else {
        panic!("level payload should decode");
    };
    assert_eq!(telegram_id, 100);
    assert!(db::find_user_by_telegram_id(&conn, telegram_id)?.is_some());
    assert_eq!(UserLevel::parse(&level), Some(UserLevel::Level3));
    Ok(())
}
