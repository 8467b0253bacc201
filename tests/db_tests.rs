//! Scenario-level store tests: a small catalog is built up the way the
//! operator wizards would, then queried the way the storefront does.

use anyhow::Result;
use goldshop::db::{self, ProductFilter, ProductMedia, ProductStatus, UserLevel, UserStatus};
use rusqlite::Connection;

fn setup() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    db::run_migrations(&conn)?;
    Ok(conn)
}

fn seed_product(
    conn: &Connection,
    code: &str,
    category_id: i64,
    collection_id: Option<i64>,
    wage: Option<f64>,
    weight: Option<f64>,
) -> Result<i64> {
    db::create_product(
        conn,
        code,
        code,
        &ProductMedia::Photo(format!("file-{code}")),
        category_id,
        collection_id,
        wage,
        weight,
    )
}

#[test]
fn test_storefront_category_browse() -> Result<()> {
    let conn = setup()?;
    let rings = db::create_category(&conn, "انگشتر")?;
    let chains = db::create_category(&conn, "زنجیر")?;

    for i in 0..12 {
        seed_product(&conn, &format!("10{i:02}"), rings, None, Some(7.0), Some(3.5))?;
    }
    seed_product(&conn, "2001", chains, None, Some(9.0), Some(10.0))?;

    let filter = ProductFilter {
        category_id: Some(rings),
        ..Default::default()
    };
    assert_eq!(db::count_products(&conn, &filter)?, 12);

    // First page of ten, then the remainder.
    let page = db::list_products(&conn, &filter, 10, 0)?;
    assert_eq!(page.len(), 10);
    let rest = db::list_products(&conn, &filter, 10, 10)?;
    assert_eq!(rest.len(), 2);

    let other = db::list_products(
        &conn,
        &ProductFilter {
            category_id: Some(chains),
            ..Default::default()
        },
        10,
        0,
    )?;
    assert_eq!(other.len(), 1);
    assert_eq!(other[0].product_code, "2001");
    Ok(())
}

#[test]
fn test_combined_filters_intersect() -> Result<()> {
    let conn = setup()?;
    let rings = db::create_category(&conn, "انگشتر")?;
    let classic = db::create_collection(&conn, "کلاسیک", Some(rings), Some(8.0))?;

    seed_product(&conn, "1001", rings, Some(classic), Some(8.0), Some(2.0))?;
    seed_product(&conn, "1002", rings, Some(classic), Some(8.0), Some(6.0))?;
    seed_product(&conn, "1003", rings, None, Some(12.0), Some(6.0))?;

    let filter = ProductFilter {
        category_id: Some(rings),
        collection_id: Some(classic),
        weight_min: Some(5.0),
        weight_max: Some(7.0),
        ..Default::default()
    };
    let matched = db::list_products(&conn, &filter, -1, 0)?;
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].product_code, "1002");

    // Inclusive bounds keep the boundary product.
    let boundary = ProductFilter {
        weight_min: Some(6.0),
        weight_max: Some(6.0),
        ..Default::default()
    };
    assert_eq!(db::count_products(&conn, &boundary)?, 2);
    Ok(())
}

#[test]
fn test_wage_visibility_per_level() -> Result<()> {
    let conn = setup()?;
    let rings = db::create_category(&conn, "انگشتر")?;
    seed_product(&conn, "1001", rings, None, Some(7.5), Some(3.0))?;

    let product = db::find_product_by_code(&conn, "1001")?.unwrap();
    let stored = product.wage_percentage;

    assert_eq!(db::display_wage(stored, "general"), None);
    assert_eq!(db::display_wage(stored, "vip"), Some(7.5));
    assert_eq!(db::display_wage(stored, "level2"), Some(9.5));
    assert_eq!(db::display_wage(stored, "level4"), Some(11.5));
    // Unknown levels never leak the stored value.
    assert_eq!(db::display_wage(stored, "owner"), None);
    Ok(())
}

#[test]
fn test_disable_hides_delete_removes() -> Result<()> {
    let conn = setup()?;
    let rings = db::create_category(&conn, "انگشتر")?;
    let id = seed_product(&conn, "1001", rings, None, None, Some(1.0))?;

    assert!(db::set_product_status(&conn, id, ProductStatus::Inactive)?);
    assert!(db::find_product_by_code(&conn, "1001")?.is_none());
    // Operators still reach it by code, so it can be re-enabled or edited.
    assert!(db::find_product_by_code_any_status(&conn, "1001")?.is_some());

    assert!(db::set_product_status(&conn, id, ProductStatus::Active)?);
    assert!(db::find_product_by_code(&conn, "1001")?.is_some());

    assert!(db::delete_product(&conn, id)?);
    assert!(db::find_product_by_code_any_status(&conn, "1001")?.is_none());
    Ok(())
}

#[test]
fn test_moderation_lifecycle() -> Result<()> {
    let conn = setup()?;
    let user = db::create_user(&conn, 100, "علی", "حسینی")?;
    assert_eq!(user.status, UserStatus::Approved.as_str());

    assert!(db::update_user_status(&conn, 100, UserStatus::Pending)?);
    assert_eq!(db::list_pending_users(&conn)?.len(), 1);

    assert!(db::update_user_status(&conn, 100, UserStatus::Rejected)?);
    assert!(db::list_pending_users(&conn)?.is_empty());

    let (total, approved, pending, rejected) = db::count_users_by_status(&conn)?;
    assert_eq!((total, approved, pending, rejected), (1, 0, 0, 1));

    // Status changes never touch the level.
    assert!(db::update_user_level(&conn, 100, UserLevel::Vip)?);
    let user = db::find_user_by_telegram_id(&conn, 100)?.unwrap();
    assert_eq!(user.level, "vip");
    assert_eq!(user.status, "rejected");

    assert!(db::delete_user(&conn, 100)?);
    assert!(db::find_user_by_telegram_id(&conn, 100)?.is_none());
    Ok(())
}

#[test]
fn test_collection_scoping_and_wage_inheritance_source() -> Result<()> {
    let conn = setup()?;
    let rings = db::create_category(&conn, "انگشتر")?;
    let chains = db::create_category(&conn, "زنجیر")?;
    let classic = db::create_collection(&conn, "کلاسیک", Some(rings), Some(8.0))?;
    db::create_collection(&conn, "کارتیه", Some(chains), None)?;
    db::create_collection(&conn, "آزاد", None, None)?;

    // The picker for a category shows only its own collections.
    let scoped = db::list_collections(&conn, Some(rings))?;
    assert_eq!(scoped.len(), 1);
    assert_eq!(scoped[0].id, classic);
    assert_eq!(scoped[0].wage_percentage, Some(8.0));

    assert_eq!(db::list_collections(&conn, None)?.len(), 3);

    assert!(db::update_collection_wage(&conn, classic, None)?);
    let cleared = db::find_collection(&conn, classic)?.unwrap();
    assert_eq!(cleared.wage_percentage, None);
    Ok(())
}

#[test]
fn test_range_presets_scoped_by_category() -> Result<()> {
    let conn = setup()?;
    let rings = db::create_category(&conn, "انگشتر")?;
    let chains = db::create_category(&conn, "زنجیر")?;

    db::create_weight_range(&conn, "سبک", None, 0.0, 5.0)?;
    db::create_weight_range(&conn, "سنگین", Some(rings), 5.0, 50.0)?;
    db::create_wage_range(&conn, "کم", Some(chains), 0.0, 10.0)?;

    // Unscoped presets appear for every category.
    let for_rings = db::list_weight_ranges(&conn, Some(rings))?;
    assert_eq!(for_rings.len(), 2);
    let for_chains = db::list_weight_ranges(&conn, Some(chains))?;
    assert_eq!(for_chains.len(), 1);
    assert_eq!(for_chains[0].name, "سبک");

    assert!(db::list_wage_ranges(&conn, Some(rings))?.is_empty());
    assert_eq!(db::list_wage_ranges(&conn, Some(chains))?.len(), 1);
    Ok(())
}

#[test]
fn test_range_preset_listing_unscoped() -> Result<()> {
    let conn = setup()?;
    let rings = db::create_category(&conn, "انگشتر")?;
    db::create_weight_range(&conn, "سنگین", Some(rings), 5.0, 50.0)?;
    db::create_weight_range(&conn, "سبک", None, 0.0, 5.0)?;
    db::create_wage_range(&conn, "کم", None, 0.0, 10.0)?;

    // The management screens list every preset, sorted by lower bound.
    let weights = db::list_weight_ranges(&conn, None)?;
    assert_eq!(weights.len(), 2);
    assert_eq!(weights[0].name, "سبک");
    assert_eq!(db::list_wage_ranges(&conn, None)?.len(), 1);
    Ok(())
}

#[test]
fn test_product_code_rename_collision() -> Result<()> {
    let conn = setup()?;
    let rings = db::create_category(&conn, "انگشتر")?;
    let first = seed_product(&conn, "1001", rings, None, None, Some(1.0))?;
    seed_product(&conn, "1002", rings, None, None, Some(2.0))?;

    // The edit wizard's pre-check: the taken code resolves to another product,
    // while a product's own code is not a collision.
    let holder = db::find_product_by_code_any_status(&conn, "1002")?.unwrap();
    assert_ne!(holder.id, first);
    let own = db::find_product_by_code_any_status(&conn, "1001")?.unwrap();
    assert_eq!(own.id, first);

    // The unique constraint backstops a skipped check.
    assert!(db::update_product_code(&conn, first, "1002").is_err());
    assert!(db::update_product_code(&conn, first, "1003")?);
    assert!(db::find_product_by_code(&conn, "1003")?.is_some());
    Ok(())
}

#[test]
fn test_contact_info_roundtrip() -> Result<()> {
    let conn = setup()?;

    let defaults = db::get_contact_info(&conn)?;
    assert!(!defaults.address.is_empty());
    assert!(!defaults.phone.is_empty());

    db::update_contact_info(&conn, "آدرس جدید", "02100000000")?;
    let updated = db::get_contact_info(&conn)?;
    assert_eq!(updated.address, "آدرس جدید");
    assert_eq!(updated.phone, "02100000000");

    // The singleton row is upserted, never duplicated.
    db::update_contact_info(&conn, "آدرس سوم", "02111111111")?;
    let count: i64 =
        conn.query_row("SELECT COUNT(*) FROM contact_info", [], |row| row.get(0))?;
    assert_eq!(count, 1);
    Ok(())
}
