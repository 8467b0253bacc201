//! Catalog store: users, admins, categories, collections, range presets,
//! products and contact info backed by SQLite.
//!
//! The schema is created by an explicit, ordered bootstrap step
//! ([`run_migrations`]) before the bot starts accepting updates; no table is
//! created lazily on first use.

use anyhow::{Context, Result};
use rand::Rng;
use rusqlite::types::Value;
use rusqlite::{params, Connection};
use tracing::info;

/// Moderation status of a registered user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserStatus {
    Pending,
    Approved,
    Rejected,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Pending => "pending",
            UserStatus::Approved => "approved",
            UserStatus::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(UserStatus::Pending),
            "approved" => Some(UserStatus::Approved),
            "rejected" => Some(UserStatus::Rejected),
            _ => None,
        }
    }
}

/// Pricing-visibility tier of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserLevel {
    General,
    Vip,
    Level1,
    Level2,
    Level3,
    Level4,
}

impl UserLevel {
    pub const ALL: [UserLevel; 6] = [
        UserLevel::General,
        UserLevel::Vip,
        UserLevel::Level1,
        UserLevel::Level2,
        UserLevel::Level3,
        UserLevel::Level4,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserLevel::General => "general",
            UserLevel::Vip => "vip",
            UserLevel::Level1 => "level1",
            UserLevel::Level2 => "level2",
            UserLevel::Level3 => "level3",
            UserLevel::Level4 => "level4",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "general" => Some(UserLevel::General),
            "vip" => Some(UserLevel::Vip),
            "level1" => Some(UserLevel::Level1),
            "level2" => Some(UserLevel::Level2),
            "level3" => Some(UserLevel::Level3),
            "level4" => Some(UserLevel::Level4),
            _ => None,
        }
    }
}

/// Computes the wage percentage shown to a viewer. A missing stored wage is
/// never shown; `general` and unknown levels see nothing; `vip` sees the
/// stored value; `level1..level4` see the stored value plus a flat bonus of
/// 1..4 percentage points.
pub fn display_wage(stored: Option<f64>, level: &str) -> Option<f64> {
    let wage = stored?;
    match UserLevel::parse(level)? {
        UserLevel::General => None,
        UserLevel::Vip => Some(wage),
        UserLevel::Level1 => Some(wage + 1.0),
        UserLevel::Level2 => Some(wage + 2.0),
        UserLevel::Level3 => Some(wage + 3.0),
        UserLevel::Level4 => Some(wage + 4.0),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductStatus {
    Active,
    Inactive,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Active => "active",
            ProductStatus::Inactive => "inactive",
        }
    }
}

/// A registered storefront user.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub telegram_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub internal_id: String,
    pub status: String,
    pub level: String,
    pub created_at: String,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub sort_order: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    pub id: i64,
    pub name: String,
    pub category_id: Option<i64>,
    pub wage_percentage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeightRange {
    pub id: i64,
    pub name: String,
    pub min_weight: f64,
    pub max_weight: f64,
    pub category_id: Option<i64>,
    pub collection_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WageRange {
    pub id: i64,
    pub name: String,
    pub min_wage: f64,
    pub max_wage: f64,
    pub category_id: Option<i64>,
    pub collection_id: Option<i64>,
}

/// The media slot of a product. Exactly one of the three references is set;
/// writing one clears the other two.
#[derive(Debug, Clone, PartialEq)]
pub enum ProductMedia {
    Photo(String),
    Video(String),
    Animation(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: i64,
    pub product_code: String,
    pub name: String,
    pub image_file_id: Option<String>,
    pub video_file_id: Option<String>,
    pub animation_file_id: Option<String>,
    pub image_path: Option<String>,
    pub category_id: i64,
    pub collection_id: Option<i64>,
    pub wage_percentage: Option<f64>,
    pub weight: Option<f64>,
    pub status: String,
}

impl Product {
    pub fn media(&self) -> Option<ProductMedia> {
        if let Some(file_id) = &self.image_file_id {
            Some(ProductMedia::Photo(file_id.clone()))
        } else if let Some(file_id) = &self.video_file_id {
            Some(ProductMedia::Video(file_id.clone()))
        } else if let Some(file_id) = &self.animation_file_id {
            Some(ProductMedia::Animation(file_id.clone()))
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContactInfo {
    pub address: String,
    pub phone: String,
}

const DEFAULT_CONTACT_ADDRESS: &str =
    "بازار بزرگ تهران پاساژ طلا و جواهر خرداد طبقه همکف پلاک 68";
const DEFAULT_CONTACT_PHONE: &str = "02155612268";

/// Filters applied to product listings. All set fields are intersected;
/// range bounds are inclusive on both ends.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    pub category_id: Option<i64>,
    pub collection_id: Option<i64>,
    pub weight: Option<f64>,
    pub weight_min: Option<f64>,
    pub weight_max: Option<f64>,
    pub wage: Option<f64>,
    pub wage_min: Option<f64>,
    pub wage_max: Option<f64>,
}

/// Initialize the database schema
pub fn run_migrations(conn: &Connection) -> Result<()> {
    info!("Running database migrations...");

    conn.execute_batch("PRAGMA foreign_keys = ON")
        .context("Failed to enable foreign keys")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            telegram_id INTEGER NOT NULL UNIQUE,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            internal_id TEXT NOT NULL UNIQUE,
            status TEXT NOT NULL DEFAULT 'pending',
            level TEXT NOT NULL DEFAULT 'general',
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )
    .context("Failed to create users table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS admins (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            telegram_id INTEGER NOT NULL UNIQUE,
            username TEXT
        )",
        [],
    )
    .context("Failed to create admins table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            sort_order INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )
    .context("Failed to create categories table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS collections (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            category_id INTEGER REFERENCES categories(id) ON DELETE SET NULL,
            wage_percentage REAL
        )",
        [],
    )
    .context("Failed to create collections table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS weight_ranges (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            min_weight REAL NOT NULL,
            max_weight REAL NOT NULL,
            category_id INTEGER REFERENCES categories(id) ON DELETE SET NULL,
            collection_id INTEGER REFERENCES collections(id) ON DELETE SET NULL
        )",
        [],
    )
    .context("Failed to create weight_ranges table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS wage_ranges (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            min_wage REAL NOT NULL,
            max_wage REAL NOT NULL,
            category_id INTEGER REFERENCES categories(id) ON DELETE SET NULL,
            collection_id INTEGER REFERENCES collections(id) ON DELETE SET NULL
        )",
        [],
    )
    .context("Failed to create wage_ranges table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS products (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            product_code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            image_file_id TEXT,
            video_file_id TEXT,
            animation_file_id TEXT,
            image_path TEXT,
            category_id INTEGER NOT NULL REFERENCES categories(id) ON DELETE RESTRICT,
            collection_id INTEGER REFERENCES collections(id) ON DELETE SET NULL,
            wage_percentage REAL,
            weight REAL,
            status TEXT NOT NULL DEFAULT 'active',
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )
    .context("Failed to create products table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS contact_info (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            address TEXT NOT NULL,
            phone TEXT NOT NULL
        )",
        [],
    )
    .context("Failed to create contact_info table")?;

    info!("Database migrations completed");
    Ok(())
}

// ---------------------------------------------------------------------------
// Admins

/// Check whether a telegram id belongs to an operator
pub fn is_admin(conn: &Connection, telegram_id: i64) -> Result<bool> {
    let mut stmt = conn
        .prepare("SELECT 1 FROM admins WHERE telegram_id = ?1")
        .context("Failed to prepare admin lookup")?;
    let exists = stmt
        .exists(params![telegram_id])
        .context("Failed to check admin row")?;
    Ok(exists)
}

/// Grant operator rights to a telegram id. Idempotent; used to seed the
/// admin table from configuration at startup.
pub fn add_admin(conn: &Connection, telegram_id: i64) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO admins (telegram_id) VALUES (?1)",
        params![telegram_id],
    )
    .context("Failed to insert admin row")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Users

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        telegram_id: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        internal_id: row.get(4)?,
        status: row.get(5)?,
        level: row.get(6)?,
        created_at: row.get(7)?,
    })
}

const USER_COLUMNS: &str =
    "id, telegram_id, first_name, last_name, internal_id, status, level, created_at";

pub fn find_user_by_telegram_id(conn: &Connection, telegram_id: i64) -> Result<Option<User>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE telegram_id = ?1"
        ))
        .context("Failed to prepare user lookup")?;

    match stmt.query_row(params![telegram_id], user_from_row) {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to read user"),
    }
}

fn internal_id_exists(conn: &Connection, internal_id: &str) -> Result<bool> {
    let mut stmt = conn
        .prepare("SELECT 1 FROM users WHERE internal_id = ?1")
        .context("Failed to prepare internal id lookup")?;
    Ok(stmt.exists(params![internal_id])?)
}

/// Generate a unique display code of the form `USER-NNNN`, retrying on
/// collision.
fn generate_internal_id(conn: &Connection) -> Result<String> {
    let mut rng = rand::thread_rng();
    loop {
        let candidate = format!("USER-{:04}", rng.gen_range(1..=9999));
        if !internal_id_exists(conn, &candidate)? {
            return Ok(candidate);
        }
    }
}

/// Create a user row. Self-registration auto-approves; the pending/rejected
/// states are only reachable through operator moderation.
pub fn create_user(
    conn: &Connection,
    telegram_id: i64,
    first_name: &str,
    last_name: &str,
) -> Result<User> {
    let internal_id = generate_internal_id(conn)?;
    info!(telegram_id, internal_id = %internal_id, "Creating user");

    conn.execute(
        "INSERT INTO users (telegram_id, first_name, last_name, internal_id, status, level)
         VALUES (?1, ?2, ?3, ?4, 'approved', 'general')",
        params![telegram_id, first_name, last_name, internal_id],
    )
    .context("Failed to insert user")?;

    find_user_by_telegram_id(conn, telegram_id)?
        .context("User row missing immediately after insert")
}

pub fn update_user_status(conn: &Connection, telegram_id: i64, status: UserStatus) -> Result<bool> {
    let rows = conn
        .execute(
            "UPDATE users SET status = ?1 WHERE telegram_id = ?2",
            params![status.as_str(), telegram_id],
        )
        .context("Failed to update user status")?;
    Ok(rows > 0)
}

pub fn update_user_level(conn: &Connection, telegram_id: i64, level: UserLevel) -> Result<bool> {
    let rows = conn
        .execute(
            "UPDATE users SET level = ?1 WHERE telegram_id = ?2",
            params![level.as_str(), telegram_id],
        )
        .context("Failed to update user level")?;
    Ok(rows > 0)
}

pub fn list_pending_users(conn: &Connection) -> Result<Vec<User>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE status = 'pending' ORDER BY created_at ASC"
        ))
        .context("Failed to prepare pending user list")?;
    let users = stmt
        .query_map([], user_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to read pending users")?;
    Ok(users)
}

pub fn list_users(conn: &Connection) -> Result<Vec<User>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .context("Failed to prepare user list")?;
    let users = stmt
        .query_map([], user_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to read users")?;
    Ok(users)
}

/// Case-sensitive substring search over names, full name, telegram id and
/// internal display code.
pub fn search_users(conn: &Connection, query: &str) -> Result<Vec<User>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE instr(first_name, ?1) > 0
                OR instr(last_name, ?1) > 0
                OR instr(first_name || ' ' || last_name, ?1) > 0
                OR instr(CAST(telegram_id AS TEXT), ?1) > 0
                OR instr(internal_id, ?1) > 0
             ORDER BY created_at DESC"
        ))
        .context("Failed to prepare user search")?;
    let users = stmt
        .query_map(params![query], user_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to search users")?;
    Ok(users)
}

pub fn delete_user(conn: &Connection, telegram_id: i64) -> Result<bool> {
    let rows = conn
        .execute("DELETE FROM users WHERE telegram_id = ?1", params![telegram_id])
        .context("Failed to delete user")?;
    Ok(rows > 0)
}

/// Aggregate user counts: (total, approved, pending, rejected).
pub fn count_users_by_status(conn: &Connection) -> Result<(i64, i64, i64, i64)> {
    conn.query_row(
        "SELECT COUNT(*),
                COUNT(CASE WHEN status = 'approved' THEN 1 END),
                COUNT(CASE WHEN status = 'pending' THEN 1 END),
                COUNT(CASE WHEN status = 'rejected' THEN 1 END)
         FROM users",
        [],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
    )
    .context("Failed to count users by status")
}

/// User counts per level in the fixed level order.
pub fn count_users_by_level(conn: &Connection) -> Result<Vec<(UserLevel, i64)>> {
    let mut counts = Vec::with_capacity(UserLevel::ALL.len());
    for level in UserLevel::ALL {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM users WHERE level = ?1",
                params![level.as_str()],
                |row| row.get(0),
            )
            .context("Failed to count users by level")?;
        counts.push((level, count));
    }
    Ok(counts)
}

// ---------------------------------------------------------------------------
// Categories

fn category_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        sort_order: row.get(2)?,
    })
}

pub fn list_categories(conn: &Connection) -> Result<Vec<Category>> {
    let mut stmt = conn
        .prepare("SELECT id, name, sort_order FROM categories ORDER BY sort_order ASC, name ASC")
        .context("Failed to prepare category list")?;
    let categories = stmt
        .query_map([], category_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to read categories")?;
    Ok(categories)
}

pub fn find_category(conn: &Connection, id: i64) -> Result<Option<Category>> {
    let mut stmt = conn
        .prepare("SELECT id, name, sort_order FROM categories WHERE id = ?1")
        .context("Failed to prepare category lookup")?;
    match stmt.query_row(params![id], category_from_row) {
        Ok(category) => Ok(Some(category)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to read category"),
    }
}

pub fn find_category_by_name(conn: &Connection, name: &str) -> Result<Option<Category>> {
    let mut stmt = conn
        .prepare("SELECT id, name, sort_order FROM categories WHERE name = ?1")
        .context("Failed to prepare category name lookup")?;
    match stmt.query_row(params![name], category_from_row) {
        Ok(category) => Ok(Some(category)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to read category"),
    }
}

pub fn create_category(conn: &Connection, name: &str) -> Result<i64> {
    info!(name, "Creating category");
    conn.execute(
        "INSERT INTO categories (name, sort_order) VALUES (?1, 0)",
        params![name],
    )
    .context("Failed to insert category")?;
    Ok(conn.last_insert_rowid())
}

/// Delete a category. Returns `Ok(false)` when the row is referenced by
/// dependent products (FK RESTRICT) so the caller can report a warning.
pub fn delete_category(conn: &Connection, id: i64) -> Result<bool> {
    match conn.execute("DELETE FROM categories WHERE id = ?1", params![id]) {
        Ok(rows) => Ok(rows > 0),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            info!(category_id = id, "Category delete blocked by dependents");
            Ok(false)
        }
        Err(e) => Err(e).context("Failed to delete category"),
    }
}

// ---------------------------------------------------------------------------
// Collections

fn collection_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Collection> {
    Ok(Collection {
        id: row.get(0)?,
        name: row.get(1)?,
        category_id: row.get(2)?,
        wage_percentage: row.get(3)?,
    })
}

pub fn list_collections(conn: &Connection, category_id: Option<i64>) -> Result<Vec<Collection>> {
    match category_id {
        Some(category_id) => {
            let mut stmt = conn
                .prepare(
                    "SELECT id, name, category_id, wage_percentage FROM collections
                     WHERE category_id = ?1 ORDER BY name ASC",
                )
                .context("Failed to prepare collection list")?;
            let collections = stmt
                .query_map(params![category_id], collection_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .context("Failed to read collections")?;
            Ok(collections)
        }
        None => {
            let mut stmt = conn
                .prepare(
                    "SELECT id, name, category_id, wage_percentage FROM collections
                     ORDER BY name ASC",
                )
                .context("Failed to prepare collection list")?;
            let collections = stmt
                .query_map([], collection_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .context("Failed to read collections")?;
            Ok(collections)
        }
    }
}

pub fn find_collection(conn: &Connection, id: i64) -> Result<Option<Collection>> {
    let mut stmt = conn
        .prepare("SELECT id, name, category_id, wage_percentage FROM collections WHERE id = ?1")
        .context("Failed to prepare collection lookup")?;
    match stmt.query_row(params![id], collection_from_row) {
        Ok(collection) => Ok(Some(collection)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to read collection"),
    }
}

pub fn find_collection_by_name(conn: &Connection, name: &str) -> Result<Option<Collection>> {
    let mut stmt = conn
        .prepare("SELECT id, name, category_id, wage_percentage FROM collections WHERE name = ?1")
        .context("Failed to prepare collection name lookup")?;
    match stmt.query_row(params![name], collection_from_row) {
        Ok(collection) => Ok(Some(collection)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to read collection"),
    }
}

pub fn create_collection(
    conn: &Connection,
    name: &str,
    category_id: Option<i64>,
    wage_percentage: Option<f64>,
) -> Result<i64> {
    info!(name, "Creating collection");
    conn.execute(
        "INSERT INTO collections (name, category_id, wage_percentage) VALUES (?1, ?2, ?3)",
        params![name, category_id, wage_percentage],
    )
    .context("Failed to insert collection")?;
    Ok(conn.last_insert_rowid())
}

pub fn update_collection_wage(
    conn: &Connection,
    id: i64,
    wage_percentage: Option<f64>,
) -> Result<bool> {
    let rows = conn
        .execute(
            "UPDATE collections SET wage_percentage = ?1 WHERE id = ?2",
            params![wage_percentage, id],
        )
        .context("Failed to update collection wage")?;
    Ok(rows > 0)
}

pub fn delete_collection(conn: &Connection, id: i64) -> Result<bool> {
    let rows = conn
        .execute("DELETE FROM collections WHERE id = ?1", params![id])
        .context("Failed to delete collection")?;
    Ok(rows > 0)
}

// ---------------------------------------------------------------------------
// Range presets

fn weight_range_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<WeightRange> {
    Ok(WeightRange {
        id: row.get(0)?,
        name: row.get(1)?,
        min_weight: row.get(2)?,
        max_weight: row.get(3)?,
        category_id: row.get(4)?,
        collection_id: row.get(5)?,
    })
}

fn wage_range_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<WageRange> {
    Ok(WageRange {
        id: row.get(0)?,
        name: row.get(1)?,
        min_wage: row.get(2)?,
        max_wage: row.get(3)?,
        category_id: row.get(4)?,
        collection_id: row.get(5)?,
    })
}

/// List weight presets usable for a category: presets scoped to it plus the
/// unscoped ones.
pub fn list_weight_ranges(conn: &Connection, category_id: Option<i64>) -> Result<Vec<WeightRange>> {
    match category_id {
        Some(category_id) => {
            let mut stmt = conn
                .prepare(
                    "SELECT id, name, min_weight, max_weight, category_id, collection_id
                     FROM weight_ranges
                     WHERE category_id = ?1 OR category_id IS NULL
                     ORDER BY min_weight ASC, name ASC",
                )
                .context("Failed to prepare weight range list")?;
            let ranges = stmt
                .query_map(params![category_id], weight_range_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .context("Failed to read weight ranges")?;
            Ok(ranges)
        }
        None => {
            let mut stmt = conn
                .prepare(
                    "SELECT id, name, min_weight, max_weight, category_id, collection_id
                     FROM weight_ranges ORDER BY min_weight ASC, name ASC",
                )
                .context("Failed to prepare weight range list")?;
            let ranges = stmt
                .query_map([], weight_range_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .context("Failed to read weight ranges")?;
            Ok(ranges)
        }
    }
}

pub fn find_weight_range(conn: &Connection, id: i64) -> Result<Option<WeightRange>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, name, min_weight, max_weight, category_id, collection_id
             FROM weight_ranges WHERE id = ?1",
        )
        .context("Failed to prepare weight range lookup")?;
    match stmt.query_row(params![id], weight_range_from_row) {
        Ok(range) => Ok(Some(range)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to read weight range"),
    }
}

pub fn create_weight_range(
    conn: &Connection,
    name: &str,
    category_id: Option<i64>,
    min_weight: f64,
    max_weight: f64,
) -> Result<i64> {
    info!(name, min_weight, max_weight, "Creating weight range");
    conn.execute(
        "INSERT INTO weight_ranges (name, min_weight, max_weight, category_id)
         VALUES (?1, ?2, ?3, ?4)",
        params![name, min_weight, max_weight, category_id],
    )
    .context("Failed to insert weight range")?;
    Ok(conn.last_insert_rowid())
}

pub fn delete_weight_range(conn: &Connection, id: i64) -> Result<bool> {
    let rows = conn
        .execute("DELETE FROM weight_ranges WHERE id = ?1", params![id])
        .context("Failed to delete weight range")?;
    Ok(rows > 0)
}

pub fn list_wage_ranges(conn: &Connection, category_id: Option<i64>) -> Result<Vec<WageRange>> {
    match category_id {
        Some(category_id) => {
            let mut stmt = conn
                .prepare(
                    "SELECT id, name, min_wage, max_wage, category_id, collection_id
                     FROM wage_ranges
                     WHERE category_id = ?1 OR category_id IS NULL
                     ORDER BY min_wage ASC, name ASC",
                )
                .context("Failed to prepare wage range list")?;
            let ranges = stmt
                .query_map(params![category_id], wage_range_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .context("Failed to read wage ranges")?;
            Ok(ranges)
        }
        None => {
            let mut stmt = conn
                .prepare(
                    "SELECT id, name, min_wage, max_wage, category_id, collection_id
                     FROM wage_ranges ORDER BY min_wage ASC, name ASC",
                )
                .context("Failed to prepare wage range list")?;
            let ranges = stmt
                .query_map([], wage_range_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .context("Failed to read wage ranges")?;
            Ok(ranges)
        }
    }
}

pub fn find_wage_range(conn: &Connection, id: i64) -> Result<Option<WageRange>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, name, min_wage, max_wage, category_id, collection_id
             FROM wage_ranges WHERE id = ?1",
        )
        .context("Failed to prepare wage range lookup")?;
    match stmt.query_row(params![id], wage_range_from_row) {
        Ok(range) => Ok(Some(range)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to read wage range"),
    }
}

pub fn create_wage_range(
    conn: &Connection,
    name: &str,
    category_id: Option<i64>,
    min_wage: f64,
    max_wage: f64,
) -> Result<i64> {
    info!(name, min_wage, max_wage, "Creating wage range");
    conn.execute(
        "INSERT INTO wage_ranges (name, min_wage, max_wage, category_id)
         VALUES (?1, ?2, ?3, ?4)",
        params![name, min_wage, max_wage, category_id],
    )
    .context("Failed to insert wage range")?;
    Ok(conn.last_insert_rowid())
}

pub fn delete_wage_range(conn: &Connection, id: i64) -> Result<bool> {
    let rows = conn
        .execute("DELETE FROM wage_ranges WHERE id = ?1", params![id])
        .context("Failed to delete wage range")?;
    Ok(rows > 0)
}

// ---------------------------------------------------------------------------
// Products

const PRODUCT_COLUMNS: &str = "id, product_code, name, image_file_id, video_file_id, \
     animation_file_id, image_path, category_id, collection_id, wage_percentage, weight, status";

fn product_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        product_code: row.get(1)?,
        name: row.get(2)?,
        image_file_id: row.get(3)?,
        video_file_id: row.get(4)?,
        animation_file_id: row.get(5)?,
        image_path: row.get(6)?,
        category_id: row.get(7)?,
        collection_id: row.get(8)?,
        wage_percentage: row.get(9)?,
        weight: row.get(10)?,
        status: row.get(11)?,
    })
}

pub fn find_product(conn: &Connection, id: i64) -> Result<Option<Product>> {
    let mut stmt = conn
        .prepare(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"))
        .context("Failed to prepare product lookup")?;
    match stmt.query_row(params![id], product_from_row) {
        Ok(product) => Ok(Some(product)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to read product"),
    }
}

/// Look up an active product by its 4-digit code. The storefront view never
/// sees disabled products.
pub fn find_product_by_code(conn: &Connection, code: &str) -> Result<Option<Product>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE product_code = ?1 AND status = 'active'"
        ))
        .context("Failed to prepare product code lookup")?;
    match stmt.query_row(params![code], product_from_row) {
        Ok(product) => Ok(Some(product)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to read product"),
    }
}

/// Operator-side lookup by code, including disabled products. Used for code
/// uniqueness checks and for the edit/delete wizards.
pub fn find_product_by_code_any_status(conn: &Connection, code: &str) -> Result<Option<Product>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE product_code = ?1"
        ))
        .context("Failed to prepare product code lookup")?;
    match stmt.query_row(params![code], product_from_row) {
        Ok(product) => Ok(Some(product)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to read product"),
    }
}

fn filter_clauses(filter: &ProductFilter) -> (String, Vec<Value>) {
    let mut clauses = vec!["status = 'active'".to_string()];
    let mut values: Vec<Value> = Vec::new();

    if let Some(category_id) = filter.category_id {
        values.push(Value::Integer(category_id));
        clauses.push(format!("category_id = ?{}", values.len()));
    }
    if let Some(collection_id) = filter.collection_id {
        values.push(Value::Integer(collection_id));
        clauses.push(format!("collection_id = ?{}", values.len()));
    }
    if let Some(weight) = filter.weight {
        values.push(Value::Real(weight));
        clauses.push(format!("weight = ?{}", values.len()));
    }
    if let Some(weight_min) = filter.weight_min {
        values.push(Value::Real(weight_min));
        clauses.push(format!("weight >= ?{}", values.len()));
    }
    if let Some(weight_max) = filter.weight_max {
        values.push(Value::Real(weight_max));
        clauses.push(format!("weight <= ?{}", values.len()));
    }
    if let Some(wage) = filter.wage {
        values.push(Value::Real(wage));
        clauses.push(format!("wage_percentage = ?{}", values.len()));
    }
    if let Some(wage_min) = filter.wage_min {
        values.push(Value::Real(wage_min));
        clauses.push(format!("wage_percentage >= ?{}", values.len()));
    }
    if let Some(wage_max) = filter.wage_max {
        values.push(Value::Real(wage_max));
        clauses.push(format!("wage_percentage <= ?{}", values.len()));
    }

    (clauses.join(" AND "), values)
}

/// List active products matching the filter, newest first. A negative
/// `limit` returns every match (SQLite treats `LIMIT -1` as unbounded).
pub fn list_products(
    conn: &Connection,
    filter: &ProductFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<Product>> {
    let (where_clause, mut values) = filter_clauses(filter);
    values.push(Value::Integer(limit));
    let limit_idx = values.len();
    values.push(Value::Integer(offset));
    let offset_idx = values.len();

    let sql = format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE {where_clause}
         ORDER BY id DESC LIMIT ?{limit_idx} OFFSET ?{offset_idx}"
    );
    let mut stmt = conn
        .prepare(&sql)
        .context("Failed to prepare product list")?;
    let products = stmt
        .query_map(rusqlite::params_from_iter(values), product_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to read products")?;
    Ok(products)
}

pub fn count_products(conn: &Connection, filter: &ProductFilter) -> Result<i64> {
    let (where_clause, values) = filter_clauses(filter);
    let sql = format!("SELECT COUNT(*) FROM products WHERE {where_clause}");
    conn.query_row(&sql, rusqlite::params_from_iter(values), |row| row.get(0))
        .context("Failed to count products")
}

pub fn create_product(
    conn: &Connection,
    product_code: &str,
    name: &str,
    media: &ProductMedia,
    category_id: i64,
    collection_id: Option<i64>,
    wage_percentage: Option<f64>,
    weight: Option<f64>,
) -> Result<i64> {
    info!(product_code, category_id, "Creating product");

    let (image, video, animation) = match media {
        ProductMedia::Photo(file_id) => (Some(file_id.as_str()), None, None),
        ProductMedia::Video(file_id) => (None, Some(file_id.as_str()), None),
        ProductMedia::Animation(file_id) => (None, None, Some(file_id.as_str())),
    };

    conn.execute(
        "INSERT INTO products (product_code, name, image_file_id, video_file_id,
             animation_file_id, category_id, collection_id, wage_percentage, weight, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 'active')",
        params![
            product_code,
            name,
            image,
            video,
            animation,
            category_id,
            collection_id,
            wage_percentage,
            weight
        ],
    )
    .context("Failed to insert product")?;
    Ok(conn.last_insert_rowid())
}

pub fn update_product_code(conn: &Connection, id: i64, product_code: &str) -> Result<bool> {
    let rows = conn
        .execute(
            "UPDATE products SET product_code = ?1 WHERE id = ?2",
            params![product_code, id],
        )
        .context("Failed to update product code")?;
    Ok(rows > 0)
}

pub fn update_product_name(conn: &Connection, id: i64, name: &str) -> Result<bool> {
    let rows = conn
        .execute("UPDATE products SET name = ?1 WHERE id = ?2", params![name, id])
        .context("Failed to update product name")?;
    Ok(rows > 0)
}

pub fn update_product_category(conn: &Connection, id: i64, category_id: i64) -> Result<bool> {
    let rows = conn
        .execute(
            "UPDATE products SET category_id = ?1 WHERE id = ?2",
            params![category_id, id],
        )
        .context("Failed to update product category")?;
    Ok(rows > 0)
}

pub fn update_product_collection(
    conn: &Connection,
    id: i64,
    collection_id: Option<i64>,
) -> Result<bool> {
    let rows = conn
        .execute(
            "UPDATE products SET collection_id = ?1 WHERE id = ?2",
            params![collection_id, id],
        )
        .context("Failed to update product collection")?;
    Ok(rows > 0)
}

pub fn update_product_wage(conn: &Connection, id: i64, wage_percentage: f64) -> Result<bool> {
    let rows = conn
        .execute(
            "UPDATE products SET wage_percentage = ?1 WHERE id = ?2",
            params![wage_percentage, id],
        )
        .context("Failed to update product wage")?;
    Ok(rows > 0)
}

pub fn update_product_weight(conn: &Connection, id: i64, weight: f64) -> Result<bool> {
    let rows = conn
        .execute(
            "UPDATE products SET weight = ?1 WHERE id = ?2",
            params![weight, id],
        )
        .context("Failed to update product weight")?;
    Ok(rows > 0)
}

/// Replace the product's media slot. The three references are mutually
/// exclusive, so the other two are cleared in the same statement.
pub fn update_product_media(conn: &Connection, id: i64, media: &ProductMedia) -> Result<bool> {
    let (image, video, animation) = match media {
        ProductMedia::Photo(file_id) => (Some(file_id.as_str()), None, None),
        ProductMedia::Video(file_id) => (None, Some(file_id.as_str()), None),
        ProductMedia::Animation(file_id) => (None, None, Some(file_id.as_str())),
    };
    let rows = conn
        .execute(
            "UPDATE products SET image_file_id = ?1, video_file_id = ?2, animation_file_id = ?3
             WHERE id = ?4",
            params![image, video, animation, id],
        )
        .context("Failed to update product media")?;
    Ok(rows > 0)
}

pub fn set_product_status(conn: &Connection, id: i64, status: ProductStatus) -> Result<bool> {
    let rows = conn
        .execute(
            "UPDATE products SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )
        .context("Failed to update product status")?;
    Ok(rows > 0)
}

pub fn delete_product(conn: &Connection, id: i64) -> Result<bool> {
    let rows = conn
        .execute("DELETE FROM products WHERE id = ?1", params![id])
        .context("Failed to delete product")?;
    Ok(rows > 0)
}

// ---------------------------------------------------------------------------
// Contact info

/// Read the singleton contact row, creating it with the storefront defaults
/// when absent.
pub fn get_contact_info(conn: &Connection) -> Result<ContactInfo> {
    let contact = conn.query_row(
        "SELECT address, phone FROM contact_info WHERE id = 1",
        [],
        |row| {
            Ok(ContactInfo {
                address: row.get(0)?,
                phone: row.get(1)?,
            })
        },
    );

    match contact {
        Ok(contact) => Ok(contact),
        Err(rusqlite::Error::QueryReturnedNoRows) => {
            conn.execute(
                "INSERT INTO contact_info (id, address, phone) VALUES (1, ?1, ?2)",
                params![DEFAULT_CONTACT_ADDRESS, DEFAULT_CONTACT_PHONE],
            )
            .context("Failed to seed contact info")?;
            Ok(ContactInfo {
                address: DEFAULT_CONTACT_ADDRESS.to_string(),
                phone: DEFAULT_CONTACT_PHONE.to_string(),
            })
        }
        Err(e) => Err(e).context("Failed to read contact info"),
    }
}

pub fn update_contact_info(conn: &Connection, address: &str, phone: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO contact_info (id, address, phone) VALUES (1, ?1, ?2)
         ON CONFLICT(id) DO UPDATE SET address = excluded.address, phone = excluded.phone",
        params![address, phone],
    )
    .context("Failed to update contact info")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn setup_test_db() -> Result<(Connection, NamedTempFile)> {
        let temp_file = NamedTempFile::new()?;
        let conn = Connection::open(temp_file.path())?;
        run_migrations(&conn)?;
        Ok((conn, temp_file))
    }

    #[test]
    fn test_create_user_auto_approved() -> Result<()> {
        let (conn, _temp_file) = setup_test_db()?;

        let user = create_user(&conn, 1001, "Ali", "Hosseini")?;

        assert_eq!(user.first_name, "Ali");
        assert_eq!(user.last_name, "Hosseini");
        assert_eq!(user.status, "approved");
        assert_eq!(user.level, "general");
        Ok(())
    }

    #[test]
    fn test_internal_id_format() -> Result<()> {
        let (conn, _temp_file) = setup_test_db()?;

        let user = create_user(&conn, 1001, "Ali", "Hosseini")?;

        assert!(user.internal_id.starts_with("USER-"));
        let digits = &user.internal_id["USER-".len()..];
        assert_eq!(digits.len(), 4);
        assert!(digits.chars().all(|c| c.is_ascii_digit()));
        Ok(())
    }

    #[test]
    fn test_user_status_and_level_updates() -> Result<()> {
        let (conn, _temp_file) = setup_test_db()?;
        create_user(&conn, 1001, "Ali", "Hosseini")?;

        assert!(update_user_status(&conn, 1001, UserStatus::Rejected)?);
        assert!(update_user_level(&conn, 1001, UserLevel::Vip)?);

        let user = find_user_by_telegram_id(&conn, 1001)?.unwrap();
        assert_eq!(user.status, "rejected");
        assert_eq!(user.level, "vip");

        // Unknown user updates nothing
        assert!(!update_user_status(&conn, 9999, UserStatus::Approved)?);
        Ok(())
    }

    #[test]
    fn test_search_users_substring() -> Result<()> {
        let (conn, _temp_file) = setup_test_db()?;
        let ali = create_user(&conn, 1001, "Ali", "Hosseini")?;
        create_user(&conn, 1002, "Sara", "Karimi")?;

        let by_first = search_users(&conn, "Ali")?;
        assert_eq!(by_first.len(), 1);
        assert_eq!(by_first[0].telegram_id, 1001);

        let by_internal = search_users(&conn, &ali.internal_id)?;
        assert_eq!(by_internal.len(), 1);

        let by_full = search_users(&conn, "Sara Karimi")?;
        assert_eq!(by_full.len(), 1);
        assert_eq!(by_full[0].telegram_id, 1002);

        // Case-sensitive containment
        assert!(search_users(&conn, "ali")?.is_empty());
        Ok(())
    }

    #[test]
    fn test_count_users_by_status() -> Result<()> {
        let (conn, _temp_file) = setup_test_db()?;
        create_user(&conn, 1, "A", "B")?;
        create_user(&conn, 2, "C", "D")?;
        update_user_status(&conn, 2, UserStatus::Pending)?;

        let (total, approved, pending, rejected) = count_users_by_status(&conn)?;
        assert_eq!(total, 2);
        assert_eq!(approved, 1);
        assert_eq!(pending, 1);
        assert_eq!(rejected, 0);
        Ok(())
    }

    #[test]
    fn test_display_wage_table() {
        assert_eq!(display_wage(None, "vip"), None);
        assert_eq!(display_wage(Some(8.0), "general"), None);
        assert_eq!(display_wage(Some(8.0), "vip"), Some(8.0));
        assert_eq!(display_wage(Some(8.0), "level1"), Some(9.0));
        assert_eq!(display_wage(Some(8.0), "level2"), Some(10.0));
        assert_eq!(display_wage(Some(8.0), "level3"), Some(11.0));
        assert_eq!(display_wage(Some(8.0), "level4"), Some(12.0));
        assert_eq!(display_wage(Some(8.0), "wholesale"), None);
    }

    #[test]
    fn test_duplicate_category_rejected() -> Result<()> {
        let (conn, _temp_file) = setup_test_db()?;
        create_category(&conn, "Rings")?;

        assert!(find_category_by_name(&conn, "Rings")?.is_some());
        assert!(create_category(&conn, "Rings").is_err());
        Ok(())
    }

    #[test]
    fn test_delete_category_with_products_blocked() -> Result<()> {
        let (conn, _temp_file) = setup_test_db()?;
        let category_id = create_category(&conn, "Rings")?;
        let product_id = create_product(
            &conn,
            "1001",
            "1001",
            &ProductMedia::Photo("file-1".into()),
            category_id,
            None,
            Some(8.0),
            Some(4.5),
        )?;

        assert!(!delete_category(&conn, category_id)?);
        assert!(find_category(&conn, category_id)?.is_some());

        delete_product(&conn, product_id)?;
        assert!(delete_category(&conn, category_id)?);
        Ok(())
    }

    #[test]
    fn test_collection_wage_nullable() -> Result<()> {
        let (conn, _temp_file) = setup_test_db()?;
        let id = create_collection(&conn, "Classic", None, Some(8.5))?;

        let collection = find_collection(&conn, id)?.unwrap();
        assert_eq!(collection.wage_percentage, Some(8.5));

        update_collection_wage(&conn, id, None)?;
        let collection = find_collection(&conn, id)?.unwrap();
        assert_eq!(collection.wage_percentage, None);
        Ok(())
    }

    #[test]
    fn test_weight_range_scoping() -> Result<()> {
        let (conn, _temp_file) = setup_test_db()?;
        let rings = create_category(&conn, "Rings")?;
        let chains = create_category(&conn, "Chains")?;
        create_weight_range(&conn, "light", Some(rings), 0.0, 6.0)?;
        create_weight_range(&conn, "any", None, 0.0, 100.0)?;
        create_weight_range(&conn, "chains only", Some(chains), 5.0, 20.0)?;

        let scoped = list_weight_ranges(&conn, Some(rings))?;
        let names: Vec<_> = scoped.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["light", "any"]);
        Ok(())
    }

    #[test]
    fn test_product_code_lookup_respects_status() -> Result<()> {
        let (conn, _temp_file) = setup_test_db()?;
        let category_id = create_category(&conn, "Rings")?;
        let product_id = create_product(
            &conn,
            "1001",
            "1001",
            &ProductMedia::Photo("file-1".into()),
            category_id,
            None,
            Some(8.0),
            Some(4.5),
        )?;

        assert!(find_product_by_code(&conn, "1001")?.is_some());

        set_product_status(&conn, product_id, ProductStatus::Inactive)?;
        assert!(find_product_by_code(&conn, "1001")?.is_none());
        assert!(find_product_by_code_any_status(&conn, "1001")?.is_some());
        Ok(())
    }

    #[test]
    fn test_product_filter_inclusive_bounds() -> Result<()> {
        let (conn, _temp_file) = setup_test_db()?;
        let category_id = create_category(&conn, "Rings")?;
        for (code, weight) in [("1001", 6.0), ("1002", 8.0), ("1003", 10.0), ("1004", 12.0)] {
            create_product(
                &conn,
                code,
                code,
                &ProductMedia::Photo(format!("file-{code}")),
                category_id,
                None,
                Some(8.0),
                Some(weight),
            )?;
        }

        let filter = ProductFilter {
            category_id: Some(category_id),
            weight_min: Some(6.0),
            weight_max: Some(10.0),
            ..Default::default()
        };
        let products = list_products(&conn, &filter, 50, 0)?;
        let codes: Vec<_> = products.iter().map(|p| p.product_code.as_str()).collect();

        // Both boundary weights included, newest first
        assert_eq!(codes, vec!["1003", "1002", "1001"]);
        assert_eq!(count_products(&conn, &filter)?, 3);
        Ok(())
    }

    #[test]
    fn test_list_products_pagination() -> Result<()> {
        let (conn, _temp_file) = setup_test_db()?;
        let category_id = create_category(&conn, "Rings")?;
        for i in 0..12 {
            let code = format!("{:04}", 1000 + i);
            create_product(
                &conn,
                &code,
                &code,
                &ProductMedia::Photo(format!("file-{i}")),
                category_id,
                None,
                None,
                None,
            )?;
        }

        let filter = ProductFilter {
            category_id: Some(category_id),
            ..Default::default()
        };
        let first_page = list_products(&conn, &filter, 10, 0)?;
        let second_page = list_products(&conn, &filter, 10, 10)?;
        assert_eq!(first_page.len(), 10);
        assert_eq!(second_page.len(), 2);
        assert_eq!(count_products(&conn, &filter)?, 12);
        Ok(())
    }

    #[test]
    fn test_product_media_slot_exclusive() -> Result<()> {
        let (conn, _temp_file) = setup_test_db()?;
        let category_id = create_category(&conn, "Rings")?;
        let product_id = create_product(
            &conn,
            "1001",
            "1001",
            &ProductMedia::Photo("photo-1".into()),
            category_id,
            None,
            None,
            None,
        )?;

        update_product_media(&conn, product_id, &ProductMedia::Video("video-1".into()))?;

        let product = find_product(&conn, product_id)?.unwrap();
        assert_eq!(product.image_file_id, None);
        assert_eq!(product.video_file_id.as_deref(), Some("video-1"));
        assert_eq!(product.animation_file_id, None);
        assert_eq!(product.media(), Some(ProductMedia::Video("video-1".into())));
        Ok(())
    }

    #[test]
    fn test_contact_info_lazy_defaults() -> Result<()> {
        let (conn, _temp_file) = setup_test_db()?;

        let contact = get_contact_info(&conn)?;
        assert!(!contact.address.is_empty());
        assert!(!contact.phone.is_empty());

        update_contact_info(&conn, "new address", "0912")?;
        let contact = get_contact_info(&conn)?;
        assert_eq!(contact.address, "new address");
        assert_eq!(contact.phone, "0912");
        Ok(())
    }

    #[test]
    fn test_is_admin() -> Result<()> {
        let (conn, _temp_file) = setup_test_db()?;
        conn.execute(
            "INSERT INTO admins (telegram_id, username) VALUES (?1, ?2)",
            params![42_i64, "boss"],
        )?;

        assert!(is_admin(&conn, 42)?);
        assert!(!is_admin(&conn, 43)?);
        Ok(())
    }
}
