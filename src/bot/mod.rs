//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules:
//! - `router`: Top-level dispatch of messages and callback queries by role
//! - `user_flow`: Registration, catalog browsing and search for end users
//! - `admin_flow`: Catalog administration and user moderation wizards
//! - `ui`: Creates keyboards and formats message fragments

pub mod admin_flow;
pub mod router;
pub mod ui;
pub mod user_flow;

// Re-export the dispatcher entry points for use in main.rs
pub use router::{handle_callback_query, handle_message};

use rusqlite::Connection;
use std::sync::Arc;
use url::Url;
use tokio::sync::Mutex;

use crate::state::{AdminState, ConversationStore, UserState};

/// Shared application context handed to every handler.
pub struct App {
    pub conn: Arc<Mutex<Connection>>,
    pub user_states: ConversationStore<UserState>,
    pub admin_states: ConversationStore<AdminState>,
    /// Channel whose membership gates the storefront, e.g. `@sarvagold`.
    pub channel_username: String,
    /// Public join link shown in the membership prompt.
    pub channel_url: Url,
}

impl App {
    pub fn new(conn: Connection, channel_username: String, channel_url: Url) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            user_states: ConversationStore::new(),
            admin_states: ConversationStore::new(),
            channel_username,
            channel_url,
        }
    }
}
