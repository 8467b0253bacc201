//! # Sarva Gold Telegram Bot
//!
//! A storefront bot for a gold-jewelry shop: end users register, browse the
//! catalog by category, collection, weight and wage filters, and look up
//! products by their 4-digit code; operators manage the catalog and moderate
//! users through inline wizards. Wage visibility depends on the viewer's
//! assigned level.

pub mod bot;
pub mod callback;
pub mod db;
pub mod localization;
pub mod state;
pub mod text_utils;
