//! Guards the Fluent resource against drift: every key the handlers and
//! keyboards reference must resolve, and labels used for exact-match
//! routing must stay free of isolation marks.

use std::fs;
use std::path::Path;

use goldshop::localization::{t, t_args};
use regex::Regex;

/// Collect every key passed to `t(..)` / `t_args(..)` in the given sources.
fn referenced_keys(files: &[&str]) -> Vec<String> {
    let pattern = Regex::new(r#"\bt(?:_args)?\(\s*"([a-z0-9-]+)""#).expect("pattern is valid");
    let root = Path::new(env!("CARGO_MANIFEST_DIR"));

    let mut keys = Vec::new();
    for file in files {
        let source = fs::read_to_string(root.join(file))
            .unwrap_or_else(|e| panic!("cannot read {file}: {e}"));
        for capture in pattern.captures_iter(&source) {
            keys.push(capture[1].to_string());
        }
    }
    keys.sort();
    keys.dedup();
    keys
}

#[test]
fn test_every_referenced_key_resolves() {
    let keys = referenced_keys(&[
        "src/bot/admin_flow.rs",
        "src/bot/user_flow.rs",
        "src/bot/router.rs",
        "src/bot/ui.rs",
    ]);
    assert!(keys.len() > 50, "key extraction looks broken: {keys:?}");

    for key in keys {
        let value = t(&key);
        assert!(
            !value.starts_with("Missing"),
            "key `{key}` does not resolve: {value}"
        );
    }
}

#[test]
fn test_dynamic_level_and_status_keys_resolve() {
    for key in [
        "level-general",
        "level-vip",
        "level-1",
        "level-2",
        "level-3",
        "level-4",
        "status-approved",
        "status-pending",
        "status-rejected",
    ] {
        assert!(!t(key).starts_with("Missing"), "key `{key}` missing");
    }
}

#[test]
fn test_menu_labels_have_no_isolation_marks() {
    for key in [
        "btn-products",
        "btn-search-products",
        "btn-contact",
        "btn-back-main",
        "btn-admin-panel",
        "btn-admin-add-product",
    ] {
        let label = t(key);
        assert!(!label.contains('\u{2068}'), "key `{key}` has FSI mark");
        assert!(!label.contains('\u{2069}'), "key `{key}` has PDI mark");
    }
}

#[test]
fn test_args_render_inline() {
    let msg = t_args(
        "weight-range-display",
        &[
            ("name", "سبک".to_string()),
            ("min", "0".to_string()),
            ("max", "5".to_string()),
        ],
    );
    assert_eq!(msg, "سبک (0-5 گرم)");
}
