use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::FluentResource;
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::Arc;
use unic_langid::LanguageIdentifier;

/// Embedded Persian resource file. The storefront serves a single locale.
const FA_RESOURCE: &str = include_str!("../locales/fa/main.ftl");

/// Localization manager for the storefront bot
pub struct LocalizationManager {
    bundles: HashMap<String, Arc<FluentBundle<FluentResource>>>,
}

impl LocalizationManager {
    /// Create a new localization manager with the embedded Persian bundle
    pub fn new() -> Self {
        let mut bundles = HashMap::new();

        let fa_locale: LanguageIdentifier = "fa"
            .parse()
            .unwrap_or_else(|_| LanguageIdentifier::default());
        let bundle = Self::create_bundle(fa_locale, FA_RESOURCE);
        bundles.insert("fa".to_string(), Arc::new(bundle));

        Self { bundles }
    }

    fn create_bundle(locale: LanguageIdentifier, source: &str) -> FluentBundle<FluentResource> {
        let mut bundle = FluentBundle::new_concurrent(vec![locale]);
        // Isolation marks would corrupt the exact-match button labels.
        bundle.set_use_isolating(false);

        if let Ok(resource) = FluentResource::try_new(source.to_string()) {
            let _ = bundle.add_resource(resource);
        }

        bundle
    }

    /// Get a localized message
    pub fn get_message(&self, key: &str, args: Option<&HashMap<&str, String>>) -> String {
        let bundle = match self.bundles.get("fa") {
            Some(bundle) => bundle,
            None => return format!("Missing locale bundle: {}", key),
        };

        let msg = match bundle.get_message(key) {
            Some(msg) => msg,
            None => return format!("Missing translation: {}", key),
        };

        let pattern = match msg.value() {
            Some(pattern) => pattern,
            None => return format!("Missing value for key: {}", key),
        };

        let mut value = String::new();

        if let Some(args) = args {
            let fluent_args = fluent_bundle::FluentArgs::from_iter(
                args.iter()
                    .map(|(k, v)| (*k, fluent_bundle::FluentValue::from(v.as_str()))),
            );

            let _ = bundle.write_pattern(&mut value, pattern, Some(&fluent_args), &mut vec![]);
        } else {
            let _ = bundle.write_pattern(&mut value, pattern, None, &mut vec![]);
        }

        value
    }

    /// Get a localized message with simple string arguments
    pub fn get_message_with_args(&self, key: &str, args: &[(&str, String)]) -> String {
        let args_map: HashMap<&str, String> = args.iter().cloned().collect();
        self.get_message(key, Some(&args_map))
    }
}

impl Default for LocalizationManager {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static! {
    static ref LOCALIZATION_MANAGER: LocalizationManager = LocalizationManager::new();
}

/// Convenience function to get a localized message
pub fn t(key: &str) -> String {
    LOCALIZATION_MANAGER.get_message(key, None)
}

/// Convenience function to get a localized message with arguments
pub fn t_args(key: &str, args: &[(&str, String)]) -> String {
    LOCALIZATION_MANAGER.get_message_with_args(key, args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_key_resolves() {
        let back = t("btn-back");
        assert!(!back.is_empty());
        assert!(!back.starts_with("Missing"));
    }

    #[test]
    fn test_missing_key_reports() {
        assert!(t("no-such-key").starts_with("Missing translation"));
    }

    #[test]
    fn test_args_interpolated() {
        let msg = t_args("registration-done", &[("internal_id", "USER-0042".to_string())]);
        assert!(msg.contains("USER-0042"));
    }

    #[test]
    fn test_no_isolation_marks() {
        let msg = t_args("registration-done", &[("internal_id", "USER-0042".to_string())]);
        assert!(!msg.contains('\u{2068}'));
        assert!(!msg.contains('\u{2069}'));
    }
}
