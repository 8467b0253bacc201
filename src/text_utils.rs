//! # Text Utilities Module
//!
//! Input normalization and validation for free-text numeric entry,
//! including Persian-Arabic digit forms (۰–۹).

/// Maps Persian-Arabic digit glyphs to their ASCII equivalents, leaving all
/// other characters unchanged.
pub fn normalize_digits(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '۰' => '0',
            '۱' => '1',
            '۲' => '2',
            '۳' => '3',
            '۴' => '4',
            '۵' => '5',
            '۶' => '6',
            '۷' => '7',
            '۸' => '8',
            '۹' => '9',
            other => other,
        })
        .collect()
}

/// Validates a product code: after digit normalization it must be exactly
/// four ASCII digits. Returns the normalized code.
pub fn validate_product_code(input: &str) -> Option<String> {
    let normalized = normalize_digits(input.trim());
    if normalized.len() == 4 && normalized.chars().all(|c| c.is_ascii_digit()) {
        Some(normalized)
    } else {
        None
    }
}

/// Parses a positive decimal number after digit normalization.
pub fn parse_positive_number(input: &str) -> Option<f64> {
    let normalized = normalize_digits(input.trim());
    match normalized.parse::<f64>() {
        Ok(value) if value > 0.0 => Some(value),
        _ => None,
    }
}

/// Checks a range upper bound against its lower bound. The maximum must
/// strictly exceed the minimum.
pub fn valid_range_bounds(min: f64, max: f64) -> bool {
    max > min
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_ascii_unchanged() {
        assert_eq!(normalize_digits("1234"), "1234");
        assert_eq!(normalize_digits("12.5 kg"), "12.5 kg");
    }

    #[test]
    fn test_normalize_persian_digits() {
        assert_eq!(normalize_digits("۱۲۳۴"), "1234");
        assert_eq!(normalize_digits("۰۹"), "09");
    }

    #[test]
    fn test_normalize_mixed_digits() {
        let normalized = normalize_digits("۱2۳4");
        assert_eq!(normalized, "1234");
        assert_eq!(normalized.chars().count(), "۱2۳4".chars().count());
    }

    #[test]
    fn test_normalize_idempotent() {
        let once = normalize_digits("۵۶۷abc");
        assert_eq!(normalize_digits(&once), once);
    }

    #[test]
    fn test_product_code_accepts_four_digits() {
        assert_eq!(validate_product_code("1234").as_deref(), Some("1234"));
        assert_eq!(validate_product_code("۱۲۳۴").as_deref(), Some("1234"));
        assert_eq!(validate_product_code("  0042 ").as_deref(), Some("0042"));
    }

    #[test]
    fn test_product_code_rejects_bad_input() {
        assert!(validate_product_code("123").is_none());
        assert!(validate_product_code("12345").is_none());
        assert!(validate_product_code("12.3").is_none());
        assert!(validate_product_code("12a4").is_none());
        assert!(validate_product_code("-123").is_none());
        assert!(validate_product_code("").is_none());
    }

    #[test]
    fn test_parse_positive_number() {
        assert_eq!(parse_positive_number("12.5"), Some(12.5));
        assert_eq!(parse_positive_number("۷"), Some(7.0));
        assert_eq!(parse_positive_number("0"), None);
        assert_eq!(parse_positive_number("-3"), None);
        assert_eq!(parse_positive_number("abc"), None);
    }

    #[test]
    fn test_range_bounds() {
        assert!(valid_range_bounds(6.0, 10.0));
        assert!(!valid_range_bounds(6.0, 5.0));
        assert!(!valid_range_bounds(6.0, 6.0));
    }
}
