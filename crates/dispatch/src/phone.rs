//! Phone normalization for the storefront's dialing region.
//!
//! Stored numbers arrive in every shape operators type them: international
//! prefixes, leading zeros, spaces, dashes. Normalization reduces them to
//! `<country code><local number>` digits or rejects them.

use cadence_core::config::WhatsAppConfig;

/// Normalize a raw phone value to international digits.
///
/// Rules, in order: strip non-digits, strip leading zeros; accept numbers
/// already carrying the country code at full length; prefix bare local
/// numbers; for anything longer, keep the last `local_number_len` digits and
/// prefix. Whatever remains after that is returned as-is and fails
/// validation downstream.
pub fn normalize(raw: &str, config: &WhatsAppConfig) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let trimmed = digits.trim_start_matches('0');

    let full_len = config.country_code.len() + config.local_number_len;
    if trimmed.starts_with(config.country_code.as_str()) && trimmed.len() == full_len {
        return trimmed.to_string();
    }
    if trimmed.len() == config.local_number_len {
        return format!("{}{}", config.country_code, trimmed);
    }
    if trimmed.len() > config.local_number_len {
        let tail = &trimmed[trimmed.len() - config.local_number_len..];
        return format!("{}{}", config.country_code, tail);
    }
    trimmed.to_string()
}

/// A number is dispatchable when it is exactly country code + local digits.
pub fn is_dispatchable(normalized: &str, config: &WhatsAppConfig) -> bool {
    normalized.starts_with(config.country_code.as_str())
        && normalized.len() == config.country_code.len() + config.local_number_len
        && normalized.chars().all(|c| c.is_ascii_digit())
}

/// Normalize and validate in one step.
pub fn dispatchable_number(raw: &str, config: &WhatsAppConfig) -> Option<String> {
    let normalized = normalize(raw, config);
    is_dispatchable(&normalized, config).then_some(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::AppConfig;

    fn config() -> WhatsAppConfig {
        AppConfig::default().whatsapp
    }

    #[test]
    fn canonical_shapes_all_normalize_the_same() {
        let config = config();
        for raw in ["0096598765432", "98765432", "096598765432", "96598765432"] {
            assert_eq!(normalize(raw, &config), "96598765432", "raw {raw}");
        }
    }

    #[test]
    fn punctuation_and_spaces_are_ignored() {
        let config = config();
        assert_eq!(normalize("+965 9876-5432", &config), "96598765432");
        assert_eq!(normalize("(965) 98 76 54 32", &config), "96598765432");
    }

    #[test]
    fn overlong_numbers_keep_the_local_tail() {
        let config = config();
        assert_eq!(normalize("4419876543210", &config), "96576543210");
        assert!(is_dispatchable("96576543210", &config));
    }

    #[test]
    fn short_numbers_fail_validation() {
        let config = config();
        let normalized = normalize("12345", &config);
        assert_eq!(normalized, "12345");
        assert!(!is_dispatchable(&normalized, &config));
    }

    #[test]
    fn empty_input_is_not_dispatchable() {
        let config = config();
        assert_eq!(dispatchable_number("", &config), None);
        assert_eq!(dispatchable_number("---", &config), None);
    }

    #[test]
    fn dispatchable_number_returns_normalized_digits() {
        let config = config();
        assert_eq!(
            dispatchable_number("0096598765432", &config),
            Some("96598765432".to_string())
        );
    }
}
