//! Fixed premium-to-cheaper model switch table consulted by
//! `recommend_model_switches`.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// `(observed_model, cheaper_alternative)` pairs. Closed list; never
/// extended from configuration.
const SWITCH_TABLE: &[(&str, &str)] = &[
    ("gpt-4-turbo", "gpt-4o"),
    ("o1", "gpt-4o"),
    ("claude-3-opus", "claude-3-5-sonnet"),
    ("gemini-ultra", "gemini-1.5-pro"),
    ("gpt-4", "gpt-4o"),
];

/// Estimated fraction of a group's cost saved by the suggested switch.
pub const ESTIMATED_SAVINGS_FRACTION: Decimal = dec!(0.60);

/// Look up a cheaper alternative for an observed model, if one is known.
#[must_use]
pub fn cheaper_alternative(model: &str) -> Option<&'static str> {
    SWITCH_TABLE.iter().find(|(observed, _)| *observed == model).map(|(_, cheaper)| *cheaper)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_premium_model_has_alternative() {
        assert_eq!(cheaper_alternative("gpt-4-turbo"), Some("gpt-4o"));
    }

    #[test]
    fn unknown_model_has_no_alternative() {
        assert_eq!(cheaper_alternative("gpt-4o-mini"), None);
    }
}
