//! Shared phrasing for the per-tool interpretation prompts.

use crate::prelude::ThresholdRule;

pub const CLOSING: &str =
    "Give a concise geological interpretation of these results in one paragraph.";

/// Human wording of the subset a threshold rule selects.
pub fn rule_phrase(rule: ThresholdRule) -> String {
    match rule {
        ThresholdRule::Upper { fraction } => format!("top {:.0}% of values", fraction * 100.0),
        ThresholdRule::Symmetric { fraction } => {
            format!("top and bottom {:.0}% of values", fraction * 100.0)
        }
    }
}

pub fn span(range: (f64, f64), decimals: usize, unit: &str) -> String {
    format!(
        "{:.*} to {:.*} {}",
        decimals, range.0, decimals, range.1, unit
    )
    .trim_end()
    .to_string()
}

/// Background clause; the complement can be empty when every point is selected.
pub fn background(mean: Option<f64>, decimals: usize, unit: &str) -> String {
    match mean {
        Some(mean) => format!("against a background average of {:.*} {}", decimals, mean, unit)
            .trim_end()
            .to_string(),
        None => "with no remaining background points".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_phrase_names_percentages() {
        assert_eq!(
            rule_phrase(ThresholdRule::Upper { fraction: 0.1 }),
            "top 10% of values"
        );
        assert_eq!(
            rule_phrase(ThresholdRule::Symmetric { fraction: 0.3 }),
            "top and bottom 30% of values"
        );
    }

    #[test]
    fn unitless_background_has_no_trailing_space() {
        assert_eq!(background(Some(0.5), 2, ""), "against a background average of 0.50");
        assert_eq!(background(None, 2, "m"), "with no remaining background points");
    }

    #[test]
    fn span_formats_both_ends() {
        assert_eq!(span((1.0, 2.26), 1, "m"), "1.0 to 2.3 m");
        assert_eq!(span((1.0, 12.0), 0, ""), "1 to 12");
    }
}
