//! Rounding, bound parsing and cost formatting shared by every budget path
//!
//! The live editor preview and the server-side history writer both go
//! through these helpers, so a budget rounds the same way wherever it is
//! computed.

use tracing::debug;

/// Round to 2 decimal places, ties toward positive infinity
///
/// Matches `Math.round(value * 100) / 100`, which is how stored history
/// values were produced: `0.125` rounds to `0.13` and `-0.125` to `-0.12`.
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let scaled = value * 100.0;
    let floor = scaled.floor();
    let rounded = if scaled - floor >= 0.5 { floor + 1.0 } else { floor };
    rounded / 100.0
}

/// Parse a bound endpoint stored as text
///
/// Surrounding whitespace is ignored. Anything that is not a finite number
/// (including the empty string) is `0`.
pub fn parse_bound(text: &str) -> f64 {
    match text.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => {
            if !text.trim().is_empty() {
                debug!(bound = text, "unparsable bound treated as 0");
            }
            0.0
        }
    }
}

/// Render a cost with at most two decimals and no trailing zeros
///
/// `15.0` renders as `15`, `12.50` as `12.5`, `1.0 / 3.0` as `0.33`.
pub fn format_cost(value: f64) -> String {
    let text = format!("{:.2}", round2(value));
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}
