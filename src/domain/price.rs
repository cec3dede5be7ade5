//! Price cell formatting.

use rust_decimal::{Decimal, RoundingStrategy};

/// Text shown in a price cell until a price is known.
pub const PLACEHOLDER: &str = "-";

/// Format a last-traded price with two decimals, or the placeholder when
/// the value is not a finite number.
///
/// Ties round away from zero on the exact binary value, so `0.125` shows
/// `0.13` while `1.005` (stored just below the tie) shows `1.00`.
pub fn format_price(price: f64) -> String {
    if !price.is_finite() {
        return PLACEHOLDER.to_string();
    }
    // -0.0 would otherwise render as "-0.00"
    let price = if price == 0.0 { 0.0 } else { price };
    match Decimal::from_f64_retain(price) {
        Some(exact) => {
            let rounded = exact.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
            format!("{rounded:.2}")
        }
        // beyond Decimal range; no fractional digits left to round
        None => format!("{price:.2}"),
    }
}
