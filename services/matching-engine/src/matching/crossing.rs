//! Crossing detection
//!
//! A buy crosses when the best ask is at or below its limit; a sell
//! crosses when the best bid is at or above its limit. Market orders
//! skip this check entirely.

use types::numeric::Price;
use types::order::Side;

/// Whether an aggressor at `limit_price` can trade against a resting
/// level at `resting_price`.
pub fn crosses(aggressor_side: Side, limit_price: Price, resting_price: Price) -> bool {
    match aggressor_side {
        Side::Buy => resting_price <= limit_price,
        Side::Sell => resting_price >= limit_price,
    }
}
