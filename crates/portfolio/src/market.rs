use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// One cleaned close price. Series of these are expected in strictly
/// increasing timestamp order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub close: f64,
}

impl PricePoint {
    pub fn new(timestamp: OffsetDateTime, close: f64) -> Self {
        Self { timestamp, close }
    }
}

pub fn is_tradable_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}
