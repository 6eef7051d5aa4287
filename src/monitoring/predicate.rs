use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::api::ListingSnapshot;
use crate::watchlist::WatchedItem;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FloatRule {
    /// Listing float must not exceed the target.
    AtMost,
    /// Listing float must lie within `tolerance` of the target.
    Within { tolerance: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceRule {
    AtMost,
    Exact,
}

/// When a listing counts as a hit for a watched item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchRule {
    pub float: FloatRule,
    pub price: PriceRule,
}

impl Default for MatchRule {
    fn default() -> Self {
        Self {
            float: FloatRule::AtMost,
            price: PriceRule::AtMost,
        }
    }
}

impl MatchRule {
    pub fn matches(&self, item: &WatchedItem, snapshot: &ListingSnapshot) -> bool {
        self.float_matches(item.target_float, snapshot.float)
            && self.price_matches(item.target_price, snapshot.price)
    }

    fn float_matches(&self, target: f64, actual: f64) -> bool {
        if !actual.is_finite() {
            return false;
        }
        match self.float {
            FloatRule::AtMost => actual <= target,
            FloatRule::Within { tolerance } => (actual - target).abs() <= tolerance.abs(),
        }
    }

    fn price_matches(&self, target: Decimal, actual: Decimal) -> bool {
        match self.price {
            PriceRule::AtMost => actual <= target,
            PriceRule::Exact => actual == target,
        }
    }
}
