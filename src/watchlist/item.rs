use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

use crate::api::RarityColor;

/// A watchlist entry: the item to look for and the target it must beat.
///
/// Identity is the `label` alone; two entries with the same label are the
/// same item whatever their targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WatchedItem {
    pub label: String,
    #[serde(rename = "Float")]
    pub target_float: f64,
    #[serde(rename = "Price")]
    pub target_price: Decimal,
    pub rarity_color: RarityColor,
}

impl WatchedItem {
    pub fn new(
        label: impl Into<String>,
        target_float: f64,
        target_price: Decimal,
        rarity_color: RarityColor,
    ) -> Self {
        Self {
            label: label.into(),
            target_float,
            target_price,
            rarity_color,
        }
    }
}

impl PartialEq for WatchedItem {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label
    }
}

impl Eq for WatchedItem {}

impl Hash for WatchedItem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.label.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_equality_by_label_only() {
        let a = WatchedItem::new("AK-47 | Redline (Field-Tested)", 0.18, dec!(12.00), RarityColor::WHITE);
        let b = WatchedItem::new("AK-47 | Redline (Field-Tested)", 0.30, dec!(99.99), RarityColor::rgb(1, 2, 3));
        let c = WatchedItem::new("AWP | Asiimov (Field-Tested)", 0.18, dec!(12.00), RarityColor::WHITE);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_json_field_names() {
        let item = WatchedItem::new("M4A4 | Howl (Minimal Wear)", 0.07, dec!(4500.50), RarityColor::rgb(0xE4, 0xAE, 0x39));
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["Label"], "M4A4 | Howl (Minimal Wear)");
        assert_eq!(json["Float"], 0.07);
        assert_eq!(json["RarityColor"], "#E4AE39");

        let back: WatchedItem = serde_json::from_value(json).unwrap();
        assert_eq!(back.target_price, dec!(4500.50));
    }
}
