use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Item description returned when an inspect link is resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemMetadata {
    pub label: String,
    pub rarity: String,
    pub image_ref: String,
}

/// One observation of an item's live listing page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingSnapshot {
    pub float: f64,
    pub price: Decimal,
    pub title: String,
    pub image_ref: String,
    pub rarity: String,
}

// Float API wire format

#[derive(Debug, Clone, Deserialize)]
pub struct FloatApiResponse {
    pub iteminfo: FloatItemInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FloatItemInfo {
    pub floatvalue: f64,
    #[serde(default)]
    pub full_item_name: Option<String>,
    #[serde(default)]
    pub rarity_name: Option<String>,
    #[serde(default)]
    pub imageurl: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FloatApiError {
    pub error: String,
    #[serde(default)]
    pub code: Option<i64>,
}

// Steam market render wire format

#[derive(Debug, Clone, Deserialize)]
pub struct RenderResponse {
    pub success: bool,
    #[serde(default)]
    pub total_count: Option<u64>,
    /// Object keyed by listing id, or `[]` when nothing is for sale.
    #[serde(default)]
    pub listinginfo: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderListing {
    pub listingid: String,
    #[serde(default)]
    pub converted_price: Option<i64>,
    #[serde(default)]
    pub converted_fee: Option<i64>,
    pub asset: RenderAsset,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderAsset {
    pub id: String,
    #[serde(default)]
    pub market_actions: Vec<MarketAction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketAction {
    pub link: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl RenderListing {
    /// Buyer-facing price (price + fee) in minor currency units.
    pub fn total_cents(&self) -> Option<i64> {
        Some(self.converted_price? + self.converted_fee.unwrap_or(0))
    }

    pub fn price(&self) -> Option<Decimal> {
        self.total_cents().map(|cents| Decimal::new(cents, 2))
    }

    pub fn inspect_template(&self) -> Option<&str> {
        self.asset
            .market_actions
            .iter()
            .find(|action| action.link.contains("csgo_econ_action_preview"))
            .map(|action| action.link.as_str())
    }
}

impl RenderResponse {
    pub fn listings(&self) -> Result<Vec<RenderListing>, serde_json::Error> {
        match &self.listinginfo {
            serde_json::Value::Object(_) => {
                let map: HashMap<String, RenderListing> =
                    serde_json::from_value(self.listinginfo.clone())?;
                Ok(map.into_values().collect())
            }
            _ => Ok(Vec::new()),
        }
    }
}
