use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Display colour of an item's rarity tier, serialised as `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RarityColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RarityColor {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const WHITE: RarityColor = RarityColor::rgb(0xFF, 0xFF, 0xFF);
}

impl fmt::Display for RarityColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl FromStr for RarityColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(format!("expected #RRGGBB colour, got {:?}", s));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .map_err(|_| format!("expected #RRGGBB colour, got {:?}", s))
        };
        Ok(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl TryFrom<String> for RarityColor {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RarityColor> for String {
    fn from(color: RarityColor) -> Self {
        color.to_string()
    }
}

/// In-game colour for a CS rarity name. Matching is on the leading tier
/// word so both "Mil-Spec" and "Mil-Spec Grade" resolve.
pub fn rarity_color(rarity: &str) -> RarityColor {
    let rarity = rarity.trim().to_ascii_lowercase();
    match rarity.as_str() {
        r if r.starts_with("consumer") || r == "base grade" => RarityColor::rgb(0xB0, 0xC3, 0xD9),
        r if r.starts_with("industrial") => RarityColor::rgb(0x5E, 0x98, 0xD9),
        r if r.starts_with("mil-spec") => RarityColor::rgb(0x4B, 0x69, 0xFF),
        r if r.starts_with("restricted") => RarityColor::rgb(0x88, 0x47, 0xFF),
        r if r.starts_with("classified") => RarityColor::rgb(0xD3, 0x2C, 0xE6),
        r if r.starts_with("covert") => RarityColor::rgb(0xEB, 0x4B, 0x4B),
        "contraband" | "extraordinary" => RarityColor::rgb(0xE4, 0xAE, 0x39),
        _ => RarityColor::WHITE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_rarities() {
        assert_eq!(rarity_color("Classified").to_string(), "#D32CE6");
        assert_eq!(rarity_color("Mil-Spec Grade").to_string(), "#4B69FF");
        assert_eq!(rarity_color("  covert ").to_string(), "#EB4B4B");
    }

    #[test]
    fn test_unknown_rarity_is_white() {
        assert_eq!(rarity_color("Legendary"), RarityColor::WHITE);
    }

    #[test]
    fn test_color_serde_as_hex() {
        let json = serde_json::to_string(&rarity_color("Restricted")).unwrap();
        assert_eq!(json, "\"#8847FF\"");

        let parsed: RarityColor = serde_json::from_str("\"#8847ff\"").unwrap();
        assert_eq!(parsed, RarityColor::rgb(0x88, 0x47, 0xFF));

        assert!(serde_json::from_str::<RarityColor>("\"#88\"").is_err());
    }
}
