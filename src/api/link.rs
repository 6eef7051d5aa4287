use std::fmt;

use super::error::ListingError;

const LINK_PREFIX: &str = "steam://rungame/730/";
const PREVIEW_ACTION: &str = "/+csgo_econ_action_preview";

/// Where an inspected item currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InspectOwner {
    /// `S<steamid>`: the item sits in a player's inventory.
    Inventory,
    /// `M<listingid>`: the item is up for sale on the community market.
    Market,
}

/// A validated CS inspect link, e.g.
/// `steam://rungame/730/76561202255233023/+csgo_econ_action_preview%20M123A456D789`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectLink {
    pub app_owner: String,
    pub owner: InspectOwner,
    pub owner_id: String,
    pub asset_id: String,
    pub d: String,
}

impl InspectLink {
    pub fn parse(text: &str) -> Result<Self, ListingError> {
        let text = text.trim();
        let invalid = || ListingError::InvalidReference(format!("not an inspect link: {:?}", text));

        let rest = text.strip_prefix(LINK_PREFIX).ok_or_else(invalid)?;
        let (app_owner, rest) = rest.split_once(PREVIEW_ACTION).ok_or_else(invalid)?;
        if app_owner.is_empty() || !app_owner.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let params = rest
            .strip_prefix("%20")
            .or_else(|| rest.strip_prefix(' '))
            .ok_or_else(invalid)?;

        let owner = match params.as_bytes().first() {
            Some(b'S') => InspectOwner::Inventory,
            Some(b'M') => InspectOwner::Market,
            _ => return Err(invalid()),
        };
        let (owner_id, rest) = params[1..].split_once('A').ok_or_else(invalid)?;
        let (asset_id, d) = rest.split_once('D').ok_or_else(invalid)?;

        let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(owner_id) || !all_digits(asset_id) || !all_digits(d) {
            return Err(invalid());
        }

        Ok(Self {
            app_owner: app_owner.to_string(),
            owner,
            owner_id: owner_id.to_string(),
            asset_id: asset_id.to_string(),
            d: d.to_string(),
        })
    }

    /// Fill a market action template (`%listingid%` / `%assetid%`) and
    /// validate the result.
    pub fn from_template(template: &str, listing_id: &str, asset_id: &str) -> Result<Self, ListingError> {
        let link = template
            .replace("%listingid%", listing_id)
            .replace("%assetid%", asset_id);
        Self::parse(&link)
    }
}

impl fmt::Display for InspectLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let owner = match self.owner {
            InspectOwner::Inventory => 'S',
            InspectOwner::Market => 'M',
        };
        write!(
            f,
            "{}{}{}%20{}{}A{}D{}",
            LINK_PREFIX, self.app_owner, PREVIEW_ACTION, owner, self.owner_id, self.asset_id, self.d
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKET_LINK: &str = "steam://rungame/730/76561202255233023/+csgo_econ_action_preview%20M4012345678901234567A27348562913D7935523998312483177";

    #[test]
    fn test_parse_market_link() {
        let link = InspectLink::parse(MARKET_LINK).unwrap();
        assert_eq!(link.owner, InspectOwner::Market);
        assert_eq!(link.owner_id, "4012345678901234567");
        assert_eq!(link.asset_id, "27348562913");
        assert_eq!(link.d, "7935523998312483177");
        assert_eq!(link.to_string(), MARKET_LINK);
    }

    #[test]
    fn test_parse_inventory_link_with_space() {
        let link = InspectLink::parse(
            " steam://rungame/730/76561202255233023/+csgo_econ_action_preview S76561198084749846A698323590D7935523998312483177 ",
        )
        .unwrap();
        assert_eq!(link.owner, InspectOwner::Inventory);
        assert_eq!(link.owner_id, "76561198084749846");
    }

    #[test]
    fn test_rejects_other_shapes() {
        for bad in [
            "",
            "https://steamcommunity.com/market/listings/730/AK-47",
            "steam://rungame/730/76561202255233023/+csgo_econ_action_preview%20X1A2D3",
            "steam://rungame/730/76561202255233023/+csgo_econ_action_preview%20M1A2",
            "steam://rungame/730/abc/+csgo_econ_action_preview%20M1A2D3",
        ] {
            assert!(
                matches!(InspectLink::parse(bad), Err(ListingError::InvalidReference(_))),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_from_template() {
        let template = "steam://rungame/730/76561202255233023/+csgo_econ_action_preview%20M%listingid%A%assetid%D1234";
        let link = InspectLink::from_template(template, "555", "777").unwrap();
        assert_eq!(link.owner_id, "555");
        assert_eq!(link.asset_id, "777");
    }
}
