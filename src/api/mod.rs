pub mod client;
pub mod error;
pub mod link;
pub mod rarity;
pub mod steam;
pub mod types;

pub use client::ListingClient;
pub use error::ListingError;
pub use link::{InspectLink, InspectOwner};
pub use rarity::{rarity_color, RarityColor};
pub use steam::{SteamClientOptions, SteamMarketClient};
pub use types::{ItemMetadata, ListingSnapshot};
