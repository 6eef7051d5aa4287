use async_trait::async_trait;

use super::error::ListingError;
use super::types::{ItemMetadata, ListingSnapshot};
use crate::proxy::ProxyIdentity;
use crate::watchlist::WatchedItem;

/// Marketplace capability used by registration and by every monitor.
///
/// Implementations are stateless from the caller's point of view and are
/// shared as `Arc<dyn ListingClient>` across monitor tasks.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ListingClient: Send + Sync {
    /// Validate an inspect link and look up the item it points at.
    async fn resolve(&self, link: &str) -> Result<ItemMetadata, ListingError>;

    /// Fetch the current state of the item's live listing, routed through
    /// `proxy` when one is given.
    async fn poll(
        &self,
        item: &WatchedItem,
        proxy: Option<ProxyIdentity>,
    ) -> Result<ListingSnapshot, ListingError>;

    async fn fetch_image(&self, image_ref: &str) -> Result<Vec<u8>, ListingError>;
}
