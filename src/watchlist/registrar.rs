use std::sync::Arc;
use tokio::sync::Mutex;

use super::image_cache::ImageCache;
use super::input::{parse_float, parse_link, parse_price};
use super::item::WatchedItem;
use super::store::WatchlistStore;
use crate::api::{rarity_color, ItemMetadata, ListingClient};
use crate::core::error::{WatchError, WatchResult};

/// Turns user input (inspect link, target float, target price) into a
/// persisted watchlist entry.
pub struct ItemRegistrar {
    client: Arc<dyn ListingClient>,
    store: Arc<Mutex<WatchlistStore>>,
    images: Arc<ImageCache>,
    force_refresh_image: bool,
}

impl ItemRegistrar {
    pub fn new(
        client: Arc<dyn ListingClient>,
        store: Arc<Mutex<WatchlistStore>>,
        images: Arc<ImageCache>,
    ) -> Self {
        Self {
            client,
            store,
            images,
            force_refresh_image: false,
        }
    }

    /// Download the item image even when one is already cached.
    pub fn with_force_refresh_image(mut self, force: bool) -> Self {
        self.force_refresh_image = force;
        self
    }

    pub async fn register(&self, link: &str, float: &str, price: &str) -> WatchResult<WatchedItem> {
        let link = parse_link(link)?;
        let target_float = parse_float(float)?;
        let target_price = parse_price(price)?;

        let metadata = self.client.resolve(&link.to_string()).await?;
        tracing::info!("🔎 Resolved link to '{}' ({})", metadata.label, metadata.rarity);

        self.cache_image(&metadata).await;

        let item = WatchedItem::new(
            metadata.label.clone(),
            target_float,
            target_price,
            rarity_color(&metadata.rarity),
        );

        let mut store = self.store.lock().await;
        if !store.add(item.clone()) {
            return Err(WatchError::DuplicateItem(item.label));
        }
        if let Err(e) = store.persist().await {
            store.remove(&item.label);
            return Err(e);
        }

        tracing::info!(
            "➕ Watching '{}' for float ≤ {} at ≤ ${}",
            item.label,
            item.target_float,
            item.target_price
        );
        Ok(item)
    }

    pub async fn unregister(&self, label: &str) -> WatchResult<bool> {
        let mut store = self.store.lock().await;
        let Some((index, item)) = store.take(label) else {
            return Ok(false);
        };
        if let Err(e) = store.persist().await {
            store.insert(index, item);
            return Err(e);
        }
        tracing::info!("➖ Removed '{}' from the watchlist", label);
        Ok(true)
    }

    async fn cache_image(&self, metadata: &ItemMetadata) {
        if metadata.image_ref.is_empty() {
            return;
        }
        if !self.force_refresh_image && self.images.contains(&metadata.label).await {
            return;
        }

        match self.client.fetch_image(&metadata.image_ref).await {
            Ok(bytes) => {
                if let Err(e) = self.images.add(&metadata.label, &bytes).await {
                    tracing::warn!("Failed to cache image for '{}': {}", metadata.label, e);
                }
            }
            Err(e) => tracing::warn!("Failed to download image for '{}': {}", metadata.label, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::MockListingClient;
    use crate::api::ListingError;
    use mockall::predicate::eq;
    use rust_decimal_macros::dec;
    use std::path::PathBuf;

    const LINK: &str = "steam://rungame/730/76561202255233023/+csgo_econ_action_preview%20M4012345678901234567A27348562913D7935523998312483177";

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("float-watch-{}-{}", name, uuid::Uuid::new_v4()))
    }

    fn redline() -> ItemMetadata {
        ItemMetadata {
            label: "AK-47 | Redline (Field-Tested)".to_string(),
            rarity: "Classified".to_string(),
            image_ref: "https://example.invalid/redline.png".to_string(),
        }
    }

    async fn registrar(client: MockListingClient) -> (ItemRegistrar, Arc<Mutex<WatchlistStore>>) {
        let store = Arc::new(Mutex::new(WatchlistStore::new(temp_path("watchlist.json"))));
        let images = Arc::new(ImageCache::open(temp_path("images")).await.unwrap());
        (ItemRegistrar::new(Arc::new(client), store.clone(), images), store)
    }

    #[tokio::test]
    async fn test_register_resolves_and_caches_image_once() {
        let mut client = MockListingClient::new();
        client.expect_resolve().with(eq(LINK)).times(2).returning(|_| Ok(redline()));
        client
            .expect_fetch_image()
            .times(1)
            .returning(|_| Ok(b"png".to_vec()));

        let (registrar, store) = registrar(client).await;

        let item = registrar.register(LINK, "0.18", "$12.00").await.unwrap();
        assert_eq!(item.label, "AK-47 | Redline (Field-Tested)");
        assert_eq!(item.target_price, dec!(12.00));
        assert_eq!(item.rarity_color.to_string(), "#D32CE6");

        let err = registrar.register(LINK, "0.10", "5").await.unwrap_err();
        assert!(matches!(err, WatchError::DuplicateItem(label) if label == item.label));
        assert_eq!(store.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_force_refresh_downloads_cached_image() {
        let mut client = MockListingClient::new();
        client.expect_resolve().returning(|_| Ok(redline()));
        client
            .expect_fetch_image()
            .times(2)
            .returning(|_| Ok(b"png".to_vec()));

        let store = Arc::new(Mutex::new(WatchlistStore::new(temp_path("watchlist.json"))));
        let images = Arc::new(ImageCache::open(temp_path("images")).await.unwrap());
        let client: Arc<dyn ListingClient> = Arc::new(client);

        ItemRegistrar::new(client.clone(), store.clone(), images.clone())
            .register(LINK, "0.18", "12")
            .await
            .unwrap();
        store.lock().await.remove("AK-47 | Redline (Field-Tested)");

        ItemRegistrar::new(client, store, images.clone())
            .with_force_refresh_image(true)
            .register(LINK, "0.18", "12")
            .await
            .unwrap();
        assert_eq!(images.len().await, 1);
    }

    /// Store whose file sits under a regular file, so every save fails.
    fn unwritable_store() -> (WatchlistStore, PathBuf) {
        let blocker = temp_path("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        (WatchlistStore::new(blocker.join("watchlist.json")), blocker)
    }

    #[tokio::test]
    async fn test_failed_save_rolls_back_register() {
        let mut client = MockListingClient::new();
        client.expect_resolve().returning(|_| Ok(redline()));
        client.expect_fetch_image().returning(|_| Ok(b"png".to_vec()));

        let (store, blocker) = unwritable_store();
        let store = Arc::new(Mutex::new(store));
        let images = Arc::new(ImageCache::open(temp_path("images")).await.unwrap());
        let registrar = ItemRegistrar::new(Arc::new(client), store.clone(), images);

        let err = registrar.register(LINK, "0.18", "12").await.unwrap_err();
        assert!(matches!(err, WatchError::Storage(_)));
        assert!(store.lock().await.is_empty());

        let _ = std::fs::remove_file(&blocker);
    }

    #[tokio::test]
    async fn test_failed_save_rolls_back_unregister() {
        let (mut store, blocker) = unwritable_store();
        for label in ["a", "b", "c"] {
            store.add(WatchedItem::new(label, 0.1, dec!(1), crate::api::RarityColor::WHITE));
        }
        let store = Arc::new(Mutex::new(store));
        let images = Arc::new(ImageCache::open(temp_path("images")).await.unwrap());
        let registrar = ItemRegistrar::new(Arc::new(MockListingClient::new()), store.clone(), images);

        assert!(registrar.unregister("b").await.is_err());

        let store = store.lock().await;
        let labels: Vec<_> = store.all().iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["a", "b", "c"]);

        let _ = std::fs::remove_file(&blocker);
    }

    #[tokio::test]
    async fn test_invalid_input_never_reaches_network() {
        let mut client = MockListingClient::new();
        client.expect_resolve().never();

        let (registrar, store) = registrar(client).await;

        assert!(matches!(
            registrar.register("https://steamcommunity.com/market", "0.1", "1").await,
            Err(WatchError::InvalidReference(_))
        ));
        assert!(matches!(
            registrar.register(LINK, "2.0", "1").await,
            Err(WatchError::InvalidInput(_))
        ));
        assert!(store.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_upstream_failure_is_reported_and_store_unchanged() {
        let mut client = MockListingClient::new();
        client
            .expect_resolve()
            .returning(|_| Err(ListingError::Upstream("rate limited".into())));

        let (registrar, store) = registrar(client).await;

        let err = registrar.register(LINK, "0.18", "12").await.unwrap_err();
        assert!(matches!(err, WatchError::Upstream(_)));
        assert!(store.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_image_failure_does_not_block_registration() {
        let mut client = MockListingClient::new();
        client.expect_resolve().returning(|_| Ok(redline()));
        client
            .expect_fetch_image()
            .returning(|_| Err(ListingError::Upstream("timeout".into())));

        let (registrar, store) = registrar(client).await;

        registrar.register(LINK, "0.18", "12").await.unwrap();
        assert_eq!(store.lock().await.len(), 1);
        assert!(registrar.unregister("AK-47 | Redline (Field-Tested)").await.unwrap());
        assert!(!registrar.unregister("AK-47 | Redline (Field-Tested)").await.unwrap());
    }
}
