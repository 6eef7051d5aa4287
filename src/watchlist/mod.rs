pub mod image_cache;
pub mod input;
pub mod item;
pub mod registrar;
pub mod store;

pub use image_cache::ImageCache;
pub use item::WatchedItem;
pub use registrar::ItemRegistrar;
pub use store::WatchlistStore;
