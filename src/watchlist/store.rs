use std::path::{Path, PathBuf};

use super::item::WatchedItem;
use crate::core::error::WatchResult;

/// Ordered, label-unique list of watched items backed by a JSON file.
#[derive(Debug)]
pub struct WatchlistStore {
    path: PathBuf,
    items: Vec<WatchedItem>,
}

impl WatchlistStore {
    /// Empty store that will persist to `path`. Nothing is read or written.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            items: Vec::new(),
        }
    }

    /// Read the watchlist at `path`, creating an empty file on first start.
    pub async fn load(path: impl Into<PathBuf>) -> WatchResult<Self> {
        let mut store = Self::new(path);

        if !tokio::fs::try_exists(&store.path).await? {
            tracing::info!("📄 No watchlist at {:?}, creating one", store.path);
            store.persist().await?;
            return Ok(store);
        }

        let raw = tokio::fs::read_to_string(&store.path).await?;
        let items: Vec<WatchedItem> = if raw.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&raw)?
        };

        for item in items {
            let label = item.label.clone();
            if !store.add(item) {
                tracing::warn!("Dropping duplicate watchlist entry '{}'", label);
            }
        }

        tracing::info!("📋 Loaded {} watched items from {:?}", store.len(), store.path);
        Ok(store)
    }

    /// Append `item` unless an entry with the same label exists.
    pub fn add(&mut self, item: WatchedItem) -> bool {
        if self.items.contains(&item) {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn remove(&mut self, label: &str) -> bool {
        self.take(label).is_some()
    }

    /// Remove the entry for `label`, returning its position and value.
    pub fn take(&mut self, label: &str) -> Option<(usize, WatchedItem)> {
        let index = self.items.iter().position(|item| item.label == label)?;
        Some((index, self.items.remove(index)))
    }

    /// Put `item` at `index` (clamped to the end) unless its label is taken.
    pub fn insert(&mut self, index: usize, item: WatchedItem) -> bool {
        if self.items.contains(&item) {
            return false;
        }
        let index = index.min(self.items.len());
        self.items.insert(index, item);
        true
    }

    /// Entries whose label is in `labels`, or every entry when `labels` is
    /// `None`. The second list holds the requested labels not on the list.
    pub fn select(&self, labels: Option<&[String]>) -> (Vec<WatchedItem>, Vec<String>) {
        let Some(labels) = labels else {
            return (self.items.clone(), Vec::new());
        };

        let selected = self
            .items
            .iter()
            .filter(|item| labels.contains(&item.label))
            .cloned()
            .collect();
        let missing = labels
            .iter()
            .filter(|label| self.get(label).is_none())
            .cloned()
            .collect();
        (selected, missing)
    }

    pub fn get(&self, label: &str) -> Option<&WatchedItem> {
        self.items.iter().find(|item| item.label == label)
    }

    pub fn all(&self) -> &[WatchedItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the list as pretty JSON via a temp file + rename.
    pub async fn persist(&self) -> WatchResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(&self.items)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        tracing::debug!("💾 Saved {} watched items to {:?}", self.items.len(), self.path);
        Ok(())
    }
}
