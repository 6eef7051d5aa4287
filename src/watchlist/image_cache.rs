use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use crate::core::error::WatchResult;

const IMAGE_EXTENSION: &str = "img";

/// On-disk item image cache keyed by item label, so an item's picture is
/// downloaded once across sessions.
pub struct ImageCache {
    dir: PathBuf,
    known: RwLock<HashSet<String>>,
}

impl ImageCache {
    pub async fn open(dir: impl Into<PathBuf>) -> WatchResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;

        let mut known = HashSet::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if let Some(label) = label_from_path(&entry.path()) {
                known.insert(label);
            }
        }

        tracing::debug!("🖼️  Image cache at {:?} holds {} images", dir, known.len());
        Ok(Self {
            dir,
            known: RwLock::new(known),
        })
    }

    pub async fn contains(&self, label: &str) -> bool {
        self.known.read().await.contains(label)
    }

    pub async fn add(&self, label: &str, image: &[u8]) -> WatchResult<()> {
        tokio::fs::write(self.path_for(label), image).await?;
        self.known.write().await.insert(label.to_string());
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.known.read().await.len()
    }

    fn path_for(&self, label: &str) -> PathBuf {
        let name: String = label.bytes().map(|b| format!("{:02x}", b)).collect();
        self.dir.join(format!("{}.{}", name, IMAGE_EXTENSION))
    }
}

// File names are the hex-encoded label, which keeps them filesystem-safe
// and lets the index be rebuilt from a directory listing.
fn label_from_path(path: &Path) -> Option<String> {
    if path.extension()?.to_str()? != IMAGE_EXTENSION {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    if stem.len() % 2 != 0 {
        return None;
    }
    let bytes = (0..stem.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(stem.get(i..i + 2)?, 16).ok())
        .collect::<Option<Vec<u8>>>()?;
    String::from_utf8(bytes).ok()
}
