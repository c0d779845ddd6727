use async_trait::async_trait;
use serde::Deserialize;
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tokio::io::AsyncWriteExt;

use crate::{
    error::StoreError,
    models::{LinkEntry, LinkStore},
};

// ── Trait ──────────────────────────────────────────────────────────────────

/// Durable home of the whole [`LinkStore`], read and written as one unit.
///
/// Only `LinkRegistry` calls `save`; everything else goes through it.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    /// Read the persisted mapping. `Ok(None)` means nothing has been
    /// persisted yet.
    async fn read(&self) -> Result<Option<LinkStore>, StoreError>;

    /// Replace the persisted mapping with `store`. A crash part-way through
    /// must leave either the old or the new mapping readable.
    async fn save(&self, store: &LinkStore) -> Result<(), StoreError>;

    /// Read the persisted mapping, first persisting an empty one if none
    /// exists. After this returns `Ok`, durable storage holds a well-formed
    /// mapping.
    async fn load(&self) -> Result<LinkStore, StoreError> {
        if let Some(store) = self.read().await? {
            return Ok(store);
        }
        let empty = LinkStore::new();
        self.save(&empty).await?;
        tracing::info!("Initialized empty link store");
        Ok(empty)
    }
}

// ── JSON file ──────────────────────────────────────────────────────────────

/// A [`RecordStore`] backed by one pretty-printed JSON file:
///
/// ```json
/// {
///   "abc": { "url": "https://a.example", "created_at": "2026-10-19T12:00:00Z" }
/// }
/// ```
///
/// Writes go to a temp file in the same directory which is fsynced and then
/// renamed over the target.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "links".into())
    }

    /// Unique per call so concurrent writers never share a temp file.
    fn temp_path(&self) -> PathBuf {
        let name = self.file_name();
        self.dir()
            .join(format!(".{name}.{:016x}.tmp", rand::random::<u64>()))
    }

    /// Removes temp files left next to the links file by saves that never
    /// reached the rename. Only call this before any save can be in flight.
    pub async fn sweep_stale_temp_files(&self) -> Result<usize, StoreError> {
        let prefix = format!(".{}.", self.file_name());
        let mut entries = match tokio::fs::read_dir(self.dir()).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(StoreError::io("list directory of", &self.path, e)),
        };

        let mut removed = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io("list directory of", &self.path, e))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !(name.starts_with(&prefix) && name.ends_with(".tmp")) {
                continue;
            }
            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("Could not remove {}: {}", entry.path().display(), e),
            }
        }

        if removed > 0 {
            tracing::info!(
                "Removed {} stale temp file(s) next to {}",
                removed,
                self.path.display()
            );
        }
        Ok(removed)
    }

    fn decode(&self, bytes: &[u8]) -> Result<LinkStore, StoreError> {
        let corrupt = |source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        };

        let value: serde_json::Value = serde_json::from_slice(bytes).map_err(corrupt)?;
        match value {
            serde_json::Value::Object(_) => serde_json::from_value(value).map_err(corrupt),
            serde_json::Value::Array(_) => {
                let legacy: Vec<LegacyLink> = serde_json::from_value(value).map_err(corrupt)?;
                Ok(self.upgrade_legacy(legacy))
            }
            other => Err(corrupt(<serde_json::Error as serde::de::Error>::custom(
                format!("expected an object of links, found {other}"),
            ))),
        }
    }

    /// Convert the old `[{"shortcode", "url"}, ...]` layout. The first
    /// occurrence of a code wins, matching how lookups behaved against the
    /// list.
    fn upgrade_legacy(&self, legacy: Vec<LegacyLink>) -> LinkStore {
        let total = legacy.len();
        let mut store = LinkStore::new();
        let mut skipped = 0usize;

        for link in legacy {
            match (link.shortcode, link.url) {
                (Some(code), Some(url)) if !code.is_empty() && !url.is_empty() => {
                    let entry = LinkEntry {
                        url,
                        created_at: None,
                    };
                    if !store.insert(code, entry) {
                        skipped += 1;
                    }
                }
                _ => skipped += 1,
            }
        }

        if skipped > 0 {
            tracing::warn!(
                "Legacy link list at {}: skipped {} of {} entries (blank or duplicate short code)",
                self.path.display(),
                skipped,
                total
            );
        }
        tracing::info!(
            "Read legacy link list at {}; it will be rewritten as a mapping on the next save",
            self.path.display()
        );
        store
    }
}

#[derive(Deserialize)]
struct LegacyLink {
    shortcode: Option<String>,
    url: Option<String>,
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn read(&self) -> Result<Option<LinkStore>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io("read", &self.path, e)),
        };
        self.decode(&bytes).map(Some)
    }

    async fn save(&self, store: &LinkStore) -> Result<(), StoreError> {
        let mut bytes = serde_json::to_vec_pretty(store)
            .map_err(|e| StoreError::io("serialize", &self.path, e.into()))?;
        bytes.push(b'\n');

        let dir = self.dir();
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| StoreError::io("create directory for", &self.path, e))?;

        let tmp = self.temp_path();
        if let Err(e) = write_synced(&tmp, &bytes).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(StoreError::io("write", &self.path, e));
        }

        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(StoreError::io("replace", &self.path, e));
        }

        // Make the rename itself durable. Not every platform lets a directory
        // be opened for syncing, so a failure here is only logged.
        #[cfg(unix)]
        {
            if let Err(e) = sync_dir(dir).await {
                tracing::debug!("fsync of {} failed: {}", dir.display(), e);
            }
        }

        tracing::debug!(
            "Saved {} link(s) to {}",
            store.len(),
            self.path.display()
        );
        Ok(())
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await
}

#[cfg(unix)]
async fn sync_dir(dir: &Path) -> std::io::Result<()> {
    tokio::fs::File::open(dir).await?.sync_all().await
}
