use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::{
    error::RegistryError,
    generator::CodeGenerator,
    models::{self, LinkEntry, LinkRecord, LinkStore},
    store::RecordStore,
};

/// The only path to the link mapping.
///
/// Readers get an immutable `Arc<LinkStore>` snapshot and never block each
/// other. `create` and the first load are serialized on `write_lock` so the
/// load → check → insert → save sequence never interleaves with another
/// writer. The snapshot is swapped only after the store has accepted the
/// write, so it never runs ahead of durable state.
pub struct LinkRegistry {
    store: Box<dyn RecordStore>,
    generator: CodeGenerator,
    snapshot: RwLock<Option<Arc<LinkStore>>>,
    write_lock: Mutex<()>,
    read_through: bool,
}

impl LinkRegistry {
    pub fn new(store: impl RecordStore, generator: CodeGenerator) -> Self {
        Self {
            store: Box::new(store),
            generator,
            snapshot: RwLock::new(None),
            write_lock: Mutex::new(()),
            read_through: false,
        }
    }

    /// When enabled, `resolve` and `list_all` re-read the store on every call
    /// instead of serving the cached snapshot.
    pub fn read_through(mut self, enabled: bool) -> Self {
        self.read_through = enabled;
        self
    }

    /// Current mapping. Loads (and, if needed, initializes) the store on
    /// first use.
    pub async fn snapshot(&self) -> Result<Arc<LinkStore>, RegistryError> {
        if self.read_through {
            if let Some(links) = self.store.read().await? {
                return Ok(Arc::new(links));
            }
        } else if let Some(cached) = self.cached().await {
            return Ok(cached);
        }
        self.initialize().await
    }

    /// Look up the target URL for `shortcode`. `Ok(None)` on a miss.
    pub async fn resolve(&self, shortcode: &str) -> Result<Option<String>, RegistryError> {
        let links = self.snapshot().await?;
        let url = links.get(shortcode).map(|entry| entry.url.clone());
        if url.is_none() {
            tracing::debug!("Short code '{}' not found", shortcode);
        }
        Ok(url)
    }

    /// Read-only view of every link.
    pub async fn list_all(&self) -> Result<Arc<LinkStore>, RegistryError> {
        self.snapshot().await
    }

    /// Store a new link, generating a short code when none is requested.
    ///
    /// Returns only after the store has durably accepted the new mapping.
    /// If that write fails nothing is kept in memory, so retrying with the
    /// same `requested_code` is safe.
    pub async fn create(
        &self,
        target_url: &str,
        requested_code: Option<&str>,
    ) -> Result<LinkRecord, RegistryError> {
        let url = models::validate_target_url(target_url)?;

        let _guard = self.write_lock.lock().await;

        // Always start from durable state, never from the cached snapshot.
        let mut links = self.store.load().await?;

        let shortcode = match requested_code {
            Some(code) => {
                models::validate_shortcode(code)?;
                if links.contains(code) {
                    return Err(RegistryError::ShortcodeTaken(code.to_owned()));
                }
                code.to_owned()
            }
            None => self.generator.generate(&links)?,
        };

        let entry = LinkEntry {
            url,
            created_at: Some(Utc::now()),
        };
        links.insert(shortcode.clone(), entry.clone());

        if let Err(e) = self.store.save(&links).await {
            tracing::error!("Failed to persist link '{}': {}", shortcode, e);
            return Err(RegistryError::Persistence(e));
        }

        *self.snapshot.write().await = Some(Arc::new(links));
        tracing::info!("Created link {} -> {}", shortcode, entry.url);

        Ok(LinkRecord {
            shortcode,
            url: entry.url,
            created_at: entry.created_at,
        })
    }

    async fn cached(&self) -> Option<Arc<LinkStore>> {
        self.snapshot.read().await.clone()
    }

    async fn initialize(&self) -> Result<Arc<LinkStore>, RegistryError> {
        let _guard = self.write_lock.lock().await;

        // Another caller may have finished loading while we waited.
        if !self.read_through {
            if let Some(cached) = self.cached().await {
                return Ok(cached);
            }
        }

        let links = Arc::new(self.store.load().await?);
        *self.snapshot.write().await = Some(Arc::clone(&links));
        Ok(links)
    }
}
