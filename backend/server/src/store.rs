//! # Store
//!
//! Persistence seam for every document the backend owns. Handlers never talk to a backend
//! directly; they go through [`HeaderStore`] held in [`crate::state::State`].
//!
//! ## Backends
//!
//! - [`crate::database::RedisStore`]: one redis hash per collection (id to JSON document),
//!   plain keys for singletons.
//! - [`MemoryStore`]: process-local maps behind one lock. Used for tests and `STORE_URL=memory`.
//!
//! ## Notes
//!
//! - Collections are returned unsorted. Ordering rules live in [`crate::header`] and
//!   [`crate::settings`] so both backends behave the same.
//! - [`HeaderStore::save_items`] is the bulk write of the reorder pass. It must be atomic and
//!   must never recreate an item that was removed in the meantime.
//! - The current header settings pointer only moves inside [`HeaderStore::insert_settings`] and
//!   [`HeaderStore::remove_settings`], together with the write, so it always names the newest
//!   record by [`HeaderSettings::rank`].
use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{HeaderSettings, NavigationItem, SiteLogo};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("document codec: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("duplicate key {0}")]
    DuplicateKey(Uuid),
}

#[async_trait]
pub trait HeaderStore: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    async fn list_items(&self) -> Result<Vec<NavigationItem>, StoreError>;

    async fn get_item(&self, id: Uuid) -> Result<Option<NavigationItem>, StoreError>;

    async fn insert_item(&self, item: &NavigationItem) -> Result<(), StoreError>;

    /// Returns `false` when no item with that id exists.
    async fn replace_item(&self, item: &NavigationItem) -> Result<bool, StoreError>;

    async fn remove_item(&self, id: Uuid) -> Result<Option<NavigationItem>, StoreError>;

    /// Overwrites every given item that still exists, all at once.
    async fn save_items(&self, items: &[NavigationItem]) -> Result<(), StoreError>;

    async fn list_settings(&self) -> Result<Vec<HeaderSettings>, StoreError>;

    async fn get_settings(&self, id: Uuid) -> Result<Option<HeaderSettings>, StoreError>;

    /// Also makes the record current unless a newer one already is.
    async fn insert_settings(&self, settings: &HeaderSettings) -> Result<(), StoreError>;

    async fn replace_settings(&self, settings: &HeaderSettings) -> Result<bool, StoreError>;

    /// Removing the current record moves the pointer to the newest remaining one, or clears it.
    async fn remove_settings(&self, id: Uuid) -> Result<Option<HeaderSettings>, StoreError>;

    async fn current_settings_id(&self) -> Result<Option<Uuid>, StoreError>;

    async fn get_logo(&self) -> Result<Option<SiteLogo>, StoreError>;

    async fn put_logo(&self, logo: &SiteLogo) -> Result<(), StoreError>;
}

#[derive(Default)]
struct Collections {
    items: HashMap<Uuid, NavigationItem>,
    settings: HashMap<Uuid, HeaderSettings>,
    current_settings: Option<Uuid>,
    logo: Option<SiteLogo>,
}

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HeaderStore for MemoryStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn list_items(&self) -> Result<Vec<NavigationItem>, StoreError> {
        Ok(self.collections.read().await.items.values().cloned().collect())
    }

    async fn get_item(&self, id: Uuid) -> Result<Option<NavigationItem>, StoreError> {
        Ok(self.collections.read().await.items.get(&id).cloned())
    }

    async fn insert_item(&self, item: &NavigationItem) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        if collections.items.contains_key(&item.id) {
            return Err(StoreError::DuplicateKey(item.id));
        }
        collections.items.insert(item.id, item.clone());
        Ok(())
    }

    async fn replace_item(&self, item: &NavigationItem) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;
        match collections.items.get_mut(&item.id) {
            Some(stored) => {
                *stored = item.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove_item(&self, id: Uuid) -> Result<Option<NavigationItem>, StoreError> {
        Ok(self.collections.write().await.items.remove(&id))
    }

    async fn save_items(&self, items: &[NavigationItem]) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        for item in items {
            if let Some(stored) = collections.items.get_mut(&item.id) {
                *stored = item.clone();
            }
        }
        Ok(())
    }

    async fn list_settings(&self) -> Result<Vec<HeaderSettings>, StoreError> {
        Ok(self
            .collections
            .read()
            .await
            .settings
            .values()
            .cloned()
            .collect())
    }

    async fn get_settings(&self, id: Uuid) -> Result<Option<HeaderSettings>, StoreError> {
        Ok(self.collections.read().await.settings.get(&id).cloned())
    }

    async fn insert_settings(&self, settings: &HeaderSettings) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        if collections.settings.contains_key(&settings.id) {
            return Err(StoreError::DuplicateKey(settings.id));
        }
        let newer = collections
            .current_settings
            .and_then(|id| collections.settings.get(&id))
            .is_none_or(|current| current.rank() < settings.rank());
        if newer {
            collections.current_settings = Some(settings.id);
        }
        collections.settings.insert(settings.id, settings.clone());
        Ok(())
    }

    async fn replace_settings(&self, settings: &HeaderSettings) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;
        match collections.settings.get_mut(&settings.id) {
            Some(stored) => {
                *stored = settings.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove_settings(&self, id: Uuid) -> Result<Option<HeaderSettings>, StoreError> {
        let mut collections = self.collections.write().await;
        let removed = collections.settings.remove(&id);
        if removed.is_some() && collections.current_settings == Some(id) {
            let next = collections
                .settings
                .values()
                .max_by_key(|settings| settings.rank())
                .map(|settings| settings.id);
            collections.current_settings = next;
        }
        Ok(removed)
    }

    async fn current_settings_id(&self) -> Result<Option<Uuid>, StoreError> {
        Ok(self.collections.read().await.current_settings)
    }

    async fn get_logo(&self) -> Result<Option<SiteLogo>, StoreError> {
        Ok(self.collections.read().await.logo.clone())
    }

    async fn put_logo(&self, logo: &SiteLogo) -> Result<(), StoreError> {
        self.collections.write().await.logo = Some(logo.clone());
        Ok(())
    }
}
