use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use super::{
    config::Config,
    database::RedisStore,
    store::{HeaderStore, MemoryStore},
    uploads::Uploads,
};

pub struct State {
    pub config: Config,
    pub store: Arc<dyn HeaderStore>,
    pub uploads: Uploads,
}

impl State {
    pub async fn new(config: Config) -> Result<Arc<Self>> {
        let store: Arc<dyn HeaderStore> = if config.uses_memory_store() {
            Arc::new(MemoryStore::new())
        } else {
            Arc::new(
                RedisStore::connect(&config.store_url)
                    .await
                    .context("Failed to connect to the document store")?,
            )
        };

        Self::with_store(config, store).await
    }

    pub async fn with_store(config: Config, store: Arc<dyn HeaderStore>) -> Result<Arc<Self>> {
        let uploads = Uploads::new(config.uploads_dir.clone());
        uploads
            .ensure_dir()
            .await
            .with_context(|| format!("Failed to create {}", uploads.dir().display()))?;

        info!(backend = store.backend_tag(), uploads = %uploads.dir().display(), "State ready");

        Ok(Arc::new(Self {
            config,
            store,
            uploads,
        }))
    }
}
