//! # Redis
//!
//! Document store for the header CMS.
//!
//! Small dataset (a navigation menu and a handful of logo records), so every document is kept
//! as a JSON string and collections are read whole.
//!
//! ## Layout
//!
//! Every key lives under a namespace, `header` unless [`RedisStore::with_namespace`] says otherwise.
//!
//! - `header:items`: hash, navigation item id to JSON document
//! - `header:settings`: hash, header settings id to JSON document
//! - `header:settings:rank`: hash, header settings id to [`HeaderSettings::rank`]
//! - `header:settings:current`: string, id of the current header settings record
//! - `header:logo`: string, JSON site logo
//!
//! ## Atomicity
//!
//! - Replace and remove are Lua scripts so the existence check and the write cannot interleave
//!   with another request.
//! - The reorder pass writes every renumbered item in one script run. Items deleted after the
//!   pass read the collection are skipped, never recreated.
//! - Header settings insert and remove move the current pointer in the same script run, picking
//!   the highest rank.
use std::time::Duration;

use async_trait::async_trait;
use redis::{
    AsyncCommands, Client, Script,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use serde::{Serialize, de::DeserializeOwned};
use tracing::info;
use uuid::Uuid;

use crate::{
    models::{HeaderSettings, NavigationItem, SiteLogo},
    store::{HeaderStore, StoreError},
};

const DEFAULT_NAMESPACE: &str = "header";

const REPLACE_EXISTING: &str = r"
if redis.call('HEXISTS', KEYS[1], ARGV[1]) == 1 then
    redis.call('HSET', KEYS[1], ARGV[1], ARGV[2])
    return 1
end
return 0
";

const TAKE: &str = r"
local doc = redis.call('HGET', KEYS[1], ARGV[1])
if doc then
    redis.call('HDEL', KEYS[1], ARGV[1])
end
return doc
";

const SAVE_EXISTING: &str = r"
for i = 1, #ARGV, 2 do
    if redis.call('HEXISTS', KEYS[1], ARGV[i]) == 1 then
        redis.call('HSET', KEYS[1], ARGV[i], ARGV[i + 1])
    end
end
return 0
";

const INSERT_SETTINGS: &str = r"
if redis.call('HSETNX', KEYS[1], ARGV[1], ARGV[2]) == 0 then
    return 0
end
redis.call('HSET', KEYS[2], ARGV[1], ARGV[3])
local current = redis.call('GET', KEYS[3])
local current_rank = current and redis.call('HGET', KEYS[2], current)
if not current_rank or current_rank < ARGV[3] then
    redis.call('SET', KEYS[3], ARGV[1])
end
return 1
";

const REMOVE_SETTINGS: &str = r"
local doc = redis.call('HGET', KEYS[1], ARGV[1])
if not doc then
    return false
end
redis.call('HDEL', KEYS[1], ARGV[1])
redis.call('HDEL', KEYS[2], ARGV[1])
if redis.call('GET', KEYS[3]) == ARGV[1] then
    local ranks = redis.call('HGETALL', KEYS[2])
    local next_id, next_rank = false, false
    for i = 1, #ranks, 2 do
        if not next_rank or ranks[i + 1] > next_rank then
            next_id, next_rank = ranks[i], ranks[i + 1]
        end
    end
    if next_id then
        redis.call('SET', KEYS[3], next_id)
    else
        redis.call('DEL', KEYS[3])
    end
end
return doc
";

pub async fn init_redis(redis_url: &str) -> Result<ConnectionManager, StoreError> {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_millis(500));

    let client = Client::open(redis_url)?;
    let connection_manager = client.get_connection_manager_with_config(config).await?;

    info!("Connected to redis");

    Ok(connection_manager)
}

struct Keys {
    items: String,
    settings: String,
    settings_rank: String,
    current_settings: String,
    logo: String,
}

impl Keys {
    fn new(namespace: &str) -> Self {
        Self {
            items: format!("{namespace}:items"),
            settings: format!("{namespace}:settings"),
            settings_rank: format!("{namespace}:settings:rank"),
            current_settings: format!("{namespace}:settings:current"),
            logo: format!("{namespace}:logo"),
        }
    }
}

pub struct RedisStore {
    connection: ConnectionManager,
    keys: Keys,
    replace_existing: Script,
    take: Script,
    save_existing: Script,
    insert_settings: Script,
    remove_settings: Script,
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        Ok(Self::new(init_redis(redis_url).await?))
    }

    pub fn new(connection: ConnectionManager) -> Self {
        Self::with_namespace(connection, DEFAULT_NAMESPACE)
    }

    pub fn with_namespace(connection: ConnectionManager, namespace: &str) -> Self {
        Self {
            connection,
            keys: Keys::new(namespace),
            replace_existing: Script::new(REPLACE_EXISTING),
            take: Script::new(TAKE),
            save_existing: Script::new(SAVE_EXISTING),
            insert_settings: Script::new(INSERT_SETTINGS),
            remove_settings: Script::new(REMOVE_SETTINGS),
        }
    }

    async fn list_docs<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, StoreError> {
        let mut connection = self.connection.clone();
        let docs: Vec<String> = connection.hvals(key).await?;

        docs.iter()
            .map(|doc| serde_json::from_str(doc).map_err(StoreError::from))
            .collect()
    }

    async fn get_doc<T: DeserializeOwned>(
        &self,
        key: &str,
        id: Uuid,
    ) -> Result<Option<T>, StoreError> {
        let mut connection = self.connection.clone();
        let doc: Option<String> = connection.hget(key, id.to_string()).await?;

        decode(doc)
    }

    async fn insert_doc<T: Serialize>(&self, key: &str, id: Uuid, doc: &T) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();
        let inserted: bool = connection
            .hset_nx(key, id.to_string(), serde_json::to_string(doc)?)
            .await?;

        if !inserted {
            return Err(StoreError::DuplicateKey(id));
        }

        Ok(())
    }

    async fn replace_doc<T: Serialize>(&self, key: &str, id: Uuid, doc: &T) -> Result<bool, StoreError> {
        let mut connection = self.connection.clone();
        let replaced: i64 = self
            .replace_existing
            .key(key)
            .arg(id.to_string())
            .arg(serde_json::to_string(doc)?)
            .invoke_async(&mut connection)
            .await?;

        Ok(replaced == 1)
    }

    async fn take_doc<T: DeserializeOwned>(
        &self,
        key: &str,
        id: Uuid,
    ) -> Result<Option<T>, StoreError> {
        let mut connection = self.connection.clone();
        let doc: Option<String> = self
            .take
            .key(key)
            .arg(id.to_string())
            .invoke_async(&mut connection)
            .await?;

        decode(doc)
    }
}

fn decode<T: DeserializeOwned>(doc: Option<String>) -> Result<Option<T>, StoreError> {
    doc.map(|doc| serde_json::from_str(&doc))
        .transpose()
        .map_err(StoreError::from)
}

#[async_trait]
impl HeaderStore for RedisStore {
    fn backend_tag(&self) -> &'static str {
        "redis"
    }

    async fn list_items(&self) -> Result<Vec<NavigationItem>, StoreError> {
        self.list_docs(&self.keys.items).await
    }

    async fn get_item(&self, id: Uuid) -> Result<Option<NavigationItem>, StoreError> {
        self.get_doc(&self.keys.items, id).await
    }

    async fn insert_item(&self, item: &NavigationItem) -> Result<(), StoreError> {
        self.insert_doc(&self.keys.items, item.id, item).await
    }

    async fn replace_item(&self, item: &NavigationItem) -> Result<bool, StoreError> {
        self.replace_doc(&self.keys.items, item.id, item).await
    }

    async fn remove_item(&self, id: Uuid) -> Result<Option<NavigationItem>, StoreError> {
        self.take_doc(&self.keys.items, id).await
    }

    async fn save_items(&self, items: &[NavigationItem]) -> Result<(), StoreError> {
        if items.is_empty() {
            return Ok(());
        }

        let mut invocation = self.save_existing.prepare_invoke();
        invocation.key(&self.keys.items);
        for item in items {
            invocation
                .arg(item.id.to_string())
                .arg(serde_json::to_string(item)?);
        }

        let mut connection = self.connection.clone();
        let _: () = invocation.invoke_async(&mut connection).await?;

        Ok(())
    }

    async fn list_settings(&self) -> Result<Vec<HeaderSettings>, StoreError> {
        self.list_docs(&self.keys.settings).await
    }

    async fn get_settings(&self, id: Uuid) -> Result<Option<HeaderSettings>, StoreError> {
        self.get_doc(&self.keys.settings, id).await
    }

    async fn insert_settings(&self, settings: &HeaderSettings) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();
        let inserted: i64 = self
            .insert_settings
            .key(&self.keys.settings)
            .key(&self.keys.settings_rank)
            .key(&self.keys.current_settings)
            .arg(settings.id.to_string())
            .arg(serde_json::to_string(settings)?)
            .arg(settings.rank())
            .invoke_async(&mut connection)
            .await?;

        if inserted == 0 {
            return Err(StoreError::DuplicateKey(settings.id));
        }

        Ok(())
    }

    async fn replace_settings(&self, settings: &HeaderSettings) -> Result<bool, StoreError> {
        self.replace_doc(&self.keys.settings, settings.id, settings).await
    }

    async fn remove_settings(&self, id: Uuid) -> Result<Option<HeaderSettings>, StoreError> {
        let mut connection = self.connection.clone();
        let doc: Option<String> = self
            .remove_settings
            .key(&self.keys.settings)
            .key(&self.keys.settings_rank)
            .key(&self.keys.current_settings)
            .arg(id.to_string())
            .invoke_async(&mut connection)
            .await?;

        decode(doc)
    }

    async fn current_settings_id(&self) -> Result<Option<Uuid>, StoreError> {
        let mut connection = self.connection.clone();
        let id: Option<String> = connection.get(&self.keys.current_settings).await?;

        // A pointer that no longer parses is treated as unset.
        Ok(id.and_then(|id| Uuid::parse_str(&id).ok()))
    }

    async fn get_logo(&self) -> Result<Option<SiteLogo>, StoreError> {
        let mut connection = self.connection.clone();
        let doc: Option<String> = connection.get(&self.keys.logo).await?;

        decode(doc)
    }

    async fn put_logo(&self, logo: &SiteLogo) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();
        connection
            .set::<_, _, ()>(&self.keys.logo, serde_json::to_string(logo)?)
            .await?;

        Ok(())
    }
}
