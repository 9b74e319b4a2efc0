//! Master data cache backends.
//!
//! Items are cached keyed by id and the active configuration as a single value. Neither
//! backend expires entries; they are replaced wholesale by a refresh.

use gacha_types::{GameSettings, Item};
use redis::AsyncCommands;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;

use crate::CacheError;

const ITEM_KEY_PREFIX: &str = "item:";
const SETTINGS_KEY: &str = "game_settings";

/// In-process snapshots. A refresh swaps the whole snapshot, so readers never see a partial
/// catalog.
#[derive(Default)]
pub struct MemoryCache {
    items: RwLock<Option<Arc<[Item]>>>,
    settings: RwLock<Option<Arc<GameSettings>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace_items(&self, items: &[Item]) {
        let snapshot: Arc<[Item]> = items.into();
        *self.items.write().unwrap_or_else(PoisonError::into_inner) = Some(snapshot);
    }

    pub fn items(&self) -> Result<Arc<[Item]>, CacheError> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(CacheError::Miss)
    }

    pub fn replace_active_settings(&self, settings: &GameSettings) {
        *self.settings.write().unwrap_or_else(PoisonError::into_inner) =
            Some(Arc::new(settings.clone()));
    }

    pub fn active_settings(&self) -> Result<Arc<GameSettings>, CacheError> {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(CacheError::Miss)
    }
}

/// Redis-backed cache shared across processes.
///
/// The connection is opened lazily and dropped after any failure so the next call reconnects.
pub struct RedisCache {
    client: redis::Client,
    connection: Mutex<Option<redis::aio::ConnectionManager>>,
    prefix: String,
    timeout: Duration,
}

impl RedisCache {
    pub fn new(url: &str, prefix: String, timeout: Duration) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            connection: Mutex::new(None),
            prefix,
            timeout,
        })
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    fn item_key(&self, item: &Item) -> String {
        format!("{}{}{}", self.prefix, ITEM_KEY_PREFIX, item.id)
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T, CacheError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.timeout, op).await {
            Ok(result) => result.map_err(CacheError::from),
            Err(_) => Err(CacheError::Timeout(self.timeout)),
        }
    }

    async fn connection(&self) -> Result<redis::aio::ConnectionManager, CacheError> {
        let mut guard = self.connection.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }
        let conn = match self.bounded(self.client.get_connection_manager()).await {
            Ok(conn) => conn,
            Err(err) => {
                tracing::warn!("Redis cache connection failed: {err}");
                return Err(err);
            }
        };
        *guard = Some(conn.clone());
        Ok(conn)
    }

    /// Run one command under the timeout, dropping the connection if it fails.
    async fn run<T, F>(&self, op: F) -> Result<T, CacheError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        let result = self.bounded(op).await;
        if let Err(err) = &result {
            tracing::warn!("Redis cache command failed: {err}");
            *self.connection.lock().await = None;
        }
        result
    }

    async fn item_keys(&self, conn: &mut redis::aio::ConnectionManager) -> Result<Vec<String>, CacheError> {
        let pattern = format!("{}{}*", self.prefix, ITEM_KEY_PREFIX);
        self.run(conn.keys(pattern)).await
    }

    /// Delete every cached item, then write the new catalog one key at a time. A concurrent
    /// reader can observe a partial catalog until the last write lands.
    pub async fn replace_items(&self, items: &[Item]) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let stale = self.item_keys(&mut conn).await?;
        if !stale.is_empty() {
            let _: () = self.run(conn.del(stale)).await?;
        }
        for item in items {
            let value = serde_json::to_string(item)?;
            let _: () = self.run(conn.set(self.item_key(item), value)).await?;
        }
        Ok(())
    }

    pub async fn items(&self) -> Result<Arc<[Item]>, CacheError> {
        let mut conn = self.connection().await?;
        let keys = self.item_keys(&mut conn).await?;
        if keys.is_empty() {
            return Err(CacheError::Miss);
        }
        let values: Vec<Option<String>> = self.run(conn.mget(&keys)).await?;
        let mut items = values
            .into_iter()
            .flatten()
            .map(|value| serde_json::from_str::<Item>(&value))
            .collect::<Result<Vec<_>, _>>()?;
        if items.is_empty() {
            return Err(CacheError::Miss);
        }
        items.sort_by_key(|item| item.id);
        Ok(items.into())
    }

    pub async fn replace_active_settings(&self, settings: &GameSettings) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let value = serde_json::to_string(settings)?;
        self.run(conn.set(self.key(SETTINGS_KEY), value)).await
    }

    pub async fn active_settings(&self) -> Result<Arc<GameSettings>, CacheError> {
        let mut conn = self.connection().await?;
        let value: Option<String> = self.run(conn.get(self.key(SETTINGS_KEY))).await?;
        let value = value.ok_or(CacheError::Miss)?;
        Ok(Arc::new(serde_json::from_str(&value)?))
    }
}

pub enum CacheBackend {
    Memory(MemoryCache),
    Redis(RedisCache),
}

impl CacheBackend {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Redis(_) => "redis",
        }
    }

    pub async fn replace_items(&self, items: &[Item]) -> Result<(), CacheError> {
        match self {
            Self::Memory(cache) => {
                cache.replace_items(items);
                Ok(())
            }
            Self::Redis(cache) => cache.replace_items(items).await,
        }
    }

    pub async fn items(&self) -> Result<Arc<[Item]>, CacheError> {
        match self {
            Self::Memory(cache) => cache.items(),
            Self::Redis(cache) => cache.items().await,
        }
    }

    pub async fn replace_active_settings(&self, settings: &GameSettings) -> Result<(), CacheError> {
        match self {
            Self::Memory(cache) => {
                cache.replace_active_settings(settings);
                Ok(())
            }
            Self::Redis(cache) => cache.replace_active_settings(settings).await,
        }
    }

    pub async fn active_settings(&self) -> Result<Arc<GameSettings>, CacheError> {
        match self {
            Self::Memory(cache) => cache.active_settings(),
            Self::Redis(cache) => cache.active_settings().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gacha_types::{Rarity, RarityWeights};

    fn settings(id: i64) -> GameSettings {
        GameSettings {
            id,
            draw_cost: 100,
            ranking_page_size: 10,
            per_tier_weights: RarityWeights::new(70, 25, 5),
            max_draw_count: 10,
            created_at_ms: 0,
            active: true,
        }
    }

    #[tokio::test]
    async fn test_memory_cache_starts_empty() {
        let cache = CacheBackend::Memory(MemoryCache::new());
        assert!(matches!(cache.items().await, Err(CacheError::Miss)));
        assert!(matches!(cache.active_settings().await, Err(CacheError::Miss)));
    }

    #[tokio::test]
    async fn test_memory_cache_swaps_snapshots() {
        let cache = CacheBackend::Memory(MemoryCache::new());
        let first = vec![Item {
            id: 1,
            name: "Pebble".into(),
            rarity: Rarity::N,
        }];
        cache.replace_items(&first).await.unwrap();
        let held = cache.items().await.unwrap();

        cache.replace_items(&[]).await.unwrap();
        assert!(cache.items().await.unwrap().is_empty());
        // earlier readers keep their snapshot
        assert_eq!(held.len(), 1);

        cache.replace_active_settings(&settings(1)).await.unwrap();
        cache.replace_active_settings(&settings(2)).await.unwrap();
        assert_eq!(cache.active_settings().await.unwrap().id, 2);
    }

    #[tokio::test]
    async fn test_unreachable_redis_reports_error() {
        let redis =
            RedisCache::new("redis://127.0.0.1:1/", "test:".into(), Duration::from_millis(200))
                .unwrap();
        assert_eq!(redis.key(SETTINGS_KEY), "test:game_settings");
        let cache = CacheBackend::Redis(redis);
        let err = cache.active_settings().await.unwrap_err();
        assert!(!matches!(err, CacheError::Miss), "unexpected miss");
    }
}
