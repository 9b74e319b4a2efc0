//! Master data: the item catalog and the active game configuration.
//!
//! Both are read from the cache on the hot path. Every cached read falls back to the store
//! when the cache misses or fails.

use gacha_types::{GameSettings, Item, Rarity, SettingsId};
use std::sync::Arc;
use tracing::{info, warn};

use crate::{BackendMetrics, CacheBackend, CacheError, Error, Store};

pub struct MasterData {
    store: Store,
    cache: CacheBackend,
    metrics: Arc<BackendMetrics>,
}

impl MasterData {
    pub fn new(store: Store, cache: CacheBackend, metrics: Arc<BackendMetrics>) -> Self {
        Self {
            store,
            cache,
            metrics,
        }
    }

    pub fn cache_kind(&self) -> &'static str {
        self.cache.kind()
    }

    /// Reload the whole catalog into the cache.
    pub async fn refresh_items(&self) -> Result<usize, Error> {
        let items = self.store.items().await?;
        if let Err(err) = self.cache.replace_items(&items).await {
            self.metrics.inc_cache_refresh_failure();
            return Err(err.into());
        }
        info!(count = items.len(), cache = self.cache.kind(), "refreshed item cache");
        Ok(items.len())
    }

    /// Reload the active configuration into the cache.
    pub async fn refresh_active_settings(&self) -> Result<Arc<GameSettings>, Error> {
        let settings = self
            .store
            .active_settings()
            .await?
            .ok_or(Error::NoActiveSettings)?;
        if let Err(err) = self.cache.replace_active_settings(&settings).await {
            self.metrics.inc_cache_refresh_failure();
            return Err(err.into());
        }
        info!(
            settings = settings.id,
            cache = self.cache.kind(),
            "refreshed active settings cache"
        );
        Ok(Arc::new(settings))
    }

    pub async fn warm(&self) -> Result<(), Error> {
        self.refresh_items().await?;
        self.refresh_active_settings().await?;
        Ok(())
    }

    pub async fn cached_items(&self) -> Result<Arc<[Item]>, CacheError> {
        self.cache.items().await
    }

    pub async fn cached_active_settings(&self) -> Result<Arc<GameSettings>, CacheError> {
        self.cache.active_settings().await
    }

    /// Catalog, from the cache when possible.
    pub async fn items(&self) -> Result<Arc<[Item]>, Error> {
        match self.cache.items().await {
            Ok(items) => Ok(items),
            Err(err) => {
                self.metrics.inc_cache_miss();
                warn!(?err, "item cache unavailable; reading store");
                Ok(self.store.items().await?.into())
            }
        }
    }

    /// Active configuration, from the cache when possible.
    pub async fn active_settings(&self) -> Result<Arc<GameSettings>, Error> {
        match self.cache.active_settings().await {
            Ok(settings) => Ok(settings),
            Err(err) => {
                self.metrics.inc_cache_miss();
                warn!(?err, "settings cache unavailable; reading store");
                self.store
                    .active_settings()
                    .await?
                    .map(Arc::new)
                    .ok_or(Error::NoActiveSettings)
            }
        }
    }

    /// Switch the active configuration, then refresh the cached copy.
    ///
    /// If the refresh fails the switch still stands; the error is returned and the next
    /// refresh brings the cache up to date.
    pub async fn activate(&self, id: SettingsId) -> Result<Arc<GameSettings>, Error> {
        if !self.store.activate_settings(id).await? {
            return Err(Error::SettingsNotFound(id));
        }
        info!(settings = id, "activated game settings");
        self.refresh_active_settings().await.inspect_err(|err| {
            warn!(settings = id, ?err, "activated settings but cache refresh failed");
        })
    }

    /// Add a catalog item and refresh the item cache.
    pub async fn add_item(&self, name: &str, rarity: Rarity) -> Result<Item, Error> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidArgument("item name is empty".to_string()));
        }
        let item = self.store.insert_item(name.to_string(), rarity).await?;
        info!(item = item.id, %rarity, "added catalog item");
        if let Err(err) = self.refresh_items().await {
            warn!(item = item.id, ?err, "item cache refresh failed");
        }
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use gacha_types::{NewGameSettings, RarityWeights};
    use std::time::Duration;

    fn master() -> (MasterData, Store, Arc<BackendMetrics>) {
        let store = Store::open_in_memory(Duration::from_secs(1)).unwrap();
        let metrics = Arc::new(BackendMetrics::default());
        let master = MasterData::new(
            store.clone(),
            CacheBackend::Memory(MemoryCache::new()),
            Arc::clone(&metrics),
        );
        (master, store, metrics)
    }

    fn input(draw_cost: u64) -> NewGameSettings {
        NewGameSettings {
            draw_cost,
            ranking_page_size: 5,
            per_tier_weights: RarityWeights::new(1, 1, 1),
            max_draw_count: 10,
        }
    }

    #[tokio::test]
    async fn test_warm_requires_active_settings() {
        let (master, store, _) = master();
        store.insert_item("Pebble".into(), Rarity::N).await.unwrap();
        assert!(matches!(master.warm().await, Err(Error::NoActiveSettings)));

        let settings = store.insert_settings(input(10), 1).await.unwrap();
        store.activate_settings(settings.id).await.unwrap();
        master.warm().await.unwrap();
        assert_eq!(master.cached_items().await.unwrap().len(), 1);
        assert_eq!(master.cached_active_settings().await.unwrap().id, settings.id);
    }

    #[tokio::test]
    async fn test_cold_cache_falls_back_to_store() {
        let (master, store, metrics) = master();
        store.insert_item("Pebble".into(), Rarity::N).await.unwrap();
        let settings = store.insert_settings(input(10), 1).await.unwrap();
        store.activate_settings(settings.id).await.unwrap();

        assert!(matches!(master.cached_items().await, Err(CacheError::Miss)));
        assert_eq!(master.items().await.unwrap().len(), 1);
        assert_eq!(master.active_settings().await.unwrap().id, settings.id);
        assert_eq!(metrics.snapshot().cache_misses, 2);
    }

    #[tokio::test]
    async fn test_activate_refreshes_cache() {
        let (master, store, _) = master();
        let first = store.insert_settings(input(10), 1).await.unwrap();
        let second = store.insert_settings(input(99), 2).await.unwrap();
        master.activate(first.id).await.unwrap();
        assert_eq!(master.cached_active_settings().await.unwrap().draw_cost, 10);

        let active = master.activate(second.id).await.unwrap();
        assert_eq!(active.draw_cost, 99);
        assert_eq!(master.cached_active_settings().await.unwrap().id, second.id);
    }

    #[tokio::test]
    async fn test_activate_unknown_keeps_previous() {
        let (master, store, _) = master();
        let first = store.insert_settings(input(10), 1).await.unwrap();
        master.activate(first.id).await.unwrap();

        assert!(matches!(
            master.activate(404).await,
            Err(Error::SettingsNotFound(404))
        ));
        assert_eq!(master.active_settings().await.unwrap().id, first.id);
        assert_eq!(store.active_settings().await.unwrap().unwrap().id, first.id);
    }

    #[tokio::test]
    async fn test_add_item_updates_cache() {
        let (master, _, _) = master();
        assert!(matches!(
            master.add_item("  ", Rarity::N).await,
            Err(Error::InvalidArgument(_))
        ));
        let item = master.add_item("Golden Cat", Rarity::SR).await.unwrap();
        let cached = master.cached_items().await.unwrap();
        assert_eq!(cached.as_ref(), &[item]);
    }
}
