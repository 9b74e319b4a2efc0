//! Gacha backend: durable store, master data cache and the draw, score and player services.
//!
//! [`Backend`] owns the store, the master data cache and the lottery RNG. Player identity is
//! always an explicit argument; resolving a token to a [`gacha_types::PlayerId`] is done by
//! the caller through [`Backend::authenticate`].

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

mod cache;
pub use cache::{CacheBackend, MemoryCache, RedisCache};
mod config;
pub use config::{
    BackendConfig, DEFAULT_CACHE_REDIS_PREFIX, DEFAULT_CACHE_TIMEOUT_MS,
    DEFAULT_STORE_BUSY_TIMEOUT_MS,
};
mod economy;
mod error;
pub use error::{CacheError, Error, StoreError};
mod master;
pub use master::MasterData;
mod metrics;
pub use metrics::{BackendMetrics, BackendMetricsSnapshot};
mod players;
mod score;
mod settings;
mod store;
pub use store::{DrawCommit, ScoreCommit, Store};

pub struct Backend {
    config: BackendConfig,
    store: Store,
    master: MasterData,
    rng: Mutex<ChaCha20Rng>,
    metrics: Arc<BackendMetrics>,
}

impl Backend {
    /// Open the store and cache described by `config`. The cache starts cold; call
    /// [`Backend::warm`] before serving gameplay.
    pub fn open(config: BackendConfig) -> Result<Self, Error> {
        let busy_timeout = config.store_busy_timeout();
        let store = match config.database_path.as_ref() {
            Some(path) => Store::open(path, busy_timeout)?,
            None => Store::open_in_memory(busy_timeout)?,
        };
        let cache = match config.cache_redis_url.as_deref() {
            Some(url) => CacheBackend::Redis(
                RedisCache::new(url, config.cache_prefix(), config.cache_timeout())
                    .map_err(CacheError::from)?,
            ),
            None => CacheBackend::Memory(MemoryCache::new()),
        };
        Ok(Self::with_parts(config, store, cache))
    }

    pub fn with_parts(config: BackendConfig, store: Store, cache: CacheBackend) -> Self {
        let rng = match config.deterministic_seed {
            Some(seed) => ChaCha20Rng::seed_from_u64(seed),
            None => ChaCha20Rng::from_entropy(),
        };
        let metrics = Arc::new(BackendMetrics::default());
        let master = MasterData::new(store.clone(), cache, Arc::clone(&metrics));
        tracing::info!(
            cache = master.cache_kind(),
            persistent = config.database_path.is_some(),
            deterministic = config.deterministic_seed.is_some(),
            "opened gacha backend"
        );
        Self {
            config,
            store,
            master,
            rng: Mutex::new(rng),
            metrics,
        }
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    pub fn master(&self) -> &MasterData {
        &self.master
    }

    pub fn metrics(&self) -> &BackendMetrics {
        &self.metrics
    }

    /// Populate both master data caches from the store.
    pub async fn warm(&self) -> Result<(), Error> {
        self.master.warm().await
    }

    fn rng(&self) -> MutexGuard<'_, ChaCha20Rng> {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn now_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use gacha_types::{GameSettings, Item, NewGameSettings, PlayerId, Rarity, RarityWeights};

    pub(crate) fn backend() -> Backend {
        Backend::open(BackendConfig {
            deterministic_seed: Some(7),
            ..BackendConfig::default()
        })
        .unwrap()
    }

    pub(crate) fn settings_input(draw_cost: u64, weights: RarityWeights) -> NewGameSettings {
        NewGameSettings {
            draw_cost,
            ranking_page_size: 3,
            per_tier_weights: weights,
            max_draw_count: 10,
        }
    }

    /// Backend with a four item catalog, an active configuration and a warm cache.
    pub(crate) async fn seeded(
        draw_cost: u64,
        weights: RarityWeights,
    ) -> (Backend, Vec<Item>, GameSettings) {
        let backend = backend();
        let mut items = Vec::new();
        for (name, rarity) in [
            ("Pebble", Rarity::N),
            ("Stick", Rarity::N),
            ("Sword", Rarity::R),
            ("Golden Cat", Rarity::SR),
        ] {
            items.push(backend.master.add_item(name, rarity).await.unwrap());
        }
        let settings = backend
            .add_settings(settings_input(draw_cost, weights))
            .await
            .unwrap();
        let settings = backend.activate_settings(settings.id).await.unwrap();
        backend.warm().await.unwrap();
        (backend, items, settings)
    }

    pub(crate) async fn player_with_coins(backend: &Backend, name: &str, coins: u64) -> PlayerId {
        let registration = backend.register(name).await.unwrap();
        if coins > 0 {
            backend.grant_coins(registration.id, coins).await.unwrap();
        }
        registration.id
    }
}
