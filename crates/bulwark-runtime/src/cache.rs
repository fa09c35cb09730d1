//! Item cache for bulwark-runtime.
//!
//! Holds successfully fetched items for a fixed TTL so repeated lookups
//! skip both sources. Expired entries are never returned.

use moka::future::Cache;
use std::future::Future;

use bulwark_core::CacheConfig;

/// Why a coalesced load produced no value to cache.
#[derive(Debug)]
enum LoadMiss<E> {
    NotFound,
    Failed(E),
}

/// Item cache using moka.
pub struct ItemCache<T> {
    cache: Cache<String, T>,
}

impl<T> ItemCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new cache with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.ttl)
            .build();

        Self { cache }
    }

    /// Get a live cached item.
    pub async fn get(&self, id: &str) -> Option<T> {
        self.cache.get(id).await
    }

    /// Store an item, replacing any previous entry for `id`.
    pub async fn insert(&self, id: impl Into<String>, item: T) {
        self.cache.insert(id.into(), item).await;
    }

    /// Return the cached item or run `load` to produce it.
    ///
    /// Concurrent calls for the same `id` share a single run of `load`
    /// and its outcome. Only `Ok(Some(_))` is cached.
    pub async fn get_or_load<F, E>(&self, id: &str, load: F) -> Result<Option<T>, E>
    where
        F: Future<Output = Result<Option<T>, E>>,
        E: Clone + Send + Sync + 'static,
    {
        let result = self
            .cache
            .try_get_with(id.to_string(), async move {
                match load.await {
                    Ok(Some(item)) => Ok(item),
                    Ok(None) => Err(LoadMiss::NotFound),
                    Err(e) => Err(LoadMiss::Failed(e)),
                }
            })
            .await;

        match result {
            Ok(item) => Ok(Some(item)),
            Err(miss) => match miss.as_ref() {
                LoadMiss::NotFound => Ok(None),
                LoadMiss::Failed(e) => Err(e.clone()),
            },
        }
    }

    /// Drop the entry for `id`, if any.
    pub async fn invalidate(&self, id: &str) {
        self.cache.invalidate(id).await;
    }

    /// Clear the cache.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Approximate number of entries.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl<T> Default for ItemCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}
