//! Size- and age-bounded model cache with per-key stampede protection.
//!
//! A miss registers an in-flight cell for the key. The first caller runs the
//! resolver inside the cell; every concurrent caller for the same key awaits
//! that cell and sees the identical outcome. Found definitions are stored in
//! an LRU keyed by [`ModelId`]; not-found outcomes are never stored.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use lru::LruCache;
use tokio::sync::OnceCell;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use validus_core::config::ModelConfig;
use validus_core::ModelId;

use crate::definition::ModelDefinition;
use crate::error::{CacheError, ResolverError};
use crate::resolver::{ModelResolver, Resolution};

type Outcome = Result<Option<Arc<ModelDefinition>>, Arc<ResolverError>>;

struct CachedModel {
    definition: Arc<ModelDefinition>,
    stored_at: Instant,
}

/// Counters for logs and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub resolutions: u64,
    pub evictions: u64,
    pub entries: usize,
}

pub struct ModelCache {
    resolver: Arc<dyn ModelResolver>,
    entries: Mutex<LruCache<ModelId, CachedModel>>,
    in_flight: Mutex<HashMap<ModelId, Arc<OnceCell<Outcome>>>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    resolutions: AtomicU64,
    evictions: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ModelCache {
    pub fn new(resolver: Arc<dyn ModelResolver>, max_entries: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            resolver,
            entries: Mutex::new(LruCache::new(capacity)),
            in_flight: Mutex::new(HashMap::new()),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            resolutions: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn from_config(resolver: Arc<dyn ModelResolver>, config: &ModelConfig) -> Self {
        info!(
            resolver = resolver.name(),
            max_entries = config.cache_max_entries,
            ttl_secs = config.cache_ttl_secs,
            "model cache configured"
        );
        Self::new(resolver, config.cache_max_entries as usize, config.cache_ttl())
    }

    /// Definition for `id`, resolving on a miss.
    ///
    /// Returns `Ok(None)` for an empty id (without consulting the resolver)
    /// and when the resolver reports not-found.
    pub async fn get(&self, id: &ModelId) -> Result<Option<Arc<ModelDefinition>>, CacheError> {
        if id.is_empty() {
            return Ok(None);
        }

        let cell = {
            let mut in_flight = lock(&self.in_flight);
            // Checked under the in-flight lock: a finished resolution stores
            // its entry before its cell is removed.
            if let Some(definition) = self.lookup(id) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(model = %id, "model cache hit");
                return Ok(Some(definition));
            }
            self.misses.fetch_add(1, Ordering::Relaxed);
            in_flight
                .entry(id.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let outcome = cell.get_or_init(|| self.resolve_and_store(id)).await.clone();

        {
            let mut in_flight = lock(&self.in_flight);
            if in_flight.get(id).is_some_and(|current| Arc::ptr_eq(current, &cell)) {
                in_flight.remove(id);
            }
        }

        outcome.map_err(|source| CacheError::Resolution {
            key: id.clone(),
            source,
        })
    }

    /// Store a definition directly, replacing any existing entry.
    pub fn put(&self, id: ModelId, definition: ModelDefinition) {
        if id.is_empty() {
            return;
        }
        self.store(id, Arc::new(definition));
    }

    /// Drop one entry. Returns whether it was present.
    pub fn invalidate(&self, id: &ModelId) -> bool {
        lock(&self.entries).pop(id).is_some()
    }

    pub fn clear(&self) {
        lock(&self.entries).clear();
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            resolutions: self.resolutions.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    /// Fresh entry for `id`; expired entries are dropped.
    fn lookup(&self, id: &ModelId) -> Option<Arc<ModelDefinition>> {
        let mut entries = lock(&self.entries);
        let expired = match entries.get(id) {
            Some(cached) if cached.stored_at.elapsed() < self.ttl => {
                return Some(Arc::clone(&cached.definition));
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(id);
            debug!(model = %id, "model cache entry expired");
        }
        None
    }

    fn store(&self, id: ModelId, definition: Arc<ModelDefinition>) {
        let mut entries = lock(&self.entries);
        let cached = CachedModel {
            definition,
            stored_at: Instant::now(),
        };
        if let Some((evicted, _)) = entries.push(id.clone(), cached) {
            if evicted != id {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                debug!(model = %evicted, "model cache evicted least recently used entry");
            }
        }
    }

    async fn resolve_and_store(&self, id: &ModelId) -> Outcome {
        self.resolutions.fetch_add(1, Ordering::Relaxed);
        match self.resolver.resolve(id).await {
            Ok(Resolution::Found(definition)) => {
                let definition = Arc::new(definition);
                self.store(id.clone(), Arc::clone(&definition));
                debug!(model = %id, resolver = self.resolver.name(), "model resolved");
                Ok(Some(definition))
            }
            Ok(Resolution::NotFound) => {
                debug!(model = %id, resolver = self.resolver.name(), "model not found");
                Ok(None)
            }
            Err(e) => {
                warn!(model = %id, resolver = self.resolver.name(), error = %e, "model resolution failed");
                Err(Arc::new(e))
            }
        }
    }
}
