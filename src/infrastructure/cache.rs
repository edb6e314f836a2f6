//! Service containers cached by the combined extension hash.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

use lru::LruCache;
use once_cell::sync::Lazy;
use tracing::debug;

use super::{ContextOptions, ServiceCollection};
use crate::Result;

const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(100) {
    Some(capacity) => capacity,
    None => unreachable!(),
};

/// LRU cache of built service collections.
///
/// Aggregates whose [`ContextOptions::service_provider_hash_code`] match share
/// one collection.
pub struct ServiceProviderCache {
    entries: Mutex<LruCache<u64, Arc<ServiceCollection>>>,
}

impl ServiceProviderCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Return the cached services for `options`, building them on a miss.
    ///
    /// A miss validates the aggregate before any service is registered; a
    /// failed validation leaves the cache untouched.
    pub fn get_or_add(&self, options: &ContextOptions) -> Result<Arc<ServiceCollection>> {
        let key = options.service_provider_hash_code();
        {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(services) = entries.get(&key) {
                debug!(key, "service provider cache hit");
                return Ok(Arc::clone(services));
            }
        }

        debug!(key, log = %options.log_fragment(), "service provider cache miss");
        options.validate()?;
        let mut services = ServiceCollection::new();
        for ext in options.extensions() {
            ext.apply_services(&mut services);
        }
        let services = Arc::new(services);

        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have built the same key meanwhile; keep the first.
        if let Some(existing) = entries.get(&key) {
            return Ok(Arc::clone(existing));
        }
        entries.put(key, Arc::clone(&services));
        Ok(services)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl Default for ServiceProviderCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

static SHARED_CACHE: Lazy<ServiceProviderCache> = Lazy::new(ServiceProviderCache::default);

/// Process-wide cache.
pub fn shared_cache() -> &'static ServiceProviderCache {
    &SHARED_CACHE
}
