//! LRU cache for index bounds of lat/lon boxes.

use lru::LruCache;
use std::num::NonZeroUsize;

use crate::index::IndexBounds;
use crate::types::{CacheStats, GeoBox};

/// Cache key for bounds: the exact bit patterns of the box edges.
pub type BoundsKey = [u64; 4];

/// Small LRU cache mapping a box to the index bounds of the cells it
/// contains. `None` results (box contains nothing) are cached too.
///
/// Entries are only valid for the geolocation they were computed from; the
/// owner clears the cache whenever latitude or longitude change.
pub struct BoundsCache {
    cache: LruCache<BoundsKey, Option<IndexBounds>>,
    hits: u64,
    misses: u64,
}

impl BoundsCache {
    /// Create a cache holding up to `capacity` boxes (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Look up a box. Returns `Some(bounds)` on a hit.
    pub fn get(&mut self, geo_box: &GeoBox) -> Option<Option<IndexBounds>> {
        if let Some(bounds) = self.cache.get(&geo_box.cache_key()) {
            self.hits += 1;
            Some(*bounds)
        } else {
            self.misses += 1;
            None
        }
    }

    pub fn insert(&mut self, geo_box: &GeoBox, bounds: Option<IndexBounds>) {
        self.cache.put(geo_box.cache_key(), bounds);
    }

    /// Return the cached bounds for a box, computing and storing them on a miss.
    pub fn get_or_compute(
        &mut self,
        geo_box: &GeoBox,
        compute: impl FnOnce() -> Option<IndexBounds>,
    ) -> Option<IndexBounds> {
        if let Some(bounds) = self.get(geo_box) {
            return bounds;
        }
        let bounds = compute();
        self.insert(geo_box, bounds);
        bounds
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.cache.len(),
            capacity: self.cache.cap().get(),
        }
    }

    /// Clear all entries from the cache.
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl Default for BoundsCache {
    fn default() -> Self {
        Self::new(2)
    }
}
