//! Two-tier in-memory image cache.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace};

use crate::domain::entities::{Bitmap, BitmapLease, CacheKey, TrimLevel};
use crate::domain::ports::{CachedImage, MemoryCachePort, ReferenceCounterPort};

use super::strong_cache::StrongMemoryCache;
use super::weak_cache::WeakMemoryCache;

/// Default strong tier budget in bytes (64 MB).
pub const DEFAULT_CACHE_SIZE: usize = 64 * 1024 * 1024;

/// In-memory cache for decoded images.
/// Thread-safe: lookups check the strong tier, then the weak tier, and
/// every hit comes back leased.
pub struct MemoryImageCache {
    strong: StrongMemoryCache,
    weak: Option<Arc<WeakMemoryCache>>,
    references: Arc<dyn ReferenceCounterPort>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryImageCache {
    /// Creates a cache whose strong tier holds at most `max_size` bytes.
    #[must_use]
    pub fn new(
        max_size: usize,
        references: Arc<dyn ReferenceCounterPort>,
        weak: Option<Arc<WeakMemoryCache>>,
    ) -> Self {
        Self {
            strong: StrongMemoryCache::new(max_size, Arc::clone(&references)),
            weak,
            references,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns cache statistics.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        CacheStats {
            hits,
            misses,
            hit_rate,
            size: self.strong.len(),
            bytes: self.strong.size(),
            weak_size: self.weak.as_ref().map_or(0, |w| w.len()),
        }
    }

    fn lookup_weak(&self, key: &CacheKey) -> Option<CachedImage> {
        self.weak.as_ref()?;
        let hit = self.references.acquire_weak(key)?;
        Some(CachedImage {
            image: BitmapLease::adopt(hit.bitmap, Arc::clone(&self.references)),
            is_sampled: hit.is_sampled,
        })
    }

    /// Returns the strong tier.
    #[must_use]
    pub const fn strong(&self) -> &StrongMemoryCache {
        &self.strong
    }

    /// Returns the weak tier, if enabled.
    #[must_use]
    pub const fn weak(&self) -> Option<&Arc<WeakMemoryCache>> {
        self.weak.as_ref()
    }
}

impl std::fmt::Debug for MemoryImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryImageCache")
            .field("strong", &self.strong)
            .field("weak_enabled", &self.weak.is_some())
            .finish_non_exhaustive()
    }
}

/// Statistics about cache performance.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Hit rate as a percentage.
    pub hit_rate: f64,
    /// Current number of images in the strong tier.
    pub size: usize,
    /// Current weight of the strong tier in bytes.
    pub bytes: usize,
    /// Current number of weak tier entries.
    pub weak_size: usize,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cache: {} images ({} bytes, {} weak), {:.1}% hit rate ({} hits, {} misses)",
            self.size, self.bytes, self.weak_size, self.hit_rate, self.hits, self.misses
        )
    }
}

impl MemoryCachePort for MemoryImageCache {
    fn get(&self, key: &CacheKey) -> Option<CachedImage> {
        let hit = self.strong.get(key).or_else(|| self.lookup_weak(key));
        if hit.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "Memory cache hit");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "Memory cache miss");
        }
        hit
    }

    fn peek(&self, key: &CacheKey) -> Option<CachedImage> {
        self.strong.peek(key).or_else(|| self.lookup_weak(key))
    }

    fn put(&self, key: CacheKey, bitmap: &Bitmap, is_sampled: bool) -> bool {
        debug!(key = %key, "Storing image in memory cache");
        self.strong.put(key, bitmap, is_sampled)
    }

    fn invalidate(&self, key: &CacheKey) -> bool {
        let strong = self.strong.remove(key);
        let weak = self.weak.as_ref().is_some_and(|w| w.remove(key));
        if strong || weak {
            debug!(key = %key, "Invalidated image in memory cache");
        }
        strong || weak
    }

    fn trim_memory(&self, level: TrimLevel) {
        self.strong.trim_memory(level);
        if let Some(weak) = &self.weak {
            weak.trim_memory(level);
        }
        debug!(?level, "Trimmed memory cache");
    }

    fn clear(&self) {
        self.strong.clear();
        if let Some(weak) = &self.weak {
            weak.clear_memory();
        }
        debug!("Cleared memory image cache");
    }

    fn size(&self) -> usize {
        self.strong.size()
    }

    fn max_size(&self) -> usize {
        self.strong.max_size()
    }
}
