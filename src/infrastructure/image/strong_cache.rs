//! Byte-budgeted LRU cache tier that owns a reference on each stored bitmap.

use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::domain::entities::{Bitmap, BitmapLease, CacheKey, TrimLevel};
use crate::domain::ports::{CachedImage, ReferenceCounterPort};

struct StrongEntry {
    bitmap: Bitmap,
    is_sampled: bool,
    size: usize,
}

struct StrongState {
    entries: LruCache<CacheKey, StrongEntry>,
    current_size: usize,
}

/// LRU tier with a byte budget.
///
/// Budget evictions demote entries into the weak tier through the reference
/// counter; explicit removal, trimming and clearing drop them. Every entry
/// leaving the tier releases the reference it held.
///
/// Hits are leased while the tier lock is held, so a concurrent eviction
/// cannot pool a bitmap between lookup and lease.
pub struct StrongMemoryCache {
    state: Mutex<StrongState>,
    max_size: usize,
    references: Arc<dyn ReferenceCounterPort>,
}

impl StrongMemoryCache {
    /// Creates a tier holding at most `max_size` bytes.
    #[must_use]
    pub fn new(max_size: usize, references: Arc<dyn ReferenceCounterPort>) -> Self {
        Self {
            state: Mutex::new(StrongState {
                entries: LruCache::unbounded(),
                current_size: 0,
            }),
            max_size,
            references,
        }
    }

    /// Returns the entry for `key`, marking it most recently used.
    pub fn get(&self, key: &CacheKey) -> Option<CachedImage> {
        let mut state = self.state.lock();
        state.entries.get(key).map(|e| self.lease(e))
    }

    /// Returns the entry for `key` without touching recency.
    pub fn peek(&self, key: &CacheKey) -> Option<CachedImage> {
        let state = self.state.lock();
        state.entries.peek(key).map(|e| self.lease(e))
    }

    fn lease(&self, entry: &StrongEntry) -> CachedImage {
        CachedImage {
            image: BitmapLease::new(entry.bitmap.clone(), Arc::clone(&self.references)),
            is_sampled: entry.is_sampled,
        }
    }

    /// Stores `bitmap`. Images larger than the whole budget are rejected.
    pub fn put(&self, key: CacheKey, bitmap: &Bitmap, is_sampled: bool) -> bool {
        let size = bitmap.byte_count();
        if size > self.max_size {
            debug!(key = %key, size, max_size = self.max_size, "Image too large for memory cache");
            return false;
        }

        self.references.increment(bitmap);
        let (replaced, evicted) = {
            let mut state = self.state.lock();
            let replaced = state.entries.put(
                key.clone(),
                StrongEntry {
                    bitmap: bitmap.clone(),
                    is_sampled,
                    size,
                },
            );
            state.current_size += size;
            if let Some(old) = &replaced {
                state.current_size -= old.size;
            }
            let evicted = Self::evict_to(&mut state, self.max_size);
            (replaced, evicted)
        };
        trace!(key = %key, size, "Stored image in strong cache");

        if let Some(old) = replaced {
            self.references.decrement(&old.bitmap);
        }
        for (evicted_key, entry) in evicted {
            self.demote(evicted_key, entry);
        }
        true
    }

    /// Removes `key`, releasing its reference.
    pub fn remove(&self, key: &CacheKey) -> bool {
        let removed = {
            let mut state = self.state.lock();
            let removed = state.entries.pop(key);
            if let Some(entry) = &removed {
                state.current_size -= entry.size;
            }
            removed
        };
        removed.is_some_and(|entry| {
            self.references.decrement(&entry.bitmap);
            true
        })
    }

    /// Drops least recently used entries until at most `size` bytes remain.
    pub fn trim_to_size(&self, size: usize) {
        let dropped = Self::evict_to(&mut self.state.lock(), size);
        if !dropped.is_empty() {
            debug!(count = dropped.len(), target_size = size, "Trimmed strong memory cache");
        }
        for (_, entry) in dropped {
            self.references.decrement(&entry.bitmap);
        }
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.trim_to_size(0);
    }

    /// Empties or halves the tier according to severity.
    pub fn trim_memory(&self, level: TrimLevel) {
        if level.clears_everything() {
            self.clear();
        } else if level.halves() {
            self.trim_to_size(self.size() / 2);
        }
    }

    /// Returns the current weight in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.state.lock().current_size
    }

    /// Returns the budget in bytes.
    #[must_use]
    pub const fn max_size(&self) -> usize {
        self.max_size
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Returns true if the tier is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict_to(state: &mut StrongState, size: usize) -> Vec<(CacheKey, StrongEntry)> {
        let mut evicted = Vec::new();
        while state.current_size > size {
            let Some((key, entry)) = state.entries.pop_lru() else {
                break;
            };
            state.current_size -= entry.size;
            evicted.push((key, entry));
        }
        evicted
    }

    fn demote(&self, key: CacheKey, entry: StrongEntry) {
        if self.references.demote(key, &entry.bitmap, entry.is_sampled) {
            trace!(id = %entry.bitmap.id(), "Evicted image returned to pool");
        }
    }
}

impl std::fmt::Debug for StrongMemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrongMemoryCache")
            .field("max_size", &self.max_size)
            .field("size", &self.size())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::PixelFormat;
    use crate::domain::ports::{BitmapPoolPort, CachedBitmap};
    use crate::infrastructure::bitmap::{BitmapPool, BitmapReferenceCounter};
    use crate::infrastructure::image::WeakMemoryCache;

    struct Fixture {
        pool: Arc<BitmapPool>,
        counter: Arc<BitmapReferenceCounter>,
        weak: Arc<WeakMemoryCache>,
        cache: StrongMemoryCache,
    }

    fn fixture(max_size: usize) -> Fixture {
        let pool = Arc::new(BitmapPool::new(1024 * 1024));
        let weak = Arc::new(WeakMemoryCache::new());
        let counter = Arc::new(BitmapReferenceCounter::new(pool.clone(), Some(weak.clone())));
        let cache = StrongMemoryCache::new(max_size, counter.clone());
        Fixture {
            pool,
            counter,
            weak,
            cache,
        }
    }

    fn bitmap_16() -> Bitmap {
        Bitmap::new(2, 2, PixelFormat::Rgba8)
    }

    #[test]
    fn test_put_holds_a_reference() {
        let f = fixture(64);
        let bitmap = bitmap_16();
        assert!(f.cache.put(CacheKey::new("a"), &bitmap, false));
        assert_eq!(f.counter.count(&bitmap), 1);
        assert_eq!(f.cache.size(), 16);
    }

    #[test]
    fn test_rejects_image_over_budget() {
        let f = fixture(8);
        let bitmap = bitmap_16();
        assert!(!f.cache.put(CacheKey::new("a"), &bitmap, false));
        assert!(f.cache.is_empty());
        assert_eq!(f.counter.count(&bitmap), 0);
    }

    #[test]
    fn test_budget_eviction_demotes_held_bitmap_to_weak_tier() {
        let f = fixture(32);
        let first = bitmap_16();
        let displayed = first.clone();
        f.counter.increment(&displayed);

        f.cache.put(CacheKey::new("a"), &first, true);
        f.cache.put(CacheKey::new("b"), &bitmap_16(), false);
        f.cache.put(CacheKey::new("c"), &bitmap_16(), false);

        assert!(f.cache.get(&CacheKey::new("a")).is_none());
        let demoted = f.weak.get(&CacheKey::new("a")).unwrap();
        assert_eq!(demoted.bitmap, first);
        assert!(demoted.is_sampled);
        assert_eq!(f.counter.count(&first), 1);
    }

    #[test]
    fn test_budget_eviction_pools_unheld_bitmap() {
        let f = fixture(32);
        f.cache.put(CacheKey::new("a"), &bitmap_16(), false);
        f.cache.put(CacheKey::new("b"), &bitmap_16(), false);
        f.cache.put(CacheKey::new("c"), &bitmap_16(), false);

        assert!(f.weak.get(&CacheKey::new("a")).is_none());
        assert_eq!(f.pool.len(), 1);
    }

    #[test]
    fn test_replacing_key_releases_old_bitmap() {
        let f = fixture(64);
        let old = bitmap_16();
        f.cache.put(CacheKey::new("a"), &old, false);
        f.cache.put(CacheKey::new("a"), &bitmap_16(), false);

        assert_eq!(f.counter.count(&old), 0);
        assert_eq!(f.cache.len(), 1);
        assert_eq!(f.cache.size(), 16);
    }

    #[test]
    fn test_clear_drops_without_demoting() {
        let f = fixture(64);
        let bitmap = bitmap_16();
        let _held = bitmap.clone();
        f.counter.increment(&bitmap);
        f.cache.put(CacheKey::new("a"), &bitmap, false);

        f.cache.clear();
        assert!(f.cache.is_empty());
        assert!(f.weak.get(&CacheKey::new("a")).is_none());
        assert_eq!(f.counter.count(&bitmap), 1);
    }

    #[test]
    fn test_trim_running_low_halves_weight() {
        let f = fixture(64);
        for key in ["a", "b", "c", "d"] {
            f.cache.put(CacheKey::new(key), &bitmap_16(), false);
        }
        f.cache.trim_memory(TrimLevel::RunningLow);
        assert_eq!(f.cache.size(), 32);
        assert!(f.cache.peek(&CacheKey::new("d")).is_some());
        assert!(f.cache.peek(&CacheKey::new("a")).is_none());
    }

    #[test]
    fn test_hit_holds_bitmap_out_of_pool_after_clear() {
        let f = fixture(64);
        let bitmap = bitmap_16();
        f.cache.put(CacheKey::new("a"), &bitmap, false);

        let hit = f.cache.get(&CacheKey::new("a")).unwrap();
        assert_eq!(f.counter.count(&bitmap), 2);
        f.cache.clear();
        assert!(f.pool.is_empty());

        drop(hit);
        assert_eq!(f.pool.len(), 1);
    }

    /// Lets another holder release as soon as an eviction hands its hold back.
    struct ReleaseAfterDemote {
        inner: Arc<BitmapReferenceCounter>,
        other_holder: Mutex<Option<Bitmap>>,
    }

    impl ReferenceCounterPort for ReleaseAfterDemote {
        fn increment(&self, bitmap: &Bitmap) {
            self.inner.increment(bitmap);
        }

        fn decrement(&self, bitmap: &Bitmap) -> bool {
            self.inner.decrement(bitmap)
        }

        fn demote(&self, key: CacheKey, bitmap: &Bitmap, is_sampled: bool) -> bool {
            let pooled = self.inner.demote(key, bitmap, is_sampled);
            if let Some(other) = self.other_holder.lock().take() {
                self.inner.decrement(&other);
            }
            pooled
        }

        fn acquire_weak(&self, key: &CacheKey) -> Option<CachedBitmap> {
            self.inner.acquire_weak(key)
        }

        fn invalidate(&self, bitmap: &Bitmap) {
            self.inner.invalidate(bitmap);
        }
    }

    #[test]
    fn test_release_right_after_eviction_leaves_no_weak_entry_for_pooled_bitmap() {
        let pool = Arc::new(BitmapPool::new(1024 * 1024));
        let weak = Arc::new(WeakMemoryCache::new());
        let counter = Arc::new(BitmapReferenceCounter::new(pool.clone(), Some(weak.clone())));
        let displayed = bitmap_16();
        counter.increment(&displayed);
        let references = Arc::new(ReleaseAfterDemote {
            inner: counter.clone(),
            other_holder: Mutex::new(Some(displayed.clone())),
        });
        let cache = StrongMemoryCache::new(16, references);

        cache.put(CacheKey::new("a"), &displayed, false);
        cache.put(CacheKey::new("b"), &bitmap_16(), false);

        assert_eq!(counter.count(&displayed), 0);
        assert!(weak.get(&CacheKey::new("a")).is_none());
        assert!(counter.acquire_weak(&CacheKey::new("a")).is_none());
        let reissued = pool.get_dirty(2, 2, PixelFormat::Rgba8);
        assert_eq!(reissued, displayed);
    }
}
