//! Pressure-reclaimable cache tier holding non-owning bitmap handles.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::domain::entities::{Bitmap, CacheKey, TrimLevel, WeakBitmap};
use crate::domain::ports::CachedBitmap;

/// Dead references are pruned after this many operations.
const CLEAN_UP_INTERVAL: u32 = 10;

#[derive(Debug)]
struct WeakEntry {
    bitmap: WeakBitmap,
    is_sampled: bool,
}

/// Cache tier of weak handles.
///
/// It has no byte budget: an entry lives only while some other holder keeps
/// its bitmap alive, and it may vanish between a `set` and a later `get`.
/// [`clear_memory`](Self::clear_memory) is the explicit "release under
/// pressure" hook.
#[derive(Debug, Default)]
pub struct WeakMemoryCache {
    entries: Mutex<HashMap<CacheKey, WeakEntry>>,
    operations_since_cleanup: AtomicU32,
}

impl WeakMemoryCache {
    /// Creates an empty tier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the bitmap for `key` if it is still alive.
    pub fn get(&self, key: &CacheKey) -> Option<CachedBitmap> {
        let hit = {
            let mut entries = self.entries.lock();
            match entries.get(key).map(|e| (e.bitmap.upgrade(), e.is_sampled)) {
                Some((Some(bitmap), is_sampled)) => Some(CachedBitmap { bitmap, is_sampled }),
                Some((None, _)) => {
                    entries.remove(key);
                    None
                }
                None => None,
            }
        };
        self.cleanup_if_necessary();
        hit
    }

    /// Records a weak handle to `bitmap` under `key`.
    pub fn set(&self, key: CacheKey, bitmap: &Bitmap, is_sampled: bool) {
        trace!(key = %key, id = %bitmap.id(), "Demoted image to weak cache");
        self.entries.lock().insert(
            key,
            WeakEntry {
                bitmap: bitmap.downgrade(),
                is_sampled,
            },
        );
        self.cleanup_if_necessary();
    }

    /// Removes the entry for `key`.
    pub fn remove(&self, key: &CacheKey) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    /// Removes every entry pointing at `bitmap`.
    pub fn remove_bitmap(&self, bitmap: &Bitmap) -> bool {
        let id = bitmap.id();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, e| e.bitmap.id() != id);
        before != entries.len()
    }

    /// Drops entries whose bitmap has been freed.
    pub fn cleanup(&self) {
        self.operations_since_cleanup.store(0, Ordering::Relaxed);
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, e| !e.bitmap.is_dead());
        let pruned = before - entries.len();
        if pruned > 0 {
            trace!(pruned, "Pruned dead weak cache entries");
        }
    }

    /// Drops every entry.
    pub fn clear_memory(&self) {
        self.operations_since_cleanup.store(0, Ordering::Relaxed);
        self.entries.lock().clear();
        debug!("Cleared weak memory cache");
    }

    /// Clears at maximum severity, otherwise prunes dead entries.
    pub fn trim_memory(&self, level: TrimLevel) {
        if level == TrimLevel::Complete {
            self.clear_memory();
        } else {
            self.cleanup();
        }
    }

    /// Returns the number of entries, alive or not yet pruned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cleanup_if_necessary(&self) {
        if self.operations_since_cleanup.fetch_add(1, Ordering::Relaxed) + 1 >= CLEAN_UP_INTERVAL {
            self.cleanup();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::PixelFormat;

    #[test]
    fn test_entry_lives_while_bitmap_is_held() {
        let cache = WeakMemoryCache::new();
        let key = CacheKey::new("a");
        let bitmap = Bitmap::new(2, 2, PixelFormat::Rgba8);

        cache.set(key.clone(), &bitmap, true);
        let hit = cache.get(&key).unwrap();
        assert_eq!(hit.bitmap, bitmap);
        assert!(hit.is_sampled);

        drop(hit);
        drop(bitmap);
        assert!(cache.get(&key).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_remove_bitmap_drops_all_keys_for_it() {
        let cache = WeakMemoryCache::new();
        let bitmap = Bitmap::new(2, 2, PixelFormat::Rgba8);
        cache.set(CacheKey::new("a"), &bitmap, false);
        cache.set(CacheKey::new("b"), &bitmap, false);

        assert!(cache.remove_bitmap(&bitmap));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_periodic_cleanup_prunes_dead_entries() {
        let cache = WeakMemoryCache::new();
        let keep = Bitmap::new(1, 1, PixelFormat::Rgba8);
        cache.set(CacheKey::new("keep"), &keep, false);
        for i in 0..CLEAN_UP_INTERVAL {
            let dead = Bitmap::new(1, 1, PixelFormat::Rgba8);
            cache.set(CacheKey::new(format!("dead{i}")), &dead, false);
        }
        cache.cleanup();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_trim_complete_clears_live_entries() {
        let cache = WeakMemoryCache::new();
        let bitmap = Bitmap::new(1, 1, PixelFormat::Rgba8);
        cache.set(CacheKey::new("a"), &bitmap, false);

        cache.trim_memory(TrimLevel::RunningLow);
        assert_eq!(cache.len(), 1);
        cache.trim_memory(TrimLevel::Complete);
        assert!(cache.is_empty());
    }
}
