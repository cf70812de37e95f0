//! Holder accounting that returns unheld bitmaps to the pool.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{trace, warn};

use crate::domain::entities::{Bitmap, BitmapId, CacheKey};
use crate::domain::ports::{BitmapPoolPort, CachedBitmap, ReferenceCounterPort};
use crate::infrastructure::image::WeakMemoryCache;

#[derive(Debug, Clone, Copy)]
struct Entry {
    count: usize,
    is_valid: bool,
}

impl Default for Entry {
    fn default() -> Self {
        Self {
            count: 0,
            is_valid: true,
        }
    }
}

/// Counts live holders per bitmap.
///
/// When a valid bitmap's count drops to zero it is removed from the weak
/// cache tier and offered to the pool. Invalidated bitmaps are never pooled.
pub struct BitmapReferenceCounter {
    entries: Mutex<HashMap<BitmapId, Entry>>,
    pool: Arc<dyn BitmapPoolPort>,
    weak_cache: Option<Arc<WeakMemoryCache>>,
}

impl BitmapReferenceCounter {
    /// Creates a counter feeding `pool`.
    #[must_use]
    pub fn new(pool: Arc<dyn BitmapPoolPort>, weak_cache: Option<Arc<WeakMemoryCache>>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            pool,
            weak_cache,
        }
    }

    /// Returns the current holder count.
    #[must_use]
    pub fn count(&self, bitmap: &Bitmap) -> usize {
        self.entries
            .lock()
            .get(&bitmap.id())
            .map_or(0, |e| e.count)
    }

    /// Returns false if the bitmap was invalidated and is still tracked.
    #[must_use]
    pub fn is_valid(&self, bitmap: &Bitmap) -> bool {
        self.entries
            .lock()
            .get(&bitmap.id())
            .is_none_or(|e| e.is_valid)
    }

    /// Returns the number of tracked bitmaps.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.entries.lock().len()
    }
}

impl ReferenceCounterPort for BitmapReferenceCounter {
    fn increment(&self, bitmap: &Bitmap) {
        let mut entries = self.entries.lock();
        let entry = entries.entry(bitmap.id()).or_default();
        entry.count += 1;
        trace!(id = %bitmap.id(), count = entry.count, "Incremented bitmap reference");
    }

    fn decrement(&self, bitmap: &Bitmap) -> bool {
        self.release(bitmap, None)
    }

    fn demote(&self, key: CacheKey, bitmap: &Bitmap, is_sampled: bool) -> bool {
        self.release(bitmap, Some((key, is_sampled)))
    }

    fn acquire_weak(&self, key: &CacheKey) -> Option<CachedBitmap> {
        let weak = self.weak_cache.as_ref()?;
        let mut entries = self.entries.lock();
        let hit = weak.get(key)?;
        let Some(entry) = entries
            .get_mut(&hit.bitmap.id())
            .filter(|e| e.count > 0)
        else {
            weak.remove(key);
            return None;
        };
        entry.count += 1;
        trace!(id = %hit.bitmap.id(), count = entry.count, "Acquired weakly cached bitmap");
        Some(hit)
    }

    fn invalidate(&self, bitmap: &Bitmap) {
        let mut entries = self.entries.lock();
        entries.entry(bitmap.id()).or_default().is_valid = false;
        trace!(id = %bitmap.id(), "Invalidated bitmap");
    }
}

impl BitmapReferenceCounter {
    /// Drops one holder. Weak tier writes happen under the entries lock so a
    /// weak entry exists only while its bitmap has holders.
    fn release(&self, bitmap: &Bitmap, demoted: Option<(CacheKey, bool)>) -> bool {
        let eligible = {
            let mut entries = self.entries.lock();
            let Some(entry) = entries.get_mut(&bitmap.id()) else {
                warn!(id = %bitmap.id(), "Released an untracked bitmap");
                return false;
            };
            if entry.count == 0 {
                warn!(id = %bitmap.id(), "Released a bitmap with no holders");
                return false;
            }
            entry.count -= 1;
            trace!(id = %bitmap.id(), count = entry.count, "Decremented bitmap reference");
            if entry.count > 0 {
                if let (Some((key, is_sampled)), Some(weak)) = (demoted, &self.weak_cache) {
                    weak.set(key, bitmap, is_sampled);
                }
                return false;
            }
            let is_valid = entry.is_valid;
            entries.remove(&bitmap.id());
            if let Some(weak) = &self.weak_cache {
                weak.remove_bitmap(bitmap);
            }
            is_valid
        };

        if eligible {
            self.pool.put(bitmap.clone());
        }
        eligible
    }
}

impl std::fmt::Debug for BitmapReferenceCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitmapReferenceCounter")
            .field("tracked", &self.tracked())
            .finish_non_exhaustive()
    }
}
