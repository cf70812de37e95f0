//! Size and format bucketed pool of reusable bitmaps.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::domain::entities::{Bitmap, BitmapId, PixelFormat, TrimLevel};
use crate::domain::ports::BitmapPoolPort;

/// Default pool budget in bytes (32 MB).
pub const DEFAULT_POOL_SIZE: usize = 32 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct BucketKey {
    width: u32,
    height: u32,
    format: PixelFormat,
}

impl BucketKey {
    fn of(bitmap: &Bitmap) -> Self {
        Self {
            width: bitmap.width(),
            height: bitmap.height(),
            format: bitmap.format(),
        }
    }
}

struct PoolState {
    entries: LruCache<BitmapId, Bitmap>,
    buckets: HashMap<BucketKey, Vec<BitmapId>>,
    current_size: usize,
}

impl PoolState {
    fn take(&mut self, key: BucketKey) -> Option<Bitmap> {
        let bucket = self.buckets.get_mut(&key)?;
        let id = bucket.pop()?;
        if bucket.is_empty() {
            self.buckets.remove(&key);
        }
        let bitmap = self.entries.pop(&id)?;
        self.current_size -= bitmap.byte_count();
        Some(bitmap)
    }

    fn trim_to_size(&mut self, size: usize) -> usize {
        let mut evicted = 0;
        while self.current_size > size {
            let Some((id, bitmap)) = self.entries.pop_lru() else {
                break;
            };
            let key = BucketKey::of(&bitmap);
            if let Some(bucket) = self.buckets.get_mut(&key) {
                bucket.retain(|b| *b != id);
                if bucket.is_empty() {
                    self.buckets.remove(&key);
                }
            }
            self.current_size -= bitmap.byte_count();
            evicted += 1;
        }
        evicted
    }
}

/// Pool of released bitmaps, evicting the least recently pooled ones first
/// once its byte budget is exceeded.
pub struct BitmapPool {
    state: Mutex<PoolState>,
    max_size: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    puts: AtomicU64,
    evictions: AtomicU64,
}

impl BitmapPool {
    /// Creates a pool holding at most `max_size` bytes.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            state: Mutex::new(PoolState {
                entries: LruCache::unbounded(),
                buckets: HashMap::new(),
                current_size: 0,
            }),
            max_size,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            puts: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Creates a pool that rejects everything.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(0)
    }

    /// Returns the budget in bytes.
    #[must_use]
    pub const fn max_size(&self) -> usize {
        self.max_size
    }

    /// Returns the bytes currently pooled.
    #[must_use]
    pub fn size(&self) -> usize {
        self.state.lock().current_size
    }

    /// Returns the number of pooled bitmaps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Returns true if nothing is pooled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        PoolStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            puts: self.puts.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size: state.current_size,
            count: state.entries.len(),
        }
    }

    fn trim_to_size(&self, size: usize) {
        let evicted = self.state.lock().trim_to_size(size);
        if evicted > 0 {
            self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
            debug!(evicted, target_size = size, "Trimmed bitmap pool");
        }
    }
}

impl Default for BitmapPool {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SIZE)
    }
}

impl std::fmt::Debug for BitmapPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitmapPool")
            .field("max_size", &self.max_size)
            .field("size", &self.size())
            .finish_non_exhaustive()
    }
}

/// Statistics about pool reuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Requests served from the pool.
    pub hits: u64,
    /// Requests that found no compatible bitmap.
    pub misses: u64,
    /// Bitmaps accepted into the pool.
    pub puts: u64,
    /// Bitmaps evicted to stay within budget.
    pub evictions: u64,
    /// Bytes currently pooled.
    pub size: usize,
    /// Bitmaps currently pooled.
    pub count: usize,
}

impl std::fmt::Display for PoolStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Pool: {} bitmaps ({} bytes), {} hits, {} misses, {} evictions",
            self.count, self.size, self.hits, self.misses, self.evictions
        )
    }
}

impl BitmapPoolPort for BitmapPool {
    fn put(&self, bitmap: Bitmap) -> bool {
        let size = bitmap.byte_count();
        if bitmap.is_empty() || size > self.max_size {
            trace!(id = %bitmap.id(), size, "Rejected bitmap from pool");
            return false;
        }

        {
            let mut state = self.state.lock();
            if state.entries.contains(&bitmap.id()) {
                warn!(id = %bitmap.id(), "Bitmap is already pooled");
                return false;
            }
            let key = BucketKey::of(&bitmap);
            let id = bitmap.id();
            state.entries.put(id, bitmap);
            state.buckets.entry(key).or_default().push(id);
            state.current_size += size;
            trace!(id = %id, size, "Pooled bitmap");
        }

        self.puts.fetch_add(1, Ordering::Relaxed);
        self.trim_to_size(self.max_size);
        true
    }

    fn get_or_none(&self, width: u32, height: u32, format: PixelFormat) -> Option<Bitmap> {
        let key = BucketKey {
            width,
            height,
            format,
        };
        let bitmap = self.state.lock().take(key);
        if bitmap.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(width, height, %format, "Bitmap pool hit");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(width, height, %format, "Bitmap pool miss");
        }
        bitmap
    }

    fn trim_memory(&self, level: TrimLevel) {
        if level.clears_everything() {
            self.clear();
        } else if level.halves() {
            self.trim_to_size(self.max_size / 2);
        }
    }

    fn clear(&self) {
        self.trim_to_size(0);
    }
}
