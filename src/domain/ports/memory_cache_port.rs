//! Port definition for in-memory image caching.

use crate::domain::entities::{Bitmap, BitmapLease, CacheKey, TrimLevel};

/// A cached bitmap and whether it was downsampled when decoded.
///
/// This is a bare view: it holds no counted reference on the bitmap.
#[derive(Debug, Clone)]
pub struct CachedBitmap {
    /// The cached pixels.
    pub bitmap: Bitmap,
    /// True if the bitmap is smaller than its source.
    pub is_sampled: bool,
}

/// A cache hit. The lease was acquired while the entry was still cached,
/// so the bitmap cannot return to the pool while the hit is alive.
#[derive(Debug, Clone)]
pub struct CachedImage {
    /// The cached pixels.
    pub image: BitmapLease,
    /// True if the bitmap is smaller than its source.
    pub is_sampled: bool,
}

/// Port for memory cache operations.
/// Implementations must be thread-safe.
pub trait MemoryCachePort: Send + Sync {
    /// Attempts to get an image from the cache, counting a hit or miss.
    /// Returns None if not cached.
    fn get(&self, key: &CacheKey) -> Option<CachedImage>;

    /// Like [`get`](Self::get) but leaves statistics and recency untouched.
    fn peek(&self, key: &CacheKey) -> Option<CachedImage>;

    /// Stores an image in the cache. Returns false if it was rejected.
    fn put(&self, key: CacheKey, bitmap: &Bitmap, is_sampled: bool) -> bool;

    /// Removes an image from every tier. Returns true if anything was removed.
    fn invalidate(&self, key: &CacheKey) -> bool;

    /// Sheds memory according to pressure.
    fn trim_memory(&self, level: TrimLevel);

    /// Clears all images from the cache.
    fn clear(&self);

    /// Returns the current weight of the budgeted tier in bytes.
    fn size(&self) -> usize;

    /// Returns the budget of the budgeted tier in bytes.
    fn max_size(&self) -> usize;
}
