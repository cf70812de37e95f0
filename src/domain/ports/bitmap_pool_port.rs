//! Ports for reusable pixel buffers and their holder accounting.

use crate::domain::entities::{Bitmap, CacheKey, PixelFormat, TrimLevel};

use super::CachedBitmap;

/// A pool of reusable bitmaps bucketed by dimensions and format.
/// Implementations must be thread-safe.
pub trait BitmapPoolPort: Send + Sync {
    /// Offers a bitmap for reuse. Returns false if the pool rejected it.
    fn put(&self, bitmap: Bitmap) -> bool;

    /// Takes a pooled bitmap with matching dimensions and format, if any.
    /// The pixels keep whatever contents they had.
    fn get_or_none(&self, width: u32, height: u32, format: PixelFormat) -> Option<Bitmap>;

    /// Returns a zeroed bitmap, reusing a pooled one when possible.
    fn get_or_allocate(&self, width: u32, height: u32, format: PixelFormat) -> Bitmap {
        match self.get_or_none(width, height, format) {
            Some(bitmap) => {
                bitmap.erase();
                bitmap
            }
            None => Bitmap::new(width, height, format),
        }
    }

    /// Like [`get_or_allocate`](Self::get_or_allocate) but leaves reused pixels untouched.
    fn get_dirty(&self, width: u32, height: u32, format: PixelFormat) -> Bitmap {
        self.get_or_none(width, height, format)
            .unwrap_or_else(|| Bitmap::new(width, height, format))
    }

    /// Drops pooled bitmaps according to memory pressure.
    fn trim_memory(&self, level: TrimLevel);

    /// Drops every pooled bitmap.
    fn clear(&self);
}

/// Tracks live holders of each bitmap and returns unheld ones to the pool.
/// Implementations must be thread-safe.
pub trait ReferenceCounterPort: Send + Sync {
    /// Records one more holder.
    fn increment(&self, bitmap: &Bitmap);

    /// Records one fewer holder. Returns true if this release made the
    /// bitmap pool-eligible.
    fn decrement(&self, bitmap: &Bitmap) -> bool;

    /// Releases a cache tier's hold on `bitmap`. If other holders remain, a
    /// weak handle is recorded under `key` before any of them can release.
    /// Returns true if this release made the bitmap pool-eligible.
    fn demote(&self, key: CacheKey, bitmap: &Bitmap, is_sampled: bool) -> bool;

    /// Looks `key` up in the weak tier and records one more holder of the
    /// bitmap found there, as one step. Returns None if the entry is gone or
    /// its bitmap has no holders left.
    fn acquire_weak(&self, key: &CacheKey) -> Option<CachedBitmap>;

    /// Marks the bitmap as never pool-eligible while it is tracked.
    fn invalidate(&self, bitmap: &Bitmap);
}
