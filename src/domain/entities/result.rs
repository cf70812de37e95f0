//! Request outcomes and the reference-holding bitmap handle they carry.

use std::ops::Deref;
use std::sync::Arc;

use uuid::Uuid;

use crate::domain::errors::LoadError;
use crate::domain::ports::ReferenceCounterPort;

use super::{Bitmap, CacheKey};

/// Where a delivered image came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataSource {
    /// The in-memory cache.
    MemoryCache,
    /// Data that was already in memory, e.g. caller-supplied bytes or bitmaps.
    Memory,
    /// A local file.
    Disk,
    /// The network.
    Network,
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MemoryCache => write!(f, "memory-cache"),
            Self::Memory => write!(f, "memory"),
            Self::Disk => write!(f, "disk"),
            Self::Network => write!(f, "network"),
        }
    }
}

/// A counted hold on a bitmap.
///
/// Creating or cloning a lease increments the bitmap's reference count and
/// dropping it decrements the count, so every holder balances exactly one
/// acquire with one release. [`adopt`](Self::adopt) takes over an increment
/// made elsewhere.
pub struct BitmapLease {
    bitmap: Bitmap,
    references: Arc<dyn ReferenceCounterPort>,
}

impl BitmapLease {
    /// Acquires a hold on `bitmap`.
    #[must_use]
    pub fn new(bitmap: Bitmap, references: Arc<dyn ReferenceCounterPort>) -> Self {
        references.increment(&bitmap);
        Self { bitmap, references }
    }

    /// Wraps a hold on `bitmap` that `references` has already counted.
    #[must_use]
    pub fn adopt(bitmap: Bitmap, references: Arc<dyn ReferenceCounterPort>) -> Self {
        Self { bitmap, references }
    }

    /// Returns the held bitmap.
    #[must_use]
    pub const fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }
}

impl Clone for BitmapLease {
    fn clone(&self) -> Self {
        Self::new(self.bitmap.clone(), Arc::clone(&self.references))
    }
}

impl Drop for BitmapLease {
    fn drop(&mut self) {
        self.references.decrement(&self.bitmap);
    }
}

impl Deref for BitmapLease {
    type Target = Bitmap;

    fn deref(&self) -> &Bitmap {
        &self.bitmap
    }
}

impl std::fmt::Debug for BitmapLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("BitmapLease").field(&self.bitmap).finish()
    }
}

/// A successful load.
#[derive(Debug, Clone)]
pub struct SuccessResult {
    /// The image, held for as long as this result (or a clone) lives.
    pub image: BitmapLease,
    /// Identifier of the originating request.
    pub request_id: Uuid,
    /// Where the image came from.
    pub data_source: DataSource,
    /// Key the image is cached under, if it is cacheable.
    pub memory_cache_key: Option<CacheKey>,
    /// True if the image is smaller than its source.
    pub is_sampled: bool,
}

/// A failed load.
#[derive(Debug, Clone)]
pub struct ErrorResult {
    /// The error or fallback image configured on the request.
    pub image: Option<Bitmap>,
    /// Identifier of the originating request.
    pub request_id: Uuid,
    /// What went wrong.
    pub error: LoadError,
}

/// Outcome of a request that was not cancelled.
#[derive(Debug, Clone)]
pub enum ImageResult {
    /// The image loaded.
    Success(SuccessResult),
    /// The image failed to load.
    Error(ErrorResult),
}

impl ImageResult {
    /// Returns the success payload, if any.
    #[must_use]
    pub const fn as_success(&self) -> Option<&SuccessResult> {
        match self {
            Self::Success(s) => Some(s),
            Self::Error(_) => None,
        }
    }

    /// Returns the error payload, if any.
    #[must_use]
    pub const fn as_error(&self) -> Option<&ErrorResult> {
        match self {
            Self::Success(_) => None,
            Self::Error(e) => Some(e),
        }
    }

    /// Returns the delivered bitmap, if any.
    #[must_use]
    pub fn bitmap(&self) -> Option<&Bitmap> {
        match self {
            Self::Success(s) => Some(s.image.bitmap()),
            Self::Error(e) => e.image.as_ref(),
        }
    }
}
