//! Memory cache key derivation and cache-hit validation.

use crate::domain::entities::{Bitmap, CacheKey, ImageRequest, PixelFormat, RequestData, Size};
use crate::domain::ports::Fetcher;

/// Derives the memory cache key for `mapped` data.
///
/// A key set on the request wins. Otherwise the fetcher supplies the base
/// identity; without one the data is uncacheable and no key is produced.
/// Transformation keys and the resolved size only join the key when the
/// request has transformations, so untransformed loads share one entry
/// across sizes.
#[must_use]
pub fn memory_cache_key(
    request: &ImageRequest,
    mapped: &RequestData,
    fetcher: Option<&dyn Fetcher>,
    size: Size,
) -> Option<CacheKey> {
    if let Some(key) = request.memory_cache_key() {
        return Some(key.clone());
    }

    let base = fetcher?.cache_key(mapped)?;
    let parameters = request.parameters().cache_keys();

    if request.transformations().is_empty() {
        return Some(CacheKey::with_components(base, Vec::new(), None, parameters));
    }

    let transformations = request.transformations().iter().map(|t| t.key()).collect();
    Some(CacheKey::with_components(
        base,
        transformations,
        Some(size),
        parameters,
    ))
}

/// Pixel format a freshly loaded image for `request` ends up in.
#[must_use]
pub fn expected_pixel_format(request: &ImageRequest) -> PixelFormat {
    if request.transformations().is_empty() {
        request.pixel_format()
    } else {
        PixelFormat::Rgba8
    }
}

/// Returns true if a cached image satisfies `request` at `size`.
///
/// An invalid hit is a miss for this request only; the entry stays cached.
#[must_use]
pub fn is_cached_value_valid(
    request: &ImageRequest,
    bitmap: &Bitmap,
    is_sampled: bool,
    size: Size,
) -> bool {
    if bitmap.format() != expected_pixel_format(request) {
        return false;
    }

    let (width, height) = match size {
        Size::Original => return !is_sampled,
        Size::Pixels { width, height } => (width, height),
    };

    let multiplier = request
        .scale()
        .multiplier((bitmap.width(), bitmap.height()), (width, height));

    if !request.allows_inexact_size() && (multiplier - 1.0).abs() > f64::EPSILON {
        return false;
    }

    // A downsampled entry cannot be scaled up without losing detail.
    !(is_sampled && multiplier > 1.0)
}
