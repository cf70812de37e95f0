//! Immutable image request descriptor and its builder.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use uuid::Uuid;

use crate::domain::ports::{
    Decoder, Fetcher, Lifecycle, RequestListener, SizeResolver, Target, Transformation,
};

use super::{Bitmap, CacheKey, Options, Parameters, PixelFormat, Precision, RequestData, Scale, Size};

/// Whether a request may read from and write to the memory cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CachePolicy {
    /// Read and write.
    #[default]
    Enabled,
    /// Read only.
    ReadOnly,
    /// Write only.
    WriteOnly,
    /// Neither.
    Disabled,
}

impl CachePolicy {
    /// Returns true if cache lookups are allowed.
    #[must_use]
    pub const fn read_enabled(self) -> bool {
        matches!(self, Self::Enabled | Self::ReadOnly)
    }

    /// Returns true if cache writes are allowed.
    #[must_use]
    pub const fn write_enabled(self) -> bool {
        matches!(self, Self::Enabled | Self::WriteOnly)
    }
}

/// How the delivered image replaces the previous content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransitionPolicy {
    /// Swap immediately.
    #[default]
    None,
    /// Crossfade over the given duration.
    Crossfade {
        /// Animation length.
        duration: Duration,
    },
}

/// Where the target size comes from.
#[derive(Clone)]
pub enum SizePolicy {
    /// A size known up front.
    Fixed(Size),
    /// A size measured at runtime.
    Resolver(Arc<dyn SizeResolver>),
}

impl Default for SizePolicy {
    fn default() -> Self {
        Self::Fixed(Size::Original)
    }
}

impl std::fmt::Debug for SizePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixed(size) => f.debug_tuple("Fixed").field(size).finish(),
            Self::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}

/// Describes one image load. Immutable once built.
#[derive(Clone)]
pub struct ImageRequest {
    id: Uuid,
    data: Option<RequestData>,
    memory_cache_key: Option<CacheKey>,
    alias_keys: Vec<CacheKey>,
    placeholder_cache_key: Option<CacheKey>,
    placeholder: Option<Bitmap>,
    error: Option<Bitmap>,
    fallback: Option<Bitmap>,
    target: Option<Arc<dyn Target>>,
    size: SizePolicy,
    scale: Scale,
    precision: Precision,
    pixel_format: PixelFormat,
    memory_cache_policy: CachePolicy,
    transformations: Vec<Arc<dyn Transformation>>,
    parameters: Parameters,
    worker: Option<Handle>,
    fetcher: Option<Arc<dyn Fetcher>>,
    decoder: Option<Arc<dyn Decoder>>,
    transition: TransitionPolicy,
    listener: Option<Arc<dyn RequestListener>>,
    lifecycle: Option<Arc<dyn Lifecycle>>,
}

impl ImageRequest {
    /// Starts building a request for `data`.
    #[must_use]
    pub fn builder(data: impl Into<RequestData>) -> ImageRequestBuilder {
        ImageRequestBuilder::default().data(data)
    }

    /// Starts building a request with no data yet.
    #[must_use]
    pub fn empty_builder() -> ImageRequestBuilder {
        ImageRequestBuilder::default()
    }

    /// Creates a request for `data` with default settings.
    #[must_use]
    pub fn new(data: impl Into<RequestData>) -> Self {
        Self::builder(data).build()
    }

    /// Returns the request identifier used in logs.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the data to load.
    #[must_use]
    pub const fn data(&self) -> Option<&RequestData> {
        self.data.as_ref()
    }

    /// Returns the cache key override.
    #[must_use]
    pub const fn memory_cache_key(&self) -> Option<&CacheKey> {
        self.memory_cache_key.as_ref()
    }

    /// Returns additional keys checked after the primary key.
    #[must_use]
    pub fn alias_keys(&self) -> &[CacheKey] {
        &self.alias_keys
    }

    /// Returns the key whose cached image is used as placeholder.
    #[must_use]
    pub const fn placeholder_cache_key(&self) -> Option<&CacheKey> {
        self.placeholder_cache_key.as_ref()
    }

    /// Returns the placeholder image.
    #[must_use]
    pub const fn placeholder(&self) -> Option<&Bitmap> {
        self.placeholder.as_ref()
    }

    /// Returns the image shown on failure.
    #[must_use]
    pub const fn error(&self) -> Option<&Bitmap> {
        self.error.as_ref()
    }

    /// Returns the image shown when the request has no data.
    #[must_use]
    pub const fn fallback(&self) -> Option<&Bitmap> {
        self.fallback.as_ref()
    }

    /// Returns the sink, if any.
    #[must_use]
    pub const fn target(&self) -> Option<&Arc<dyn Target>> {
        self.target.as_ref()
    }

    /// Returns the size policy.
    #[must_use]
    pub const fn size(&self) -> &SizePolicy {
        &self.size
    }

    /// Returns the scale.
    #[must_use]
    pub const fn scale(&self) -> Scale {
        self.scale
    }

    /// Returns the precision.
    #[must_use]
    pub const fn precision(&self) -> Precision {
        self.precision
    }

    /// Returns the requested pixel format.
    #[must_use]
    pub const fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    /// Returns the memory cache policy.
    #[must_use]
    pub const fn memory_cache_policy(&self) -> CachePolicy {
        self.memory_cache_policy
    }

    /// Returns the transformations in application order.
    #[must_use]
    pub fn transformations(&self) -> &[Arc<dyn Transformation>] {
        &self.transformations
    }

    /// Returns the parameters.
    #[must_use]
    pub const fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Returns the worker runtime override.
    #[must_use]
    pub const fn worker(&self) -> Option<&Handle> {
        self.worker.as_ref()
    }

    /// Returns the fetcher override.
    #[must_use]
    pub const fn fetcher(&self) -> Option<&Arc<dyn Fetcher>> {
        self.fetcher.as_ref()
    }

    /// Returns the decoder override.
    #[must_use]
    pub const fn decoder(&self) -> Option<&Arc<dyn Decoder>> {
        self.decoder.as_ref()
    }

    /// Returns the transition policy.
    #[must_use]
    pub const fn transition(&self) -> TransitionPolicy {
        self.transition
    }

    /// Returns the request-level listener.
    #[must_use]
    pub const fn listener(&self) -> Option<&Arc<dyn RequestListener>> {
        self.listener.as_ref()
    }

    /// Returns the lifecycle the request is bound to.
    #[must_use]
    pub const fn lifecycle(&self) -> Option<&Arc<dyn Lifecycle>> {
        self.lifecycle.as_ref()
    }

    /// Returns true if a cached image of a different size is acceptable.
    #[must_use]
    pub const fn allows_inexact_size(&self) -> bool {
        match self.precision {
            Precision::Exact => false,
            Precision::Inexact => true,
            Precision::Automatic => matches!(self.size, SizePolicy::Resolver(_)),
        }
    }

    /// Returns true for fire-and-forget warmups whose pixels are discarded:
    /// no target and cache writes disabled.
    #[must_use]
    pub fn is_preload_without_output(&self) -> bool {
        self.target.is_none() && !self.memory_cache_policy.write_enabled()
    }

    /// Derives the options handed to fetchers, decoders and transformations.
    #[must_use]
    pub fn options(&self) -> Options {
        Options {
            pixel_format: self.pixel_format,
            scale: self.scale,
            allow_inexact_size: self.allows_inexact_size(),
            parameters: self.parameters.clone(),
        }
    }
}

impl std::fmt::Debug for ImageRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageRequest")
            .field("id", &self.id)
            .field("data", &self.data)
            .field("memory_cache_key", &self.memory_cache_key)
            .field("size", &self.size)
            .field("memory_cache_policy", &self.memory_cache_policy)
            .field("transformations", &self.transformations.len())
            .field("has_target", &self.target.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`ImageRequest`].
#[derive(Default)]
pub struct ImageRequestBuilder {
    data: Option<RequestData>,
    memory_cache_key: Option<CacheKey>,
    alias_keys: Vec<CacheKey>,
    placeholder_cache_key: Option<CacheKey>,
    placeholder: Option<Bitmap>,
    error: Option<Bitmap>,
    fallback: Option<Bitmap>,
    target: Option<Arc<dyn Target>>,
    size: SizePolicy,
    scale: Scale,
    precision: Precision,
    pixel_format: PixelFormat,
    memory_cache_policy: CachePolicy,
    transformations: Vec<Arc<dyn Transformation>>,
    parameters: Parameters,
    worker: Option<Handle>,
    fetcher: Option<Arc<dyn Fetcher>>,
    decoder: Option<Arc<dyn Decoder>>,
    transition: TransitionPolicy,
    listener: Option<Arc<dyn RequestListener>>,
    lifecycle: Option<Arc<dyn Lifecycle>>,
}

impl ImageRequestBuilder {
    /// Sets the data to load.
    #[must_use]
    pub fn data(mut self, data: impl Into<RequestData>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Overrides the computed memory cache key.
    #[must_use]
    pub fn memory_cache_key(mut self, key: impl Into<CacheKey>) -> Self {
        self.memory_cache_key = Some(key.into());
        self
    }

    /// Adds a key checked after the primary key.
    #[must_use]
    pub fn alias_key(mut self, key: impl Into<CacheKey>) -> Self {
        self.alias_keys.push(key.into());
        self
    }

    /// Uses the image cached under `key` as placeholder.
    #[must_use]
    pub fn placeholder_cache_key(mut self, key: impl Into<CacheKey>) -> Self {
        self.placeholder_cache_key = Some(key.into());
        self
    }

    /// Sets the placeholder image.
    #[must_use]
    pub fn placeholder(mut self, bitmap: Bitmap) -> Self {
        self.placeholder = Some(bitmap);
        self
    }

    /// Sets the image shown on failure.
    #[must_use]
    pub fn error(mut self, bitmap: Bitmap) -> Self {
        self.error = Some(bitmap);
        self
    }

    /// Sets the image shown when the request has no data.
    #[must_use]
    pub fn fallback(mut self, bitmap: Bitmap) -> Self {
        self.fallback = Some(bitmap);
        self
    }

    /// Sets the sink.
    #[must_use]
    pub fn target(mut self, target: Arc<dyn Target>) -> Self {
        self.target = Some(target);
        self
    }

    /// Loads at a fixed size.
    #[must_use]
    pub fn size(mut self, size: Size) -> Self {
        self.size = SizePolicy::Fixed(size);
        self
    }

    /// Measures the size at runtime.
    #[must_use]
    pub fn size_resolver(mut self, resolver: Arc<dyn SizeResolver>) -> Self {
        self.size = SizePolicy::Resolver(resolver);
        self
    }

    /// Sets the scale.
    #[must_use]
    pub const fn scale(mut self, scale: Scale) -> Self {
        self.scale = scale;
        self
    }

    /// Sets the precision.
    #[must_use]
    pub const fn precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    /// Sets the requested pixel format.
    #[must_use]
    pub const fn pixel_format(mut self, format: PixelFormat) -> Self {
        self.pixel_format = format;
        self
    }

    /// Sets the memory cache policy.
    #[must_use]
    pub const fn memory_cache_policy(mut self, policy: CachePolicy) -> Self {
        self.memory_cache_policy = policy;
        self
    }

    /// Appends a transformation.
    #[must_use]
    pub fn transformation(mut self, transformation: Arc<dyn Transformation>) -> Self {
        self.transformations.push(transformation);
        self
    }

    /// Replaces the parameters.
    #[must_use]
    pub fn parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Runs fetch, decode and transform on this runtime.
    #[must_use]
    pub fn worker(mut self, handle: Handle) -> Self {
        self.worker = Some(handle);
        self
    }

    /// Forces a specific fetcher.
    #[must_use]
    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Forces a specific decoder.
    #[must_use]
    pub fn decoder(mut self, decoder: Arc<dyn Decoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Sets the transition policy.
    #[must_use]
    pub const fn transition(mut self, transition: TransitionPolicy) -> Self {
        self.transition = transition;
        self
    }

    /// Crossfades over `duration`.
    #[must_use]
    pub const fn crossfade(self, duration: Duration) -> Self {
        self.transition(TransitionPolicy::Crossfade { duration })
    }

    /// Sets the request-level listener.
    #[must_use]
    pub fn listener(mut self, listener: Arc<dyn RequestListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Binds the request to a lifecycle; its teardown cancels the request.
    #[must_use]
    pub fn lifecycle(mut self, lifecycle: Arc<dyn Lifecycle>) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    /// Builds the request.
    #[must_use]
    pub fn build(self) -> ImageRequest {
        ImageRequest {
            id: Uuid::new_v4(),
            data: self.data,
            memory_cache_key: self.memory_cache_key,
            alias_keys: self.alias_keys,
            placeholder_cache_key: self.placeholder_cache_key,
            placeholder: self.placeholder,
            error: self.error,
            fallback: self.fallback,
            target: self.target,
            size: self.size,
            scale: self.scale,
            precision: self.precision,
            pixel_format: self.pixel_format,
            memory_cache_policy: self.memory_cache_policy,
            transformations: self.transformations,
            parameters: self.parameters,
            worker: self.worker,
            fetcher: self.fetcher,
            decoder: self.decoder,
            transition: self.transition,
            listener: self.listener,
            lifecycle: self.lifecycle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedResolver;

    #[async_trait]
    impl SizeResolver for FixedResolver {
        async fn size(&self) -> Size {
            Size::pixels(1, 1)
        }
    }

    #[test]
    fn test_cache_policy_flags() {
        assert!(CachePolicy::Enabled.read_enabled() && CachePolicy::Enabled.write_enabled());
        assert!(CachePolicy::ReadOnly.read_enabled() && !CachePolicy::ReadOnly.write_enabled());
        assert!(!CachePolicy::WriteOnly.read_enabled() && CachePolicy::WriteOnly.write_enabled());
        assert!(!CachePolicy::Disabled.read_enabled() && !CachePolicy::Disabled.write_enabled());
    }

    #[test]
    fn test_automatic_precision_depends_on_size_source() {
        let fixed = ImageRequest::builder("a").size(Size::pixels(10, 10)).build();
        assert!(!fixed.allows_inexact_size());

        let measured = ImageRequest::builder("a")
            .size_resolver(Arc::new(FixedResolver))
            .build();
        assert!(measured.allows_inexact_size());

        let exact = ImageRequest::builder("a")
            .size_resolver(Arc::new(FixedResolver))
            .precision(Precision::Exact)
            .build();
        assert!(!exact.allows_inexact_size());
    }

    #[test]
    fn test_preload_detection() {
        let preload = ImageRequest::builder("a")
            .memory_cache_policy(CachePolicy::ReadOnly)
            .build();
        assert!(preload.is_preload_without_output());
        assert!(!ImageRequest::new("a").is_preload_without_output());
    }

    #[test]
    fn test_requests_get_distinct_ids() {
        assert_ne!(ImageRequest::new("a").id(), ImageRequest::new("a").id());
        assert!(ImageRequest::empty_builder().build().data().is_none());
    }
}
