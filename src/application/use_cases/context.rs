//! Shared state handed to every request.

use std::sync::Arc;

use tokio::runtime::Handle;

use crate::application::services::ComponentRegistry;
use crate::domain::ports::{
    BitmapPoolPort, Decoder, EventListener, MemoryCachePort, ReferenceCounterPort,
};

/// Everything a request needs from its loader, owned in one place instead
/// of living in globals.
#[derive(Clone)]
pub struct LoaderContext {
    /// Mappers, fetchers and decoders.
    pub registry: Arc<ComponentRegistry>,
    /// Two-tier memory cache.
    pub memory_cache: Arc<dyn MemoryCachePort>,
    /// Reusable pixel buffers.
    pub bitmap_pool: Arc<dyn BitmapPoolPort>,
    /// Holder accounting for pooled buffers.
    pub references: Arc<dyn ReferenceCounterPort>,
    /// Loader-wide event listener.
    pub listener: Arc<dyn EventListener>,
    /// Decoder used for preloads whose pixels are never used.
    pub drain_decoder: Arc<dyn Decoder>,
    /// Default runtime for fetch, decode and transform work.
    pub worker: Handle,
}

impl std::fmt::Debug for LoaderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderContext")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
