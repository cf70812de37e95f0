//! Public loader facade.
//!
//! Owns the two-tier memory cache, the bitmap pool and the component
//! registry, and runs each request as a cancellable task.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::services::ComponentRegistry;
use crate::application::use_cases::{LoaderContext, RequestExecutor};
use crate::domain::entities::{
    CacheKey, ImageRequest, ImageRequestBuilder, ImageResult, RequestData, TrimLevel,
};
use crate::domain::errors::{Cancelled, LoaderError};
use crate::domain::ports::{
    BitmapPoolPort, EventListener, MemoryCachePort, NoopEventListener, ReferenceCounterPort,
};
use crate::infrastructure::bitmap::{BitmapPool, BitmapReferenceCounter, PoolStats};
use crate::infrastructure::config::LoaderConfig;
use crate::infrastructure::decoders::{DrainDecoder, ImageDecoder};
use crate::infrastructure::fetchers::{BitmapFetcher, BytesFetcher, FileFetcher, HttpFetcher};
use crate::infrastructure::mappers::{CdnSizeMapper, FileUriMapper, ResourceIdMapper, TextMapper};

use super::disposable::Disposable;
use super::memory_cache::{CacheStats, MemoryImageCache};
use super::weak_cache::WeakMemoryCache;

/// Builds the default collaborators for `config`, in registration order.
///
/// # Errors
/// Returns error if the HTTP client cannot be created.
pub fn default_registry(config: &LoaderConfig) -> Result<ComponentRegistry, LoaderError> {
    let resource_dir = config
        .resource_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    let http = HttpFetcher::new(config.http_timeout(), config.max_concurrent_fetches)?;

    Ok(ComponentRegistry::builder()
        .measured_mapper(Arc::new(CdnSizeMapper::new(config.cdn_hosts.clone())))
        .mapper(Arc::new(TextMapper))
        .mapper(Arc::new(ResourceIdMapper::new(resource_dir)))
        .mapper(Arc::new(FileUriMapper))
        .fetcher(Arc::new(http))
        .fetcher(Arc::new(FileFetcher))
        .fetcher(Arc::new(BytesFetcher))
        .fetcher(Arc::new(BitmapFetcher))
        .decoder(Arc::new(ImageDecoder))
        .build())
}

/// Statistics about the loader's memory use.
#[derive(Debug, Clone)]
pub struct LoaderStats {
    /// Memory cache statistics.
    pub cache: CacheStats,
    /// Bitmap pool statistics.
    pub pool: PoolStats,
}

impl std::fmt::Display for LoaderStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}; {}", self.cache, self.pool)
    }
}

/// Configures an [`ImageLoader`].
#[must_use]
pub struct ImageLoaderBuilder {
    config: LoaderConfig,
    main: Option<Handle>,
    worker: Option<Handle>,
    listener: Arc<dyn EventListener>,
    registry: Option<ComponentRegistry>,
}

impl ImageLoaderBuilder {
    fn new() -> Self {
        Self {
            config: LoaderConfig::default(),
            main: None,
            worker: None,
            listener: Arc::new(NoopEventListener),
            registry: None,
        }
    }

    /// Uses `config` for budgets and default collaborators.
    pub fn config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Runtime that orchestrates requests and delivers results.
    pub fn main_runtime(mut self, handle: Handle) -> Self {
        self.main = Some(handle);
        self
    }

    /// Default runtime for fetch, decode and transform work.
    pub fn worker_runtime(mut self, handle: Handle) -> Self {
        self.worker = Some(handle);
        self
    }

    /// Loader-wide event listener.
    pub fn listener(mut self, listener: Arc<dyn EventListener>) -> Self {
        self.listener = listener;
        self
    }

    /// Replaces the default mappers, fetchers and decoders.
    pub fn registry(mut self, registry: ComponentRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Creates the loader. Runtimes default to the current one.
    ///
    /// # Errors
    /// Returns error if no runtime is available or the HTTP client cannot be
    /// created.
    pub fn build(self) -> Result<ImageLoader, LoaderError> {
        let main = match self.main {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| LoaderError::NoRuntime)?,
        };
        let worker = self.worker.unwrap_or_else(|| main.clone());
        let registry = match self.registry {
            Some(registry) => registry,
            None => default_registry(&self.config)?,
        };

        let pool = Arc::new(if self.config.bitmap_pooling {
            BitmapPool::new(self.config.bitmap_pool_size)
        } else {
            BitmapPool::disabled()
        });
        let weak = self
            .config
            .weak_references
            .then(|| Arc::new(WeakMemoryCache::new()));
        let pool_port: Arc<dyn BitmapPoolPort> = pool.clone();
        let references: Arc<dyn ReferenceCounterPort> = Arc::new(BitmapReferenceCounter::new(
            Arc::clone(&pool_port),
            weak.clone(),
        ));
        let memory_cache = Arc::new(MemoryImageCache::new(
            self.config.memory_cache_size,
            Arc::clone(&references),
            weak,
        ));

        let context = LoaderContext {
            registry: Arc::new(registry),
            memory_cache: memory_cache.clone(),
            bitmap_pool: pool_port,
            references,
            listener: self.listener,
            drain_decoder: Arc::new(DrainDecoder),
            worker,
        };
        debug!(
            memory_cache_size = self.config.memory_cache_size,
            pool_size = pool.max_size(),
            "Created image loader"
        );

        Ok(ImageLoader {
            executor: RequestExecutor::new(Arc::new(context)),
            memory_cache,
            pool,
            main,
            root: CancellationToken::new(),
            shutdown: AtomicBool::new(false),
            config: self.config,
        })
    }
}

/// Loads images through a shared cache, pool and component registry.
pub struct ImageLoader {
    executor: RequestExecutor,
    memory_cache: Arc<MemoryImageCache>,
    pool: Arc<BitmapPool>,
    main: Handle,
    root: CancellationToken,
    shutdown: AtomicBool,
    config: LoaderConfig,
}

impl std::fmt::Debug for ImageLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageLoader")
            .field("config", &self.config)
            .field("shutdown", &self.is_shutdown())
            .finish_non_exhaustive()
    }
}

impl ImageLoader {
    /// Returns a builder with default configuration.
    pub fn builder() -> ImageLoaderBuilder {
        ImageLoaderBuilder::new()
    }

    /// Creates a loader from `config` on the current runtime.
    ///
    /// # Errors
    /// Returns error if no runtime is available or the HTTP client cannot be
    /// created.
    pub fn new(config: LoaderConfig) -> Result<Self, LoaderError> {
        Self::builder().config(config).build()
    }

    /// Starts a request builder carrying this loader's defaults.
    pub fn new_request(&self, data: impl Into<RequestData>) -> ImageRequestBuilder {
        ImageRequest::builder(data).transition(self.config.transition())
    }

    /// Starts `request` in the background.
    pub fn enqueue(&self, request: ImageRequest) -> Disposable {
        let token = self.admit();
        let executor = self.executor.clone();
        let job = self.main.spawn({
            let token = token.clone();
            async move { executor.execute(request, token).await }
        });
        Disposable::new(token, job)
    }

    /// Runs `request` and waits for its result. Dropping the returned future
    /// cancels the request.
    ///
    /// # Errors
    /// Returns [`Cancelled`] if the request was cancelled or the loader is
    /// shut down.
    pub async fn execute(&self, request: ImageRequest) -> Result<ImageResult, Cancelled> {
        let token = self.admit();
        let _guard = token.clone().drop_guard();
        let executor = self.executor.clone();
        self.main
            .spawn(async move { executor.execute(request, token).await })
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "Image request task failed");
                Err(Cancelled)
            })
    }

    /// Removes `key` from both memory cache tiers.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        self.memory_cache.invalidate(key)
    }

    /// Empties both memory cache tiers.
    pub fn clear_memory(&self) {
        self.memory_cache.clear();
        info!("Cleared memory cache");
    }

    /// Sheds memory from the cache and the pool according to `level`.
    pub fn trim_memory(&self, level: TrimLevel) {
        self.memory_cache.trim_memory(level);
        self.pool.trim_memory(level);
        debug!(?level, "Trimmed memory");
    }

    /// Cancels every running request and releases all memory. Requests
    /// submitted afterwards are cancelled immediately.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }
        self.root.cancel();
        self.memory_cache.clear();
        self.pool.clear();
        info!("Image loader shut down");
    }

    /// Returns true once [`shutdown`](Self::shutdown) has run.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Returns cache and pool statistics.
    #[must_use]
    pub fn stats(&self) -> LoaderStats {
        LoaderStats {
            cache: self.memory_cache.stats(),
            pool: self.pool.stats(),
        }
    }

    /// Returns the memory cache.
    #[must_use]
    pub const fn memory_cache(&self) -> &Arc<MemoryImageCache> {
        &self.memory_cache
    }

    /// Returns the bitmap pool.
    #[must_use]
    pub const fn bitmap_pool(&self) -> &Arc<BitmapPool> {
        &self.pool
    }

    /// Returns the configuration the loader was built with.
    #[must_use]
    pub const fn config(&self) -> &LoaderConfig {
        &self.config
    }

    fn admit(&self) -> CancellationToken {
        let token = self.root.child_token();
        if self.is_shutdown() {
            debug!("Rejecting request after shutdown");
            token.cancel();
        }
        token
    }
}
