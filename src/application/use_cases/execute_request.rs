//! The request execution engine.

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::application::services::{
    LazySize, deliver_success, is_cached_value_valid, memory_cache_key,
};
use crate::domain::entities::{
    Bitmap, BitmapLease, CacheKey, DataSource, ErrorResult, ImageRequest, ImageResult, Size,
    SuccessResult,
};
use crate::domain::errors::{Cancelled, LoadError};
use crate::domain::ports::{Lifecycle, LifecycleObserver};

use super::LoaderContext;
use super::fetch_decode::{FetchJob, fetch_decode_transform};

/// What a target shows while its request loads.
enum StartImage {
    /// A memory cache hit, held until the request finishes.
    Cached(BitmapLease),
    /// The request's own placeholder.
    Placeholder(Bitmap),
}

impl StartImage {
    fn bitmap(&self) -> &Bitmap {
        match self {
            Self::Cached(lease) => lease.bitmap(),
            Self::Placeholder(bitmap) => bitmap,
        }
    }
}

/// Cancels a request when its lifecycle is destroyed.
struct CancelOnDestroy {
    token: CancellationToken,
}

impl LifecycleObserver for CancelOnDestroy {
    fn on_destroy(&self) {
        self.token.cancel();
    }
}

/// Keeps a request's observer registered for as long as it runs.
struct LifecycleGuard {
    lifecycle: Arc<dyn Lifecycle>,
    observer: Arc<dyn LifecycleObserver>,
}

impl LifecycleGuard {
    fn attach(request: &ImageRequest, token: &CancellationToken) -> Option<Self> {
        let lifecycle = Arc::clone(request.lifecycle()?);
        let observer: Arc<dyn LifecycleObserver> = Arc::new(CancelOnDestroy {
            token: token.clone(),
        });
        lifecycle.add_observer(Arc::clone(&observer));
        Some(Self {
            lifecycle,
            observer,
        })
    }
}

impl Drop for LifecycleGuard {
    fn drop(&mut self) {
        self.lifecycle.remove_observer(&self.observer);
    }
}

/// Races `future` against cancellation.
async fn cancellable<T>(
    token: &CancellationToken,
    future: impl Future<Output = Result<T, LoadError>>,
) -> Result<T, LoadError> {
    tokio::select! {
        biased;
        () = token.cancelled() => Err(LoadError::Cancelled),
        result = future => result,
    }
}

fn checkpoint(token: &CancellationToken) -> Result<(), LoadError> {
    if token.is_cancelled() {
        Err(LoadError::Cancelled)
    } else {
        Ok(())
    }
}

/// Runs requests against a [`LoaderContext`].
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    context: Arc<LoaderContext>,
}

impl RequestExecutor {
    /// Creates an executor.
    #[must_use]
    pub const fn new(context: Arc<LoaderContext>) -> Self {
        Self { context }
    }

    /// Returns the shared context.
    #[must_use]
    pub const fn context(&self) -> &Arc<LoaderContext> {
        &self.context
    }

    /// Runs `request` to completion.
    ///
    /// Failures become [`ImageResult::Error`] and are delivered like successes.
    /// Cancellation produces no result: only the cancel callbacks fire.
    ///
    /// # Errors
    /// Returns [`Cancelled`] if `token` fired before the result was delivered.
    pub async fn execute(
        &self,
        request: ImageRequest,
        token: CancellationToken,
    ) -> Result<ImageResult, Cancelled> {
        if token.is_cancelled() {
            self.notify_cancelled(&request);
            return Err(Cancelled);
        }

        let listener = &self.context.listener;
        listener.on_dispatch(&request);
        let _lifecycle = LifecycleGuard::attach(&request, &token);

        let size = LazySize::new(request.size().clone());
        let _start_image = self.notify_start(&request, &size);

        let outcome = match self.load(&request, &size, &token).await {
            Ok(success) => deliver_success(&request, &success, listener.as_ref(), &token)
                .await
                .map(|()| success),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(success) => {
                if let Some(request_listener) = request.listener() {
                    request_listener.on_success(&request, &success);
                }
                listener.on_success(&request, &success);
                debug!(
                    request = %request.id(),
                    source = %success.data_source,
                    "Image request succeeded"
                );
                Ok(ImageResult::Success(success))
            }
            Err(LoadError::Cancelled) => {
                self.notify_cancelled(&request);
                Err(Cancelled)
            }
            Err(error) => Ok(ImageResult::Error(self.deliver_error(&request, error))),
        }
    }

    fn notify_start(&self, request: &ImageRequest, size: &LazySize) -> Option<StartImage> {
        let start_image = self.start_image(request, size);
        if let Some(target) = request.target() {
            target.on_start(start_image.as_ref().map(StartImage::bitmap));
        }
        if let Some(request_listener) = request.listener() {
            request_listener.on_start(request);
        }
        self.context.listener.on_start(request);
        start_image
    }

    /// Picks what the target shows while loading: a valid hit for a key known
    /// up front, else the placeholder cached under the placeholder key, else
    /// the placeholder image. Cache lookups here are peeks and do not count
    /// toward hit statistics.
    fn start_image(&self, request: &ImageRequest, size: &LazySize) -> Option<StartImage> {
        let cache = &self.context.memory_cache;
        if request.memory_cache_policy().read_enabled()
            && let (Some(key), Some(size)) = (request.memory_cache_key(), size.peek())
            && let Some(cached) = cache.peek(key)
            && is_cached_value_valid(request, &cached.image, cached.is_sampled, size)
        {
            return Some(StartImage::Cached(cached.image));
        }
        request
            .placeholder_cache_key()
            .and_then(|key| cache.peek(key))
            .map(|cached| StartImage::Cached(cached.image))
            .or_else(|| request.placeholder().cloned().map(StartImage::Placeholder))
    }

    async fn load(
        &self,
        request: &ImageRequest,
        lazy_size: &LazySize,
        token: &CancellationToken,
    ) -> Result<SuccessResult, LoadError> {
        let context = &self.context;
        let listener = &context.listener;

        let data = request.data().cloned().ok_or(LoadError::DataMissing)?;

        checkpoint(token)?;
        listener.resolve_size_start(request);
        let size = cancellable(token, async { Ok::<_, LoadError>(lazy_size.get().await) }).await?;
        listener.resolve_size_end(request, size);
        checkpoint(token)?;

        listener.map_start(request, &data);
        let mapped = context.registry.map(data, size);
        listener.map_end(request, &mapped);

        let fetcher = request
            .fetcher()
            .cloned()
            .or_else(|| context.registry.fetcher_for(&mapped));
        let key = memory_cache_key(request, &mapped, fetcher.as_deref(), size);
        trace!(request = %request.id(), key = ?key.as_ref().map(ToString::to_string), "Cache key computed");

        if let Some(hit) = self.cached_result(request, key.as_ref(), size) {
            checkpoint(token)?;
            return Ok(hit);
        }
        checkpoint(token)?;

        let fetcher = fetcher.ok_or_else(|| LoadError::no_fetcher(mapped.kind()))?;
        let job = FetchJob {
            request: request.clone(),
            data: mapped,
            fetcher,
            size,
        };
        let worker = request
            .worker()
            .cloned()
            .unwrap_or_else(|| context.worker.clone());
        let mut task = worker.spawn(fetch_decode_transform(
            Arc::clone(context),
            job,
            token.clone(),
        ));

        let output = tokio::select! {
            biased;
            () = token.cancelled() => {
                task.abort();
                let _ = (&mut task).await;
                return Err(LoadError::Cancelled);
            }
            joined = &mut task => match joined {
                Ok(result) => result?,
                Err(e) if e.is_cancelled() => return Err(LoadError::Cancelled),
                Err(e) => return Err(LoadError::fetch(format!("worker task failed: {e}"))),
            },
        };

        if let Some(key) = &key {
            if request.memory_cache_policy().write_enabled()
                && !context.memory_cache.put(key.clone(), &output.image, output.is_sampled)
            {
                debug!(request = %request.id(), key = %key, "Image not cached");
            }
        }

        Ok(SuccessResult {
            image: output.image,
            request_id: request.id(),
            data_source: output.data_source,
            memory_cache_key: key,
            is_sampled: output.is_sampled,
        })
    }

    /// Looks up the primary key, then each alias, and returns the first
    /// valid hit. Invalid hits stay cached.
    fn cached_result(
        &self,
        request: &ImageRequest,
        key: Option<&CacheKey>,
        size: Size,
    ) -> Option<SuccessResult> {
        if !request.memory_cache_policy().read_enabled() {
            return None;
        }
        let cache = &self.context.memory_cache;
        key.into_iter()
            .chain(request.alias_keys())
            .find_map(|candidate| {
                let cached = cache.get(candidate)?;
                if !is_cached_value_valid(request, &cached.image, cached.is_sampled, size) {
                    trace!(request = %request.id(), key = %candidate, "Ignoring cached image");
                    return None;
                }
                debug!(request = %request.id(), key = %candidate, "Memory cache hit");
                Some(SuccessResult {
                    image: cached.image,
                    request_id: request.id(),
                    data_source: DataSource::MemoryCache,
                    memory_cache_key: Some(candidate.clone()),
                    is_sampled: cached.is_sampled,
                })
            })
    }

    fn deliver_error(&self, request: &ImageRequest, error: LoadError) -> ErrorResult {
        warn!(request = %request.id(), error = %error, "Image request failed");
        let image = if matches!(error, LoadError::DataMissing) {
            request.fallback().or_else(|| request.error()).cloned()
        } else {
            request.error().cloned()
        };
        let result = ErrorResult {
            image,
            request_id: request.id(),
            error,
        };
        if let Some(target) = request.target() {
            target.on_error(&result);
        }
        if let Some(request_listener) = request.listener() {
            request_listener.on_error(request, &result);
        }
        self.context.listener.on_error(request, &result.error);
        result
    }

    fn notify_cancelled(&self, request: &ImageRequest) {
        debug!(request = %request.id(), "Image request cancelled");
        if let Some(request_listener) = request.listener() {
            request_listener.on_cancel(request);
        }
        self.context.listener.on_cancel(request);
    }
}
