#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use bytes::Bytes;
    use parking_lot::Mutex;
    use tokio::runtime::Handle;
    use tokio::sync::Barrier;
    use tokio_util::sync::CancellationToken;

    use crate::application::services::ComponentRegistry;
    use crate::application::use_cases::{LoaderContext, RequestExecutor};
    use crate::domain::entities::{
        Bitmap, CacheKey, CachePolicy, DataSource, ErrorResult, ImageRequest, ImageResult, ImageSource,
        Options, PixelFormat, RequestData, Size, SuccessResult, TrimLevel,
    };
    use crate::domain::errors::{Cancelled, LoadError};
    use crate::domain::ports::{
        Animation, BitmapPoolPort, DecodeResult, Decoder, EventListener, FetchResult, Fetcher,
        MemoryCachePort, SizeResolver, SourceResult, Target, Transformation, TransitionTarget,
    };
    use crate::infrastructure::bitmap::{BitmapPool, BitmapReferenceCounter};
    use crate::infrastructure::decoders::DrainDecoder;
    use crate::infrastructure::fetchers::BitmapFetcher;
    use crate::infrastructure::image::{MemoryImageCache, WeakMemoryCache};
    use crate::infrastructure::lifecycle::LifecycleRegistry;

    #[derive(Default)]
    struct RecordingListener {
        events: Mutex<Vec<String>>,
    }

    impl RecordingListener {
        fn record(&self, event: impl Into<String>) {
            self.events.lock().push(event.into());
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().clone()
        }

        fn count(&self, event: &str) -> usize {
            self.events.lock().iter().filter(|e| *e == event).count()
        }
    }

    impl EventListener for RecordingListener {
        fn on_dispatch(&self, _request: &ImageRequest) {
            self.record("dispatch");
        }
        fn on_start(&self, _request: &ImageRequest) {
            self.record("start");
        }
        fn resolve_size_start(&self, _request: &ImageRequest) {
            self.record("resolve_size_start");
        }
        fn resolve_size_end(&self, _request: &ImageRequest, _size: Size) {
            self.record("resolve_size_end");
        }
        fn map_start(&self, _request: &ImageRequest, _input: &RequestData) {
            self.record("map_start");
        }
        fn map_end(&self, _request: &ImageRequest, _output: &RequestData) {
            self.record("map_end");
        }
        fn fetch_start(&self, _request: &ImageRequest, _fetcher: &str) {
            self.record("fetch_start");
        }
        fn fetch_end(&self, _request: &ImageRequest, _fetcher: &str, _source: DataSource) {
            self.record("fetch_end");
        }
        fn decode_start(&self, _request: &ImageRequest, decoder: &str) {
            self.record(format!("decode_start:{decoder}"));
        }
        fn decode_end(&self, _request: &ImageRequest, decoder: &str) {
            self.record(format!("decode_end:{decoder}"));
        }
        fn transform_start(&self, _request: &ImageRequest, _input: &Bitmap) {
            self.record("transform_start");
        }
        fn transform_end(&self, _request: &ImageRequest, _output: &Bitmap) {
            self.record("transform_end");
        }
        fn transition_start(&self, _request: &ImageRequest) {
            self.record("transition_start");
        }
        fn transition_end(&self, _request: &ImageRequest) {
            self.record("transition_end");
        }
        fn on_cancel(&self, _request: &ImageRequest) {
            self.record("cancel");
        }
        fn on_error(&self, _request: &ImageRequest, _error: &LoadError) {
            self.record("error");
        }
        fn on_success(&self, _request: &ImageRequest, _result: &SuccessResult) {
            self.record("success");
        }
    }

    struct StubFetcher {
        calls: AtomicUsize,
        key: Option<&'static str>,
        barrier: Option<Arc<Barrier>>,
    }

    impl StubFetcher {
        fn keyed(key: &'static str) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                key: Some(key),
                barrier: None,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        fn name(&self) -> &'static str {
            "stub"
        }

        fn handles(&self, data: &RequestData) -> bool {
            matches!(data, RequestData::Text(_))
        }

        fn cache_key(&self, _data: &RequestData) -> Option<String> {
            self.key.map(str::to_string)
        }

        async fn fetch(
            &self,
            _pool: &dyn BitmapPoolPort,
            _data: &RequestData,
            _size: Size,
            _options: &Options,
        ) -> Result<FetchResult, LoadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(barrier) = &self.barrier {
                barrier.wait().await;
            }
            Ok(FetchResult::Source(SourceResult {
                source: ImageSource::from_bytes(Bytes::from_static(b"encoded")),
                mime_type: Some("image/test".to_string()),
                data_source: DataSource::Network,
            }))
        }
    }

    struct StubDecoder {
        calls: AtomicUsize,
        fail: bool,
        kept: Mutex<Option<ImageSource>>,
    }

    impl StubDecoder {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
                kept: Mutex::new(None),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Decoder for StubDecoder {
        fn name(&self) -> &'static str {
            "stub"
        }

        fn handles(&self, _mime_type: Option<&str>) -> bool {
            true
        }

        async fn decode(
            &self,
            pool: &dyn BitmapPoolPort,
            source: ImageSource,
            _size: Size,
            _options: &Options,
        ) -> Result<DecodeResult, LoadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                // Keeps the stream alive the way a streaming decoder might.
                *self.kept.lock() = Some(source);
                return Err(LoadError::decode("corrupt header"));
            }
            source
                .read_all()
                .await
                .map_err(|e| LoadError::decode(e.to_string()))?;
            Ok(DecodeResult {
                bitmap: pool.get_or_allocate(4, 4, PixelFormat::Rgba8),
                is_sampled: false,
            })
        }
    }

    struct Invert;

    #[async_trait]
    impl Transformation for Invert {
        fn key(&self) -> String {
            "invert".to_string()
        }

        async fn transform(
            &self,
            pool: &dyn BitmapPoolPort,
            input: Bitmap,
            _size: Size,
        ) -> Result<Bitmap, LoadError> {
            let output = pool.get_dirty(input.width(), input.height(), input.format());
            {
                let src = input.pixels();
                let mut dst = output.pixels_mut();
                for (d, s) in dst.iter_mut().zip(src.iter()) {
                    *d = 255 - *s;
                }
            }
            Ok(output)
        }
    }

    /// Sets its flag when dropped.
    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    /// A fetcher whose fetch never completes.
    #[derive(Default)]
    struct HangingFetcher {
        dropped: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Fetcher for HangingFetcher {
        fn name(&self) -> &'static str {
            "hanging"
        }

        fn handles(&self, data: &RequestData) -> bool {
            matches!(data, RequestData::Text(_))
        }

        fn cache_key(&self, _data: &RequestData) -> Option<String> {
            None
        }

        async fn fetch(
            &self,
            _pool: &dyn BitmapPoolPort,
            _data: &RequestData,
            _size: Size,
            _options: &Options,
        ) -> Result<FetchResult, LoadError> {
            let _flag = DropFlag(Arc::clone(&self.dropped));
            std::future::pending().await
        }
    }

    /// Never finishes, or fails straight away.
    struct Stalled {
        fail: bool,
    }

    #[async_trait]
    impl Transformation for Stalled {
        fn key(&self) -> String {
            "stalled".to_string()
        }

        async fn transform(
            &self,
            _pool: &dyn BitmapPoolPort,
            _input: Bitmap,
            _size: Size,
        ) -> Result<Bitmap, LoadError> {
            if self.fail {
                return Err(LoadError::transform("stalled", "gave up"));
            }
            std::future::pending().await
        }
    }

    struct PendingResolver;

    #[async_trait]
    impl SizeResolver for PendingResolver {
        async fn size(&self) -> Size {
            std::future::pending().await
        }
    }

    #[derive(Default)]
    struct AnimationState {
        stopped: AtomicBool,
        cleared: AtomicBool,
        callbacks: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
    }

    struct StubAnimation {
        state: Arc<AnimationState>,
        instant: bool,
    }

    impl Animation for StubAnimation {
        fn register_end_callback(&mut self, callback: Box<dyn FnOnce() + Send>) {
            if self.instant {
                callback();
            } else {
                self.state.callbacks.lock().push(callback);
            }
        }

        fn clear_end_callbacks(&mut self) {
            self.state.callbacks.lock().clear();
            self.state.cleared.store(true, Ordering::SeqCst);
        }

        fn stop(&mut self) {
            self.state.stopped.store(true, Ordering::SeqCst);
        }

        fn is_finished(&self) -> bool {
            self.instant || self.state.stopped.load(Ordering::SeqCst)
        }
    }

    #[derive(Default)]
    struct RecordingTarget {
        events: Mutex<Vec<String>>,
        animates: bool,
        hidden: bool,
        instant: bool,
        crossfades: AtomicUsize,
        animation: Arc<AnimationState>,
    }

    impl RecordingTarget {
        fn animated(instant: bool) -> Arc<Self> {
            Arc::new(Self {
                animates: true,
                instant,
                ..Self::default()
            })
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().clone()
        }

        fn crossfades(&self) -> usize {
            self.crossfades.load(Ordering::SeqCst)
        }
    }

    impl Target for RecordingTarget {
        fn on_start(&self, placeholder: Option<&Bitmap>) {
            let label = if placeholder.is_some() { "start:placeholder" } else { "start" };
            self.events.lock().push(label.to_string());
        }

        fn on_success(&self, _result: &SuccessResult) {
            self.events.lock().push("success".to_string());
        }

        fn on_error(&self, result: &ErrorResult) {
            let label = if result.image.is_some() { "error:image" } else { "error" };
            self.events.lock().push(label.to_string());
        }

        fn as_transition_target(&self) -> Option<&dyn TransitionTarget> {
            if self.animates { Some(self) } else { None }
        }
    }

    impl TransitionTarget for RecordingTarget {
        fn is_visible(&self) -> bool {
            !self.hidden
        }

        fn current_image(&self) -> Option<Bitmap> {
            None
        }

        fn crossfade(
            &self,
            _from: Option<Bitmap>,
            _result: &SuccessResult,
            _duration: Duration,
        ) -> Box<dyn Animation> {
            self.crossfades.fetch_add(1, Ordering::SeqCst);
            Box::new(StubAnimation {
                state: Arc::clone(&self.animation),
                instant: self.instant,
            })
        }
    }

    struct Harness {
        executor: RequestExecutor,
        cache: Arc<MemoryImageCache>,
        pool: Arc<BitmapPool>,
        references: Arc<BitmapReferenceCounter>,
        listener: Arc<RecordingListener>,
    }

    impl Harness {
        fn new(registry: ComponentRegistry) -> Self {
            let pool = Arc::new(BitmapPool::default());
            let weak = Arc::new(WeakMemoryCache::new());
            let pool_port: Arc<dyn BitmapPoolPort> = pool.clone();
            let references = Arc::new(BitmapReferenceCounter::new(
                Arc::clone(&pool_port),
                Some(Arc::clone(&weak)),
            ));
            let cache = Arc::new(MemoryImageCache::new(
                1024 * 1024,
                references.clone(),
                Some(weak),
            ));
            let listener = Arc::new(RecordingListener::default());
            let context = LoaderContext {
                registry: Arc::new(registry),
                memory_cache: cache.clone(),
                bitmap_pool: pool_port,
                references: references.clone(),
                listener: listener.clone(),
                drain_decoder: Arc::new(DrainDecoder),
                worker: Handle::current(),
            };
            Self {
                executor: RequestExecutor::new(Arc::new(context)),
                cache,
                pool,
                references,
                listener,
            }
        }

        fn with(fetcher: &Arc<StubFetcher>, decoder: &Arc<StubDecoder>) -> Self {
            Self::new(
                ComponentRegistry::builder()
                    .fetcher(fetcher.clone())
                    .decoder(decoder.clone())
                    .build(),
            )
        }

        async fn run(&self, request: ImageRequest) -> Result<ImageResult, Cancelled> {
            self.executor
                .execute(request, CancellationToken::new())
                .await
        }
    }

    fn success(result: Result<ImageResult, Cancelled>) -> SuccessResult {
        match result {
            Ok(ImageResult::Success(s)) => s,
            other => panic!("expected success, got {other:?}"),
        }
    }

    fn failure(result: Result<ImageResult, Cancelled>) -> ErrorResult {
        match result {
            Ok(ImageResult::Error(e)) => e,
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_full_pipeline_event_order() {
        let fetcher = StubFetcher::keyed("a");
        let decoder = StubDecoder::new(false);
        let harness = Harness::with(&fetcher, &decoder);

        let request = ImageRequest::builder("a")
            .size(Size::pixels(4, 4))
            .transformation(Arc::new(Invert))
            .build();
        let result = success(harness.run(request).await);

        assert_eq!(result.data_source, DataSource::Network);
        assert!(result.image.is_prepared());
        assert_eq!(
            harness.listener.events(),
            vec![
                "dispatch",
                "start",
                "resolve_size_start",
                "resolve_size_end",
                "map_start",
                "map_end",
                "fetch_start",
                "fetch_end",
                "decode_start:stub",
                "decode_end:stub",
                "transform_start",
                "transform_end",
                "success",
            ]
        );
    }

    #[tokio::test]
    async fn test_second_request_hits_memory_cache() {
        let fetcher = StubFetcher::keyed("a");
        let decoder = StubDecoder::new(false);
        let harness = Harness::with(&fetcher, &decoder);

        let first = success(harness.run(ImageRequest::new("a")).await);
        let second = success(harness.run(ImageRequest::new("a")).await);

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(second.data_source, DataSource::MemoryCache);
        assert_eq!(first.image.bitmap(), second.image.bitmap());
        assert_eq!(harness.listener.count("fetch_start"), 1);
        assert_eq!(harness.listener.count("success"), 2);
    }

    #[tokio::test]
    async fn test_memory_cache_hit_never_animates() {
        let fetcher = StubFetcher::keyed("a");
        let decoder = StubDecoder::new(false);
        let harness = Harness::with(&fetcher, &decoder);
        let target = RecordingTarget::animated(true);

        let request = || {
            ImageRequest::builder("a")
                .target(target.clone())
                .crossfade(Duration::from_millis(100))
                .build()
        };

        let _first = success(harness.run(request()).await);
        assert_eq!(target.crossfades(), 1);
        assert_eq!(harness.listener.count("transition_end"), 1);

        let second = success(harness.run(request()).await);
        assert_eq!(second.data_source, DataSource::MemoryCache);
        assert_eq!(target.crossfades(), 1);
        assert_eq!(target.events(), vec!["start", "start", "success"]);
    }

    #[tokio::test]
    async fn test_missing_data_fails_before_io() {
        let fetcher = StubFetcher::keyed("a");
        let decoder = StubDecoder::new(false);
        let harness = Harness::with(&fetcher, &decoder);
        let target = Arc::new(RecordingTarget::default());

        let request = ImageRequest::empty_builder()
            .target(target.clone())
            .fallback(Bitmap::new(1, 1, PixelFormat::Rgba8))
            .build();
        let error = failure(harness.run(request).await);

        assert_eq!(error.error, LoadError::DataMissing);
        assert!(error.image.is_some());
        assert_eq!(fetcher.calls(), 0);
        assert_eq!(target.events(), vec!["start", "error:image"]);
        assert_eq!(harness.listener.events(), vec!["dispatch", "start", "error"]);
    }

    #[tokio::test]
    async fn test_unclaimed_data_is_unsupported() {
        let fetcher = StubFetcher::keyed("a");
        let decoder = StubDecoder::new(false);
        let harness = Harness::with(&fetcher, &decoder);

        let error = failure(harness.run(ImageRequest::new(7_u32)).await);
        assert!(matches!(
            error.error,
            LoadError::Unsupported { component: "fetcher", .. }
        ));
    }

    #[tokio::test]
    async fn test_decode_failure_closes_stream_and_reports_error() {
        let fetcher = StubFetcher::keyed("a");
        let decoder = StubDecoder::new(true);
        let harness = Harness::with(&fetcher, &decoder);
        let target = Arc::new(RecordingTarget::default());

        let request = ImageRequest::builder("a")
            .target(target.clone())
            .error(Bitmap::new(1, 1, PixelFormat::Rgba8))
            .build();
        let error = failure(harness.run(request).await);

        assert!(matches!(error.error, LoadError::Decode { .. }));
        let kept = decoder.kept.lock();
        assert!(kept.as_ref().is_some_and(ImageSource::is_closed));
        assert_eq!(target.events(), vec!["start", "error:image"]);
        assert_eq!(harness.listener.count("decode_end:stub"), 0);
        assert_eq!(harness.cache.size(), 0);
    }

    #[tokio::test]
    async fn test_cancel_before_cache_check_only_notifies_cancel() {
        let fetcher = StubFetcher::keyed("a");
        let decoder = StubDecoder::new(false);
        let harness = Harness::with(&fetcher, &decoder);
        let target = Arc::new(RecordingTarget::default());

        let token = CancellationToken::new();
        let request = ImageRequest::builder("a")
            .target(target.clone())
            .size_resolver(Arc::new(PendingResolver))
            .build();

        let executor = harness.executor.clone();
        let running = tokio::spawn({
            let token = token.clone();
            async move { executor.execute(request, token).await }
        });
        tokio::task::yield_now().await;
        token.cancel();

        assert!(matches!(running.await, Ok(Err(Cancelled))));
        let events = harness.listener.events();
        assert!(events.contains(&"cancel".to_string()));
        assert!(!events.iter().any(|e| e == "success" || e == "error"));
        assert!(!target.events().iter().any(|e| e != "start"));
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_already_cancelled_request_does_nothing_else() {
        let fetcher = StubFetcher::keyed("a");
        let decoder = StubDecoder::new(false);
        let harness = Harness::with(&fetcher, &decoder);

        let token = CancellationToken::new();
        token.cancel();
        let result = harness.executor.execute(ImageRequest::new("a"), token).await;

        assert_eq!(result.err(), Some(Cancelled));
        assert_eq!(harness.listener.events(), vec!["cancel"]);
    }

    #[tokio::test]
    async fn test_lifecycle_destroy_cancels_request() {
        let fetcher = StubFetcher::keyed("a");
        let decoder = StubDecoder::new(false);
        let harness = Harness::with(&fetcher, &decoder);
        let lifecycle = Arc::new(LifecycleRegistry::new());

        let request = ImageRequest::builder("a")
            .size_resolver(Arc::new(PendingResolver))
            .lifecycle(lifecycle.clone())
            .build();
        let executor = harness.executor.clone();
        let running =
            tokio::spawn(async move { executor.execute(request, CancellationToken::new()).await });

        while lifecycle.observer_count() == 0 {
            tokio::task::yield_now().await;
        }
        lifecycle.destroy();

        assert!(matches!(running.await, Ok(Err(Cancelled))));
        assert_eq!(lifecycle.observer_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_during_transition_stops_animation() {
        let fetcher = StubFetcher::keyed("a");
        let decoder = StubDecoder::new(false);
        let harness = Harness::with(&fetcher, &decoder);
        let target = RecordingTarget::animated(false);

        let token = CancellationToken::new();
        let request = ImageRequest::builder("a")
            .target(target.clone())
            .crossfade(Duration::from_secs(60))
            .build();
        let executor = harness.executor.clone();
        let running = tokio::spawn({
            let token = token.clone();
            async move { executor.execute(request, token).await }
        });

        while target.crossfades() == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        token.cancel();

        assert!(matches!(running.await, Ok(Err(Cancelled))));
        assert!(target.animation.stopped.load(Ordering::SeqCst));
        assert!(target.animation.cleared.load(Ordering::SeqCst));
        assert!(target.animation.callbacks.lock().is_empty());
        assert_eq!(harness.listener.count("transition_start"), 1);
        assert_eq!(harness.listener.count("transition_end"), 0);
        assert_eq!(harness.listener.count("success"), 0);
    }

    #[tokio::test]
    async fn test_preload_drains_instead_of_decoding() {
        let fetcher = StubFetcher::keyed("a");
        let decoder = StubDecoder::new(false);
        let harness = Harness::with(&fetcher, &decoder);

        let request = ImageRequest::builder("a")
            .memory_cache_policy(CachePolicy::Disabled)
            .transformation(Arc::new(Invert))
            .build();
        let result = success(harness.run(request).await);

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(decoder.calls(), 0);
        assert!(result.image.is_empty());
        assert_eq!(harness.listener.count("decode_start:drain"), 1);
        assert_eq!(harness.listener.count("decode_end:drain"), 1);
        assert_eq!(harness.listener.count("transform_start"), 0);
        assert_eq!(harness.cache.size(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_identical_requests_are_not_coalesced() {
        let fetcher = Arc::new(StubFetcher {
            calls: AtomicUsize::new(0),
            key: Some("a"),
            barrier: Some(Arc::new(Barrier::new(2))),
        });
        let decoder = StubDecoder::new(false);
        let harness = Harness::with(&fetcher, &decoder);

        let (first, second) = tokio::join!(
            harness.run(ImageRequest::new("a")),
            harness.run(ImageRequest::new("a"))
        );
        let (first, second) = (success(first), success(second));

        assert_eq!(fetcher.calls(), 2);
        assert_eq!(decoder.calls(), 2);
        assert_eq!(first.data_source, DataSource::Network);
        assert_eq!(second.data_source, DataSource::Network);
        assert_ne!(first.image.bitmap(), second.image.bitmap());
    }

    #[tokio::test]
    async fn test_alias_key_hit() {
        let fetcher = StubFetcher::keyed("primary");
        let decoder = StubDecoder::new(false);
        let harness = Harness::with(&fetcher, &decoder);
        let cached = Bitmap::new(2, 2, PixelFormat::Rgba8);
        assert!(harness.cache.put("thumb".into(), &cached, false));

        let request = ImageRequest::builder("a").alias_key("thumb").build();
        let result = success(harness.run(request).await);

        assert_eq!(result.data_source, DataSource::MemoryCache);
        assert_eq!(result.image.bitmap(), &cached);
        assert_eq!(result.memory_cache_key, Some(CacheKey::new("thumb")));
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_hit_is_a_miss_and_stays_cached() {
        let fetcher = StubFetcher::keyed("a");
        let decoder = StubDecoder::new(false);
        let harness = Harness::with(&fetcher, &decoder);
        let sampled = Bitmap::new(2, 2, PixelFormat::Rgba8);
        assert!(harness.cache.put("a".into(), &sampled, true));

        let request = ImageRequest::builder("a")
            .memory_cache_policy(CachePolicy::ReadOnly)
            .target(Arc::new(RecordingTarget::default()))
            .build();
        let result = success(harness.run(request).await);

        assert_eq!(result.data_source, DataSource::Network);
        assert_eq!(fetcher.calls(), 1);
        let still_cached = harness.cache.get(&"a".into()).map(|c| c.image.bitmap().clone());
        assert_eq!(still_cached.as_ref(), Some(&sampled));
    }

    #[tokio::test]
    async fn test_released_bitmap_returns_to_pool() {
        let fetcher = StubFetcher::keyed("a");
        let decoder = StubDecoder::new(false);
        let harness = Harness::with(&fetcher, &decoder);

        let result = success(harness.run(ImageRequest::new("a")).await);
        let bitmap = result.image.bitmap().clone();
        assert_eq!(harness.references.count(&bitmap), 2);

        drop(result);
        assert_eq!(harness.references.count(&bitmap), 1);
        assert!(harness.pool.is_empty());

        harness.cache.trim_memory(TrimLevel::Complete);
        assert_eq!(harness.references.count(&bitmap), 0);
        assert_eq!(harness.pool.len(), 1);
        assert!(harness.cache.get(&"a".into()).is_none());
    }

    #[tokio::test]
    async fn test_caller_bitmap_is_never_pooled() {
        let harness = Harness::new(
            ComponentRegistry::builder()
                .fetcher(Arc::new(BitmapFetcher))
                .build(),
        );

        let supplied = Bitmap::new(3, 3, PixelFormat::Rgba8);
        let request = ImageRequest::builder(supplied.clone())
            .transformation(Arc::new(Invert))
            .build();
        let result = success(harness.run(request).await);

        assert_eq!(result.data_source, DataSource::Memory);
        assert!(result.memory_cache_key.is_none());
        assert_ne!(result.image.bitmap(), &supplied);
        drop(result);

        let pooled = harness.pool.get_or_none(3, 3, PixelFormat::Rgba8);
        assert!(pooled.is_some_and(|b| b != supplied));
        assert!(harness.pool.is_empty());
    }

    #[tokio::test]
    async fn test_hidden_target_gets_result_without_crossfade() {
        let fetcher = StubFetcher::keyed("a");
        let decoder = StubDecoder::new(false);
        let harness = Harness::with(&fetcher, &decoder);
        let target = Arc::new(RecordingTarget {
            animates: true,
            hidden: true,
            ..RecordingTarget::default()
        });

        let request = ImageRequest::builder("a")
            .target(target.clone())
            .crossfade(Duration::from_secs(60))
            .build();
        let result = success(harness.run(request).await);

        assert_eq!(result.data_source, DataSource::Network);
        assert_eq!(target.crossfades(), 0);
        assert_eq!(target.events(), vec!["start", "success"]);
        assert_eq!(harness.listener.count("transition_start"), 0);
        assert_eq!(harness.listener.count("transition_end"), 0);
    }

    #[tokio::test]
    async fn test_cancel_while_fetching_aborts_worker() {
        let fetcher = Arc::new(HangingFetcher::default());
        let harness = Harness::new(
            ComponentRegistry::builder()
                .fetcher(fetcher.clone())
                .build(),
        );

        let token = CancellationToken::new();
        let executor = harness.executor.clone();
        let running = tokio::spawn({
            let token = token.clone();
            async move { executor.execute(ImageRequest::new("a"), token).await }
        });

        while harness.listener.count("fetch_start") == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        token.cancel();

        assert!(matches!(running.await, Ok(Err(Cancelled))));
        assert!(fetcher.dropped.load(Ordering::SeqCst));
        assert_eq!(harness.listener.count("fetch_end"), 0);
        assert_eq!(harness.listener.count("cancel"), 1);
        assert_eq!(harness.listener.count("error"), 0);
    }

    #[tokio::test]
    async fn test_cancel_mid_transform_releases_decoded_bitmap() {
        let fetcher = StubFetcher::keyed("a");
        let decoder = StubDecoder::new(false);
        let harness = Harness::with(&fetcher, &decoder);
        assert_eq!(harness.references.tracked(), 0);

        let token = CancellationToken::new();
        let request = ImageRequest::builder("a")
            .transformation(Arc::new(Stalled { fail: false }))
            .build();
        let executor = harness.executor.clone();
        let running = tokio::spawn({
            let token = token.clone();
            async move { executor.execute(request, token).await }
        });

        while harness.listener.count("transform_start") == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert_eq!(harness.references.tracked(), 1);
        token.cancel();

        assert!(matches!(running.await, Ok(Err(Cancelled))));
        assert_eq!(harness.references.tracked(), 0);
        assert_eq!(harness.pool.len(), 1);
        assert_eq!(harness.cache.size(), 0);
    }

    #[tokio::test]
    async fn test_failed_transform_releases_decoded_bitmap() {
        let fetcher = StubFetcher::keyed("a");
        let decoder = StubDecoder::new(false);
        let harness = Harness::with(&fetcher, &decoder);

        let request = ImageRequest::builder("a")
            .transformation(Arc::new(Stalled { fail: true }))
            .build();
        let error = failure(harness.run(request).await);

        assert!(matches!(error.error, LoadError::Transform { .. }));
        assert_eq!(harness.references.tracked(), 0);
        assert_eq!(harness.pool.len(), 1);
        assert_eq!(harness.cache.size(), 0);
    }

    #[tokio::test]
    async fn test_placeholder_lookup_does_not_count_as_cache_traffic() {
        let fetcher = StubFetcher::keyed("a");
        let decoder = StubDecoder::new(false);
        let harness = Harness::with(&fetcher, &decoder);
        let placeholder = harness.pool.get_or_allocate(2, 2, PixelFormat::Rgba8);
        assert!(harness.cache.put("thumb".into(), &placeholder, false));
        let target = Arc::new(RecordingTarget::default());

        let request = ImageRequest::builder("a")
            .target(target.clone())
            .placeholder_cache_key("thumb")
            .build();
        let result = success(harness.run(request).await);

        assert_eq!(target.events(), vec!["start:placeholder", "success"]);
        let stats = harness.cache.stats();
        assert_eq!((stats.hits, stats.misses), (0, 1));
        assert_eq!(harness.references.count(&placeholder), 1);
        drop(result);
    }

    #[tokio::test]
    async fn test_placeholder_stays_leased_while_loading() {
        let fetcher = Arc::new(HangingFetcher::default());
        let harness = Harness::new(
            ComponentRegistry::builder()
                .fetcher(fetcher.clone())
                .build(),
        );
        let placeholder = harness.pool.get_or_allocate(2, 2, PixelFormat::Rgba8);
        assert!(harness.cache.put("thumb".into(), &placeholder, false));

        let token = CancellationToken::new();
        let request = ImageRequest::builder("a")
            .target(Arc::new(RecordingTarget::default()))
            .placeholder_cache_key("thumb")
            .build();
        let executor = harness.executor.clone();
        let running = tokio::spawn({
            let token = token.clone();
            async move { executor.execute(request, token).await }
        });

        while harness.listener.count("fetch_start") == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        harness.cache.clear();
        assert_eq!(harness.references.count(&placeholder), 1);
        assert!(harness.pool.is_empty());

        token.cancel();
        assert!(matches!(running.await, Ok(Err(Cancelled))));
        assert_eq!(harness.references.count(&placeholder), 0);
        assert_eq!(harness.pool.len(), 1);
    }
}
