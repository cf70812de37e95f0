//! Port definitions for pluggable collaborators.

mod bitmap_pool_port;
mod decoder;
mod fetcher;
mod lifecycle;
mod listener;
mod mapper;
mod memory_cache_port;
mod size_resolver;
mod target;
mod transformation;

pub use bitmap_pool_port::{BitmapPoolPort, ReferenceCounterPort};
pub use decoder::{DecodeResult, Decoder};
pub use fetcher::{BitmapResult, FetchResult, Fetcher, SourceResult};
pub use lifecycle::{Lifecycle, LifecycleObserver};
pub use listener::{EventListener, NoopEventListener, RequestListener};
pub use mapper::{Mapper, MeasuredMapper};
pub use memory_cache_port::{CachedBitmap, CachedImage, MemoryCachePort};
pub use size_resolver::SizeResolver;
pub use target::{Animation, Target, TransitionTarget};
pub use transformation::Transformation;
