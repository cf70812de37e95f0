//! Image handling: the memory cache tiers and the loader facade.

pub mod disposable;
pub mod loader;
pub mod memory_cache;
pub mod strong_cache;
pub mod weak_cache;

pub use disposable::Disposable;
pub use loader::{ImageLoader, ImageLoaderBuilder, LoaderStats, default_registry};
pub use memory_cache::{CacheStats, DEFAULT_CACHE_SIZE, MemoryImageCache};
pub use strong_cache::StrongMemoryCache;
pub use weak_cache::WeakMemoryCache;
