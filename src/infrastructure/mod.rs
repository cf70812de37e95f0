//! Infrastructure layer with concrete adapters.

/// Bitmap pool and reference counting.
pub mod bitmap;
/// Loader configuration.
pub mod config;
/// Default decoders.
pub mod decoders;
/// Default fetchers.
pub mod fetchers;
/// Memory caches and the loader facade.
pub mod image;
pub mod animation;
pub mod lifecycle;
pub mod logging_listener;
/// Default mappers.
pub mod mappers;
/// Built-in transformations.
pub mod transformations;

pub use animation::TimedAnimation;
pub use bitmap::{BitmapPool, BitmapReferenceCounter, PoolStats};
pub use config::{CliArgs, ConfigError, ConfigStore, LoaderConfig, LogLevel};
pub use image::{
    CacheStats, Disposable, ImageLoader, ImageLoaderBuilder, LoaderStats, MemoryImageCache,
    WeakMemoryCache, default_registry,
};
pub use lifecycle::LifecycleRegistry;
pub use logging_listener::LoggingEventListener;
