//! Bitmap reuse: the buffer pool and holder accounting.

pub mod pool;
pub mod reference_counter;

pub use pool::{BitmapPool, PoolStats};
pub use reference_counter::BitmapReferenceCounter;
