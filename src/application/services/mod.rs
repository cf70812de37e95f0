//! Pipeline services used by the request engine.

pub mod cache_key;
pub mod registry;
pub mod size;
pub mod transition;

pub use cache_key::{expected_pixel_format, is_cached_value_valid, memory_cache_key};
pub use registry::{ComponentRegistry, RegistryBuilder};
pub use size::LazySize;
pub use transition::deliver_success;
