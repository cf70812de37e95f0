//! Application layer: pipeline services and the request engine.

/// Registry, cache keys, size resolution and transitions.
pub mod services;
/// Request execution.
pub mod use_cases;

pub use services::ComponentRegistry;
pub use use_cases::{LoaderContext, RequestExecutor};
