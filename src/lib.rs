//! Pixload - a cancellable, cache-aware asynchronous image loader.
//!
//! Requests flow through size resolution, data mapping, a two-tier memory
//! cache and a fetch, decode and transform pipeline backed by a bitmap pool.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing services and use cases.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing concrete adapters.
pub mod infrastructure;

/// Current version of the library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = "pixload";
