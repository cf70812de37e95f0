//! Default fetchers.

pub mod bitmap;
pub mod file;
pub mod http;
pub mod memory;

pub use bitmap::BitmapFetcher;
pub use file::{FileFetcher, mime_from_extension};
pub use http::HttpFetcher;
pub use memory::BytesFetcher;
