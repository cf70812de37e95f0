//! Port for retrieving encoded or ready-made images.

use async_trait::async_trait;

use crate::domain::entities::{Bitmap, DataSource, ImageSource, Options, RequestData, Size};
use crate::domain::errors::LoadError;

use super::BitmapPoolPort;

/// A stream of encoded bytes that still needs decoding.
#[derive(Debug)]
pub struct SourceResult {
    /// The encoded stream.
    pub source: ImageSource,
    /// Content type hint, e.g. `image/png`.
    pub mime_type: Option<String>,
    /// Where the bytes came from.
    pub data_source: DataSource,
}

/// An image that needs no decoding.
#[derive(Debug)]
pub struct BitmapResult {
    /// The image.
    pub bitmap: Bitmap,
    /// True if the image is smaller than its source.
    pub is_sampled: bool,
    /// Where the image came from.
    pub data_source: DataSource,
}

/// Outcome of a fetch.
#[derive(Debug)]
pub enum FetchResult {
    /// Encoded bytes.
    Source(SourceResult),
    /// A ready-made image.
    Bitmap(BitmapResult),
}

/// Retrieves the data behind a mapped request.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Name used in logs and events.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Returns true if this fetcher can load `data`.
    fn handles(&self, data: &RequestData) -> bool;

    /// Base identity for the memory cache, or `None` if `data` is uncacheable.
    fn cache_key(&self, data: &RequestData) -> Option<String>;

    /// Loads `data`.
    async fn fetch(
        &self,
        pool: &dyn BitmapPoolPort,
        data: &RequestData,
        size: Size,
        options: &Options,
    ) -> Result<FetchResult, LoadError>;
}
