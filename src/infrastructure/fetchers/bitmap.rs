//! Caller-supplied bitmaps.

use async_trait::async_trait;

use crate::domain::entities::{DataSource, Options, RequestData, Size};
use crate::domain::errors::LoadError;
use crate::domain::ports::{BitmapPoolPort, BitmapResult, FetchResult, Fetcher};

/// Passes an already decoded bitmap straight through. Such data has no
/// stable identity, so it is never memory cached.
#[derive(Debug, Clone, Copy, Default)]
pub struct BitmapFetcher;

#[async_trait]
impl Fetcher for BitmapFetcher {
    fn name(&self) -> &'static str {
        "bitmap"
    }

    fn handles(&self, data: &RequestData) -> bool {
        matches!(data, RequestData::Bitmap(_))
    }

    fn cache_key(&self, _data: &RequestData) -> Option<String> {
        None
    }

    async fn fetch(
        &self,
        _pool: &dyn BitmapPoolPort,
        data: &RequestData,
        _size: Size,
        _options: &Options,
    ) -> Result<FetchResult, LoadError> {
        let RequestData::Bitmap(bitmap) = data else {
            return Err(LoadError::no_fetcher(data.kind()));
        };
        Ok(FetchResult::Bitmap(BitmapResult {
            bitmap: bitmap.clone(),
            is_sampled: false,
            data_source: DataSource::Memory,
        }))
    }
}
