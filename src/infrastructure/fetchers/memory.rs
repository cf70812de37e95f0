//! In-memory encoded bytes.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::domain::entities::{DataSource, ImageSource, Options, RequestData, Size};
use crate::domain::errors::LoadError;
use crate::domain::ports::{BitmapPoolPort, FetchResult, Fetcher, SourceResult};

/// Serves encoded image bytes the caller already holds.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesFetcher;

#[async_trait]
impl Fetcher for BytesFetcher {
    fn name(&self) -> &'static str {
        "bytes"
    }

    fn handles(&self, data: &RequestData) -> bool {
        matches!(data, RequestData::Bytes(_))
    }

    /// Content hash, so identical buffers share a cache entry.
    fn cache_key(&self, data: &RequestData) -> Option<String> {
        let RequestData::Bytes(bytes) = data else {
            return None;
        };
        Some(format!("sha256:{}", hex::encode(Sha256::digest(bytes))))
    }

    async fn fetch(
        &self,
        _pool: &dyn BitmapPoolPort,
        data: &RequestData,
        _size: Size,
        _options: &Options,
    ) -> Result<FetchResult, LoadError> {
        let RequestData::Bytes(bytes) = data else {
            return Err(LoadError::no_fetcher(data.kind()));
        };
        Ok(FetchResult::Source(SourceResult {
            source: ImageSource::from_bytes(bytes.clone()),
            mime_type: None,
            data_source: DataSource::Memory,
        }))
    }
}
