//! Local file fetcher.

use std::path::Path;
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use tracing::trace;

use crate::domain::entities::{DataSource, ImageSource, Options, RequestData, Size};
use crate::domain::errors::LoadError;
use crate::domain::ports::{BitmapPoolPort, FetchResult, Fetcher, SourceResult};

/// Streams local files.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileFetcher;

/// Guesses a content type from the file extension.
#[must_use]
pub fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

#[async_trait]
impl Fetcher for FileFetcher {
    fn name(&self) -> &'static str {
        "file"
    }

    fn handles(&self, data: &RequestData) -> bool {
        matches!(data, RequestData::Path(_))
    }

    /// The path plus its modification time, so an edited file misses the cache.
    fn cache_key(&self, data: &RequestData) -> Option<String> {
        let RequestData::Path(path) = data else {
            return None;
        };
        let modified = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |d| d.as_millis());
        Some(format!("{}:{modified}", path.display()))
    }

    async fn fetch(
        &self,
        _pool: &dyn BitmapPoolPort,
        data: &RequestData,
        _size: Size,
        _options: &Options,
    ) -> Result<FetchResult, LoadError> {
        let RequestData::Path(path) = data else {
            return Err(LoadError::no_fetcher(data.kind()));
        };

        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| LoadError::fetch(format!("Failed to open {}: {e}", path.display())))?;
        trace!(path = %path.display(), "Opened image file");

        Ok(FetchResult::Source(SourceResult {
            source: ImageSource::new(file),
            mime_type: mime_from_extension(path).map(String::from),
            data_source: DataSource::Disk,
        }))
    }
}
