//! HTTP(S) fetcher.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::domain::entities::{DataSource, ImageSource, Options, RequestData, Size};
use crate::domain::errors::{LoadError, LoaderError};
use crate::domain::ports::{BitmapPoolPort, FetchResult, Fetcher, SourceResult};

/// Default maximum concurrent downloads.
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Downloads `http` and `https` URIs.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    semaphore: Arc<Semaphore>,
}

impl HttpFetcher {
    /// Creates a fetcher with its own client.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(timeout: Duration, max_concurrent: usize) -> Result<Self, LoaderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LoaderError::HttpClient(e.to_string()))?;
        Ok(Self::with_client(client, max_concurrent))
    }

    /// Creates a fetcher sharing an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, max_concurrent: usize) -> Self {
        Self {
            client,
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }
}

fn is_http(data: &RequestData) -> bool {
    matches!(data, RequestData::Uri(url) if matches!(url.scheme(), "http" | "https"))
}

#[async_trait]
impl Fetcher for HttpFetcher {
    fn name(&self) -> &'static str {
        "http"
    }

    fn handles(&self, data: &RequestData) -> bool {
        is_http(data)
    }

    fn cache_key(&self, data: &RequestData) -> Option<String> {
        match data {
            RequestData::Uri(url) if is_http(data) => Some(url.to_string()),
            _ => None,
        }
    }

    async fn fetch(
        &self,
        _pool: &dyn BitmapPoolPort,
        data: &RequestData,
        _size: Size,
        _options: &Options,
    ) -> Result<FetchResult, LoadError> {
        let RequestData::Uri(url) = data else {
            return Err(LoadError::no_fetcher(data.kind()));
        };

        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| LoadError::fetch(format!("download slots closed: {e}")))?;

        debug!(url = %url, "Downloading image from network");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| LoadError::fetch(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(LoadError::fetch(format!(
                "HTTP {}: {}",
                response.status(),
                response.status().canonical_reason().unwrap_or("Unknown")
            )));
        }

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| LoadError::fetch(format!("Failed to read body: {e}")))?;

        Ok(FetchResult::Source(SourceResult {
            source: ImageSource::from_bytes(bytes),
            mime_type,
            data_source: DataSource::Network,
        }))
    }
}
