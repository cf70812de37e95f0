//! Ports for observing request progress.

use crate::domain::entities::{Bitmap, DataSource, ErrorResult, ImageRequest, RequestData, Size, SuccessResult};
use crate::domain::errors::LoadError;

/// Loader-wide observer of every pipeline stage.
///
/// For a single request, callbacks arrive in stage order. No ordering is
/// guaranteed across concurrent requests.
#[allow(unused_variables)]
pub trait EventListener: Send + Sync {
    /// The request was accepted.
    fn on_dispatch(&self, request: &ImageRequest) {}
    /// The target was notified of the start.
    fn on_start(&self, request: &ImageRequest) {}
    /// Size resolution began.
    fn resolve_size_start(&self, request: &ImageRequest) {}
    /// Size resolution finished.
    fn resolve_size_end(&self, request: &ImageRequest, size: Size) {}
    /// Data mapping began.
    fn map_start(&self, request: &ImageRequest, input: &RequestData) {}
    /// Data mapping finished.
    fn map_end(&self, request: &ImageRequest, output: &RequestData) {}
    /// A fetcher started.
    fn fetch_start(&self, request: &ImageRequest, fetcher: &str) {}
    /// A fetcher finished.
    fn fetch_end(&self, request: &ImageRequest, fetcher: &str, data_source: DataSource) {}
    /// A decoder started.
    fn decode_start(&self, request: &ImageRequest, decoder: &str) {}
    /// A decoder finished.
    fn decode_end(&self, request: &ImageRequest, decoder: &str) {}
    /// Transformations started.
    fn transform_start(&self, request: &ImageRequest, input: &Bitmap) {}
    /// Transformations finished.
    fn transform_end(&self, request: &ImageRequest, output: &Bitmap) {}
    /// An animated handoff started.
    fn transition_start(&self, request: &ImageRequest) {}
    /// An animated handoff finished.
    fn transition_end(&self, request: &ImageRequest) {}
    /// The request was cancelled.
    fn on_cancel(&self, request: &ImageRequest) {}
    /// The request failed.
    fn on_error(&self, request: &ImageRequest, error: &LoadError) {}
    /// The request succeeded.
    fn on_success(&self, request: &ImageRequest, result: &SuccessResult) {}
}

/// Listener that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventListener;

impl EventListener for NoopEventListener {}

/// Per-request observer of the outcome.
#[allow(unused_variables)]
pub trait RequestListener: Send + Sync {
    /// The request started.
    fn on_start(&self, request: &ImageRequest) {}
    /// The request was cancelled.
    fn on_cancel(&self, request: &ImageRequest) {}
    /// The request failed.
    fn on_error(&self, request: &ImageRequest, result: &ErrorResult) {}
    /// The request succeeded.
    fn on_success(&self, request: &ImageRequest, result: &SuccessResult) {}
}
