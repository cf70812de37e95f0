//! Event listener that forwards pipeline stages to `tracing`.

use tracing::{debug, trace};

use crate::domain::entities::{
    Bitmap, DataSource, ImageRequest, RequestData, Size, SuccessResult,
};
use crate::domain::errors::LoadError;
use crate::domain::ports::EventListener;

/// Logs every pipeline event. Stage boundaries go to `trace`, outcomes to `debug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingEventListener;

impl EventListener for LoggingEventListener {
    fn on_dispatch(&self, request: &ImageRequest) {
        trace!(request = %request.id(), "Dispatched");
    }

    fn on_start(&self, request: &ImageRequest) {
        debug!(request = %request.id(), "Started");
    }

    fn resolve_size_start(&self, request: &ImageRequest) {
        trace!(request = %request.id(), "Resolving size");
    }

    fn resolve_size_end(&self, request: &ImageRequest, size: Size) {
        trace!(request = %request.id(), size = %size, "Resolved size");
    }

    fn map_start(&self, request: &ImageRequest, input: &RequestData) {
        trace!(request = %request.id(), input = %input, "Mapping");
    }

    fn map_end(&self, request: &ImageRequest, output: &RequestData) {
        trace!(request = %request.id(), kind = output.kind(), output = %output, "Mapped");
    }

    fn fetch_start(&self, request: &ImageRequest, fetcher: &str) {
        trace!(request = %request.id(), fetcher, "Fetching");
    }

    fn fetch_end(&self, request: &ImageRequest, fetcher: &str, data_source: DataSource) {
        trace!(request = %request.id(), fetcher, source = %data_source, "Fetched");
    }

    fn decode_start(&self, request: &ImageRequest, decoder: &str) {
        trace!(request = %request.id(), decoder, "Decoding");
    }

    fn decode_end(&self, request: &ImageRequest, decoder: &str) {
        trace!(request = %request.id(), decoder, "Decoded");
    }

    fn transform_start(&self, request: &ImageRequest, input: &Bitmap) {
        trace!(
            request = %request.id(),
            width = input.width(),
            height = input.height(),
            "Transforming"
        );
    }

    fn transform_end(&self, request: &ImageRequest, output: &Bitmap) {
        trace!(
            request = %request.id(),
            width = output.width(),
            height = output.height(),
            "Transformed"
        );
    }

    fn transition_start(&self, request: &ImageRequest) {
        trace!(request = %request.id(), "Transition started");
    }

    fn transition_end(&self, request: &ImageRequest) {
        trace!(request = %request.id(), "Transition ended");
    }

    fn on_cancel(&self, request: &ImageRequest) {
        debug!(request = %request.id(), "Cancelled");
    }

    fn on_error(&self, request: &ImageRequest, error: &LoadError) {
        debug!(request = %request.id(), error = %error, "Failed");
    }

    fn on_success(&self, request: &ImageRequest, result: &SuccessResult) {
        debug!(
            request = %request.id(),
            source = %result.data_source,
            width = result.image.width(),
            height = result.image.height(),
            sampled = result.is_sampled,
            "Succeeded"
        );
    }
}
