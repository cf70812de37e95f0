//! Decoder that discards the stream.

use async_trait::async_trait;
use tracing::trace;

use crate::domain::entities::{Bitmap, ImageSource, Options, Size};
use crate::domain::errors::LoadError;
use crate::domain::ports::{BitmapPoolPort, DecodeResult, Decoder};

/// Reads the stream to the end and returns an empty bitmap.
///
/// Used for preloads whose pixels would be thrown away: the fetch still
/// happens (warming any transport-level cache) but no pixels are produced.
#[derive(Debug, Clone, Copy, Default)]
pub struct DrainDecoder;

#[async_trait]
impl Decoder for DrainDecoder {
    fn name(&self) -> &'static str {
        "drain"
    }

    fn handles(&self, _mime_type: Option<&str>) -> bool {
        true
    }

    async fn decode(
        &self,
        _pool: &dyn BitmapPoolPort,
        source: ImageSource,
        _size: Size,
        _options: &Options,
    ) -> Result<DecodeResult, LoadError> {
        let drained = source
            .drain()
            .await
            .map_err(|e| LoadError::decode(format!("Failed to drain source: {e}")))?;
        trace!(bytes = drained, "Drained source");
        Ok(DecodeResult {
            bitmap: Bitmap::empty(),
            is_sampled: false,
        })
    }
}
