//! Port for turning encoded streams into bitmaps.

use async_trait::async_trait;

use crate::domain::entities::{Bitmap, ImageSource, Options, Size};
use crate::domain::errors::LoadError;

use super::BitmapPoolPort;

/// A decoded image.
#[derive(Debug)]
pub struct DecodeResult {
    /// The decoded pixels.
    pub bitmap: Bitmap,
    /// True if the image was downsampled while decoding.
    pub is_sampled: bool,
}

/// Decodes encoded image streams.
#[async_trait]
pub trait Decoder: Send + Sync {
    /// Name used in logs and events.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Returns true if this decoder understands the content type.
    fn handles(&self, mime_type: Option<&str>) -> bool;

    /// Decodes `source`. The decoder owns the stream from here on.
    async fn decode(
        &self,
        pool: &dyn BitmapPoolPort,
        source: ImageSource,
        size: Size,
        options: &Options,
    ) -> Result<DecodeResult, LoadError>;
}
