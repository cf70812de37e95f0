//! Port for pixel transformations.

use async_trait::async_trait;

use crate::domain::entities::{Bitmap, Size};
use crate::domain::errors::LoadError;

use super::BitmapPoolPort;

/// Transforms a decoded bitmap.
#[async_trait]
pub trait Transformation: Send + Sync {
    /// Identity of this transformation and its settings, used in cache keys.
    fn key(&self) -> String;

    /// Produces a transformed bitmap. Output buffers should come from `pool`.
    /// Returning `input` itself is allowed.
    async fn transform(
        &self,
        pool: &dyn BitmapPoolPort,
        input: Bitmap,
        size: Size,
    ) -> Result<Bitmap, LoadError>;
}
