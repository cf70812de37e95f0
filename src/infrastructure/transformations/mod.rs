//! Built-in pixel transformations.

use image::DynamicImage;

use crate::domain::entities::{Bitmap, PixelFormat};
use crate::domain::errors::LoadError;
use crate::domain::ports::BitmapPoolPort;

mod blur;
mod grayscale;

pub use blur::Blur;
pub use grayscale::Grayscale;

/// Runs `op` over `input` on a blocking thread and writes the result into a
/// pooled RGBA buffer.
async fn apply_blocking<F>(
    key: &str,
    pool: &dyn BitmapPoolPort,
    input: &Bitmap,
    op: F,
) -> Result<Bitmap, LoadError>
where
    F: FnOnce(DynamicImage) -> DynamicImage + Send + 'static,
{
    let image = input
        .to_image()
        .ok_or_else(|| LoadError::transform(key, "input buffer does not match its dimensions"))?;
    let output = tokio::task::spawn_blocking(move || op(image))
        .await
        .map_err(|e| LoadError::transform(key, format!("task panicked: {e}")))?;

    let bitmap = pool.get_dirty(output.width(), output.height(), PixelFormat::Rgba8);
    if bitmap.write_image(&output) {
        Ok(bitmap)
    } else {
        Err(LoadError::transform(key, "pooled buffer has unexpected dimensions"))
    }
}
