//! Decoder backed by the `image` crate.

use async_trait::async_trait;
use image::DynamicImage;
use image::imageops::FilterType;
use tracing::{debug, trace};

use crate::domain::entities::{ImageSource, Options, Scale, Size};
use crate::domain::errors::LoadError;
use crate::domain::ports::{BitmapPoolPort, DecodeResult, Decoder};

/// Decodes PNG, JPEG and WebP on a blocking thread, downsampling to the
/// target size. Sources smaller than an exact target are scaled up to it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageDecoder;

/// A resize the decoder applies after decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resize {
    /// Shrink to fit the target; the result is sampled.
    Down(u32, u32),
    /// Grow to an exact target; no detail is lost.
    Up(u32, u32),
}

/// How `src` should be resized for `size`, or `None` to keep it.
///
/// Larger sources are always downsampled. Smaller ones are only scaled up
/// when the request needs its exact size.
fn target_resize(
    src: (u32, u32),
    size: Size,
    scale: Scale,
    allow_inexact: bool,
) -> Option<Resize> {
    let Size::Pixels { width, height } = size else {
        return None;
    };
    let multiplier = scale.multiplier(src, (width, height));
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let scaled = |v: u32| ((f64::from(v) * multiplier).round() as u32).max(1);
    if multiplier < 1.0 {
        Some(Resize::Down(scaled(src.0), scaled(src.1)))
    } else if multiplier > 1.0 && !allow_inexact {
        Some(Resize::Up(scaled(src.0), scaled(src.1)))
    } else {
        None
    }
}

fn decode_blocking(
    bytes: &[u8],
    size: Size,
    scale: Scale,
    allow_inexact: bool,
) -> Result<(DynamicImage, bool), LoadError> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| LoadError::decode(format!("Failed to decode image: {e}")))?;

    match target_resize((decoded.width(), decoded.height()), size, scale, allow_inexact) {
        Some(Resize::Down(width, height)) => Ok((
            decoded.resize_exact(width, height, FilterType::Lanczos3),
            true,
        )),
        Some(Resize::Up(width, height)) => Ok((
            decoded.resize_exact(width, height, FilterType::CatmullRom),
            false,
        )),
        None => Ok((decoded, false)),
    }
}

#[async_trait]
impl Decoder for ImageDecoder {
    fn name(&self) -> &'static str {
        "image"
    }

    fn handles(&self, mime_type: Option<&str>) -> bool {
        mime_type.is_none_or(|m| m.starts_with("image/"))
    }

    async fn decode(
        &self,
        pool: &dyn BitmapPoolPort,
        source: ImageSource,
        size: Size,
        options: &Options,
    ) -> Result<DecodeResult, LoadError> {
        let bytes = source
            .read_all()
            .await
            .map_err(|e| LoadError::decode(format!("Failed to read source: {e}")))?;
        trace!(bytes = bytes.len(), "Read encoded image");

        let (scale, allow_inexact) = (options.scale, options.allow_inexact_size);
        let (image, is_sampled) =
            tokio::task::spawn_blocking(move || decode_blocking(&bytes, size, scale, allow_inexact))
                .await
                .map_err(|e| LoadError::decode(format!("Decode task panicked: {e}")))??;

        let bitmap = pool.get_dirty(image.width(), image.height(), options.pixel_format);
        if !bitmap.write_image(&image) {
            return Err(LoadError::decode("pooled buffer has unexpected dimensions"));
        }
        debug!(
            width = bitmap.width(),
            height = bitmap.height(),
            format = %bitmap.format(),
            is_sampled,
            "Decoded image"
        );

        Ok(DecodeResult { bitmap, is_sampled })
    }
}
