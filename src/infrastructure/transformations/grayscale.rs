use async_trait::async_trait;
use image::DynamicImage;

use crate::domain::entities::{Bitmap, Size};
use crate::domain::errors::LoadError;
use crate::domain::ports::{BitmapPoolPort, Transformation};

use super::apply_blocking;

/// Converts to grayscale, keeping alpha.
#[derive(Debug, Clone, Copy, Default)]
pub struct Grayscale;

#[async_trait]
impl Transformation for Grayscale {
    fn key(&self) -> String {
        "grayscale".to_string()
    }

    async fn transform(
        &self,
        pool: &dyn BitmapPoolPort,
        input: Bitmap,
        _size: Size,
    ) -> Result<Bitmap, LoadError> {
        apply_blocking("grayscale", pool, &input, |image| {
            DynamicImage::ImageLumaA8(image.to_luma_alpha8())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::PixelFormat;
    use crate::infrastructure::bitmap::BitmapPool;

    #[tokio::test]
    async fn test_grayscale_equalizes_channels() -> Result<(), LoadError> {
        let pool = BitmapPool::default();
        let input = Bitmap::from_pixels(1, 1, PixelFormat::Rgba8, vec![200, 40, 90, 128])
            .ok_or_else(|| LoadError::decode("bad fixture"))?;

        let output = Grayscale.transform(&pool, input.clone(), Size::Original).await?;

        assert_ne!(output, input);
        assert_eq!(output.format(), PixelFormat::Rgba8);
        let px = output.pixels();
        assert_eq!(px[0], px[1]);
        assert_eq!(px[1], px[2]);
        assert_eq!(px[3], 128);
        Ok(())
    }
}
