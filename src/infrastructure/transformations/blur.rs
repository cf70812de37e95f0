use async_trait::async_trait;

use crate::domain::entities::{Bitmap, Size};
use crate::domain::errors::LoadError;
use crate::domain::ports::{BitmapPoolPort, Transformation};

use super::apply_blocking;

/// Gaussian blur.
#[derive(Debug, Clone, Copy)]
pub struct Blur {
    sigma: f32,
}

impl Blur {
    /// Creates a blur with the given standard deviation.
    #[must_use]
    pub const fn new(sigma: f32) -> Self {
        Self { sigma }
    }
}

#[async_trait]
impl Transformation for Blur {
    fn key(&self) -> String {
        format!("blur:{}", self.sigma)
    }

    async fn transform(
        &self,
        pool: &dyn BitmapPoolPort,
        input: Bitmap,
        _size: Size,
    ) -> Result<Bitmap, LoadError> {
        if self.sigma <= 0.0 {
            return Ok(input);
        }
        let sigma = self.sigma;
        apply_blocking(&self.key(), pool, &input, move |image| image.blur(sigma)).await
    }
}
