//! Fetch, decode and transform, run on a worker runtime.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::domain::entities::{
    Bitmap, BitmapLease, DataSource, ImageRequest, PixelFormat, RequestData, Size,
};
use crate::domain::errors::LoadError;
use crate::domain::ports::{Decoder, FetchResult, Fetcher};

use super::LoaderContext;

/// Inputs of one worker run.
pub struct FetchJob {
    /// The originating request.
    pub request: ImageRequest,
    /// Data after mapping.
    pub data: RequestData,
    /// Fetcher chosen for `data`.
    pub fetcher: Arc<dyn Fetcher>,
    /// Resolved target size.
    pub size: Size,
}

/// Output of a worker run.
#[derive(Debug)]
pub struct FetchOutput {
    /// The final image, ready to draw.
    pub image: BitmapLease,
    /// True if the image is smaller than its source.
    pub is_sampled: bool,
    /// Where the data came from.
    pub data_source: DataSource,
}

/// Runs the fetch, decode and transform stages for one request.
///
/// # Errors
/// Returns the first stage failure, or [`LoadError::Cancelled`] if `token`
/// fires between stages.
pub async fn fetch_decode_transform(
    context: Arc<LoaderContext>,
    job: FetchJob,
    token: CancellationToken,
) -> Result<FetchOutput, LoadError> {
    let FetchJob {
        request,
        data,
        fetcher,
        size,
    } = job;
    let listener = &context.listener;
    let pool = context.bitmap_pool.as_ref();
    let options = request.options();

    listener.fetch_start(&request, fetcher.name());
    let fetched = fetcher.fetch(pool, &data, size, &options).await?;

    let (bitmap, is_sampled, data_source) = match fetched {
        FetchResult::Bitmap(result) => {
            listener.fetch_end(&request, fetcher.name(), result.data_source);
            // The caller may still read this buffer, so it must never be pooled.
            context.references.invalidate(&result.bitmap);
            (result.bitmap, result.is_sampled, result.data_source)
        }
        FetchResult::Source(result) => {
            listener.fetch_end(&request, fetcher.name(), result.data_source);
            let decoder = select_decoder(&context, &request, result.mime_type.as_deref())?;

            if token.is_cancelled() {
                return Err(LoadError::Cancelled);
            }

            listener.decode_start(&request, decoder.name());
            let closer = result.source.closer();
            let decoded = match decoder.decode(pool, result.source, size, &options).await {
                Ok(decoded) => decoded,
                Err(e) => {
                    closer.close();
                    return Err(e);
                }
            };
            listener.decode_end(&request, decoder.name());
            (decoded.bitmap, decoded.is_sampled, result.data_source)
        }
    };

    let mut image = BitmapLease::new(bitmap, Arc::clone(&context.references));

    if !request.transformations().is_empty() && !image.is_empty() {
        if token.is_cancelled() {
            return Err(LoadError::Cancelled);
        }
        listener.transform_start(&request, &image);

        if !image.format().is_transformable() {
            image = normalize(&context, &image)?;
        }

        for transformation in request.transformations() {
            if token.is_cancelled() {
                return Err(LoadError::Cancelled);
            }
            let output = transformation
                .transform(pool, image.bitmap().clone(), size)
                .await?;
            trace!(request = %request.id(), key = %transformation.key(), "Applied transformation");
            if output != *image.bitmap() {
                image = BitmapLease::new(output, Arc::clone(&context.references));
            }
        }

        listener.transform_end(&request, &image);
    }

    image.prepare_to_draw();
    debug!(
        request = %request.id(),
        width = image.width(),
        height = image.height(),
        source = %data_source,
        "Image produced"
    );

    Ok(FetchOutput {
        image,
        is_sampled,
        data_source,
    })
}

fn select_decoder(
    context: &LoaderContext,
    request: &ImageRequest,
    mime_type: Option<&str>,
) -> Result<Arc<dyn Decoder>, LoadError> {
    if request.is_preload_without_output() {
        return Ok(Arc::clone(&context.drain_decoder));
    }
    request
        .decoder()
        .cloned()
        .or_else(|| context.registry.decoder_for(mime_type))
        .ok_or_else(|| LoadError::no_decoder(mime_type.unwrap_or("unknown content type")))
}

/// Copies `image` into a pooled RGBA buffer.
fn normalize(context: &LoaderContext, image: &Bitmap) -> Result<BitmapLease, LoadError> {
    let converted = image
        .to_image()
        .ok_or_else(|| LoadError::decode("pixel buffer does not match its dimensions"))?;
    let output = context
        .bitmap_pool
        .get_dirty(image.width(), image.height(), PixelFormat::Rgba8);
    if !output.write_image(&converted) {
        return Err(LoadError::decode("pooled buffer has unexpected dimensions"));
    }
    Ok(BitmapLease::new(output, Arc::clone(&context.references)))
}
