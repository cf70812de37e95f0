//! Per-request settings handed to fetchers, decoders and transformations.

use super::{Parameters, PixelFormat, Scale};

/// Decode-relevant settings derived from a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    /// Pixel format the decoded image should use.
    pub pixel_format: PixelFormat,
    /// How the image is scaled into its target size.
    pub scale: Scale,
    /// Whether the output may differ from the requested size.
    pub allow_inexact_size: bool,
    /// Pass-through parameters.
    pub parameters: Parameters,
}
