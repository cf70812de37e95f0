//! Domain entity definitions.

mod bitmap;
mod cache_key;
mod data;
mod options;
mod request;
mod result;
mod size;
mod source;
mod trim_level;

pub use bitmap::{Bitmap, BitmapId, PixelFormat, WeakBitmap};
pub use cache_key::{CacheKey, ParameterEntry, Parameters};
pub use data::RequestData;
pub use options::Options;
pub use request::{CachePolicy, ImageRequest, ImageRequestBuilder, SizePolicy, TransitionPolicy};
pub use result::{BitmapLease, DataSource, ErrorResult, ImageResult, SuccessResult};
pub use size::{Precision, Scale, Size};
pub use source::{ImageSource, SourceCloser};
pub use trim_level::TrimLevel;
