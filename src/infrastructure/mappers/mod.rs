//! Default mappers.

pub mod cdn;
pub mod text;

pub use cdn::{CdnSizeMapper, optimize_cdn_url};
pub use text::{FileUriMapper, ResourceIdMapper, TextMapper};
